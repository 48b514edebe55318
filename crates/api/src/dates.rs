use time::{
    format_description::{well_known::Rfc3339, BorrowedFormatItem},
    macros::format_description,
    Date, OffsetDateTime,
};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a caller supplied date. Accepts `YYYY-MM-DD` or a full RFC 3339
/// timestamp, which is reduced to its calendar date.
pub fn parse_iso_date(value: &str) -> Result<Date, time::error::Parse> {
    let value = value.trim();
    Date::parse(value, ISO_DATE)
        .or_else(|_| OffsetDateTime::parse(value, &Rfc3339).map(|ts| ts.date()))
}

/// Parse a date column as written by the scraper. Only the leading
/// `YYYY-MM-DD` part is read, so `2024-09-03T00:00:00Z` and
/// `2024-09-03 00:00:00` both resolve to the same day.
pub fn parse_stored_date(value: &str) -> Option<Date> {
    let day = value.trim().split(['T', ' ']).next()?;
    Date::parse(day, ISO_DATE).ok()
}

pub fn format_iso_date(date: Date) -> String {
    // ISO_DATE only contains date components, formatting a Date cannot fail
    date.format(ISO_DATE).unwrap_or_else(|_| date.to_string())
}
