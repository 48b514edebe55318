use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Deserialize;
use std::collections::HashMap;

use super::Error;
use crate::{format_iso_date, ForecastWithRelations};

pub const CSV_HEADER: [&str; 13] = [
    "source",
    "city",
    "country",
    "state",
    "collection_date",
    "forecasted_day",
    "temp_high",
    "temp_low",
    "wind_speed",
    "humidity",
    "precipitation_chance",
    "precipitation_amount",
    "weather_condition",
];

pub const UNKNOWN_COUNTRY: &str = "Country unknown";

/// How the `weather_condition` column is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherConditionStyle {
    /// `"" value ""`, the layout existing spreadsheet consumers parse
    #[default]
    Legacy,
    /// Plain field, quoted only when it contains a delimiter, quote or newline
    Standard,
}

/// A complete CSV export
#[derive(Debug, Clone, PartialEq)]
pub struct CsvDocument {
    pub body: String,
    /// Data rows, header excluded
    pub rows: usize,
    /// Forecasts left out because their city or source row is missing
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExport {
    weather_condition: WeatherConditionStyle,
}

impl CsvExport {
    pub fn new(weather_condition: WeatherConditionStyle) -> Self {
        Self { weather_condition }
    }

    /// Render forecasts grouped by (source, city). Groups appear in order of
    /// first occurrence and keep the input order inside each group.
    pub fn render(&self, forecasts: &[ForecastWithRelations]) -> Result<CsvDocument, Error> {
        let mut groups: Vec<Vec<&ForecastWithRelations>> = vec![];
        let mut group_index: HashMap<(&str, &str), usize> = HashMap::new();
        let mut dropped = 0;

        for entry in forecasts {
            let (Some(city), Some(source)) = (&entry.city, &entry.source) else {
                dropped += 1;
                continue;
            };
            let slot = *group_index
                .entry((source.name.as_str(), city.city.name.as_str()))
                .or_insert_with(|| {
                    groups.push(vec![]);
                    groups.len() - 1
                });
            groups[slot].push(entry);
        }

        let mut lines = Vec::with_capacity(forecasts.len() + 1);
        lines.push(encode_record(&CSV_HEADER)?);
        for entry in groups.iter().flatten() {
            lines.push(self.encode_forecast(entry)?);
        }

        Ok(CsvDocument {
            rows: lines.len() - 1,
            body: lines.join("\n"),
            dropped,
        })
    }

    fn encode_forecast(&self, entry: &ForecastWithRelations) -> Result<String, Error> {
        let forecast = &entry.forecast;
        let city = entry.city.as_ref();
        let country = entry
            .country
            .as_ref()
            .or_else(|| city.and_then(|c| c.country.as_ref()))
            .map(|c| c.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_COUNTRY);

        let mut fields = vec![
            entry.source.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            city.map(|c| c.city.name.clone()).unwrap_or_default(),
            country.to_string(),
            forecast.state.clone().unwrap_or_default(),
            format_iso_date(forecast.collection_date),
            format_iso_date(forecast.forecasted_day),
            forecast.temp_high.to_string(),
            forecast.temp_low.to_string(),
            optional_number(forecast.wind_speed),
            optional_number(forecast.humidity),
            optional_number(forecast.precipitation_chance),
            optional_number(forecast.precipitation_amount),
        ];

        let condition = forecast.weather_condition.as_deref().unwrap_or_default();
        match self.weather_condition {
            WeatherConditionStyle::Standard => {
                fields.push(condition.to_string());
                encode_record(&fields)
            }
            WeatherConditionStyle::Legacy => {
                let mut line = encode_record(&fields)?;
                line.push(',');
                line.push_str(&legacy_condition(condition));
                Ok(line)
            }
        }
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Padded condition spliced after the csv writer's output. Line breaks become
/// spaces so a forecast stays on one physical line.
fn legacy_condition(condition: &str) -> String {
    let flat: String = condition
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("\"\" {} \"\"", flat.replace('"', "\"\""))
}

/// One CSV line without terminator
fn encode_record<I, T>(fields: I) -> Result<String, Error>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(vec![]);
    writer.write_record(fields)?;
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;

    let mut line = String::from_utf8_lossy(&bytes).into_owned();
    if line.ends_with('\n') {
        line.pop();
    }
    Ok(line)
}
