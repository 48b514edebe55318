use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use log::warn;

use super::CsvDocument;

pub const CSV_FILENAME: &str = "forecasts.csv";
pub const WARNING_HEADER: &str = "x-warning";

/// A successful export, ready to be sent as a CSV attachment
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastExport {
    pub document: CsvDocument,
    /// Requested city names that matched nothing, reported in `X-Warning`
    pub unmatched_cities: Vec<String>,
}

impl ForecastExport {
    pub fn warning(&self) -> Option<String> {
        if self.unmatched_cities.is_empty() {
            None
        } else {
            let names: Vec<String> = self
                .unmatched_cities
                .iter()
                .map(|name| name.chars().filter(|c| !c.is_control()).collect())
                .collect();
            Some(format!("Cities not found: {}", names.join(", ")))
        }
    }
}

impl IntoResponse for ForecastExport {
    fn into_response(self) -> Response {
        let warning = self.warning();
        let mut response = (
            StatusCode::OK,
            [
                (CONTENT_TYPE, HeaderValue::from_static("text/csv")),
                (
                    CONTENT_DISPOSITION,
                    HeaderValue::from_static("attachment; filename=forecasts.csv"),
                ),
            ],
            self.document.body,
        )
            .into_response();

        if let Some(warning) = warning {
            match HeaderValue::from_bytes(warning.as_bytes()) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(WARNING_HEADER), value);
                }
                Err(e) => warn!("unable to encode warning header `{}`: {}", warning, e),
            }
        }

        response
    }
}
