use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidQuery(String),
    #[error("Invalid {0} format.")]
    InvalidDateFormat(&'static str),
    #[error("startDate cannot be after endDate.")]
    DateRangeInverted,
    #[error("City not found.")]
    CityNotFound,
    #[error("Country not found.")]
    CountryNotFound,
    #[error("Source not found.")]
    SourceNotFound,
    #[error("No forecasts found for the specified criteria.")]
    NoForecasts,
    #[error("Failed to render csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to load forecast data: {0}")]
    Store(#[from] db::Error),
}

/// JSON body of every non-CSV error response
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidQuery(_) | Error::InvalidDateFormat(_) | Error::DateRangeInverted => {
                StatusCode::BAD_REQUEST
            }
            Error::CityNotFound
            | Error::CountryNotFound
            | Error::SourceNotFound
            | Error::NoForecasts => StatusCode::NOT_FOUND,
            Error::Csv(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("forecast export failed: {}", self);
            String::from("Internal Server Error")
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
