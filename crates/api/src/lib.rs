pub mod dates;
pub mod db;
pub mod export;
pub mod routes;
mod startup;
mod utils;

pub use dates::{format_iso_date, parse_iso_date, parse_stored_date};
pub use db::*;
pub use export::{
    CsvExport, ErrorBody, ForecastExport, ForecastExporter, ForecastQuery, WeatherConditionStyle,
};
pub use routes::*;
pub use startup::*;
pub use utils::*;
