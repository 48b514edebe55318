//! Forecast query and CSV export pipeline.
//!
//! `ForecastQuery` -> [`FilterResolver`] -> [`ForecastData::fetch_forecasts`]
//! -> [`CsvExport`] -> [`ForecastExport`] (an axum response).

mod csv_export;
mod error;
mod filter;
mod response;

pub use csv_export::{CsvDocument, CsvExport, WeatherConditionStyle, CSV_HEADER, UNKNOWN_COUNTRY};
pub use error::{Error, ErrorBody};
pub use filter::{FilterResolver, ForecastQuery, ResolvedFilter};
pub use response::{ForecastExport, CSV_FILENAME, WARNING_HEADER};

use log::{info, warn};
use std::sync::Arc;

use crate::{ForecastData, ReferenceData};

pub struct ForecastExporter {
    resolver: FilterResolver,
    forecasts: Arc<dyn ForecastData>,
    csv: CsvExport,
}

impl ForecastExporter {
    pub fn new(
        reference: Arc<dyn ReferenceData>,
        forecasts: Arc<dyn ForecastData>,
        weather_condition: WeatherConditionStyle,
    ) -> Self {
        Self {
            resolver: FilterResolver::new(reference),
            forecasts,
            csv: CsvExport::new(weather_condition),
        }
    }

    pub async fn export(&self, query: &ForecastQuery) -> Result<ForecastExport, Error> {
        let ResolvedFilter {
            predicate,
            unmatched_cities,
        } = self.resolver.resolve(query).await?;
        if predicate.is_unfiltered() {
            info!("no filters given, exporting every forecast");
        }

        let forecasts = self.forecasts.fetch_forecasts(&predicate).await?;
        if forecasts.is_empty() {
            return Err(Error::NoForecasts);
        }

        let document = self.csv.render(&forecasts)?;
        if document.dropped > 0 {
            warn!(
                "dropped {} forecasts with a missing city or source",
                document.dropped
            );
        }
        if document.rows == 0 {
            return Err(Error::NoForecasts);
        }
        info!("exporting {} forecast rows", document.rows);

        Ok(ForecastExport {
            document,
            unmatched_cities,
        })
    }
}
