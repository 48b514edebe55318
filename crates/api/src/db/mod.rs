pub mod sqlite;

pub use sqlite::Database;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::Date;
use utoipa::ToSchema;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query database: {0}")]
    Query(#[from] sqlx::Error),
    #[error("Stored date is not a valid calendar date: {0}")]
    InvalidStoredDate(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i64,
    pub name: String,
    pub country_id: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Country {
    pub id: i64,
    pub name: String,
}

/// A forecast provider, e.g. "MeteoBlue"
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Source {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub id: i64,
    pub city_id: i64,
    pub country_id: i64,
    pub source_id: i64,
    /// Day the forecast was scraped
    pub collection_date: Date,
    /// Day the forecast is about
    pub forecasted_day: Date,
    pub temp_high: f64,
    pub temp_low: f64,
    pub wind_speed: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation_chance: Option<f64>,
    pub precipitation_amount: Option<f64>,
    pub state: Option<String>,
    pub weather_condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityWithCountry {
    pub city: City,
    pub country: Option<Country>,
}

/// A forecast with its joined reference rows. A relation is `None` when the
/// foreign key points at a row that does not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastWithRelations {
    pub forecast: Forecast,
    pub city: Option<CityWithCountry>,
    pub country: Option<Country>,
    pub source: Option<Source>,
}

/// Conditions applied to the forecast table. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastPredicate {
    pub city_ids: Vec<i64>,
    pub source_id: Option<i64>,
    pub country_id: Option<i64>,
    /// Inclusive lower bound on `forecasted_day`
    pub forecasted_from: Option<Date>,
    /// Inclusive upper bound on `forecasted_day`
    pub forecasted_to: Option<Date>,
}

impl ForecastPredicate {
    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }
}

#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Exact, case-sensitive match on any of `names`
    async fn find_cities_by_names(&self, names: &[String]) -> Result<Vec<City>, Error>;
    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, Error>;
    async fn find_source_by_name(&self, name: &str) -> Result<Option<Source>, Error>;
    async fn find_cities_by_country_id(&self, country_id: i64) -> Result<Vec<City>, Error>;
    /// All cities, or only those whose name contains `name_contains`
    async fn cities(&self, name_contains: Option<String>) -> Result<Vec<City>, Error>;
    async fn countries(&self) -> Result<Vec<Country>, Error>;
    async fn sources(&self) -> Result<Vec<Source>, Error>;
}

#[async_trait]
pub trait ForecastData: Send + Sync {
    /// Forecasts matching `predicate` joined with city, city country, country and source.
    /// Rows come back in ascending forecast id order.
    async fn fetch_forecasts(
        &self,
        predicate: &ForecastPredicate,
    ) -> Result<Vec<ForecastWithRelations>, Error>;
    /// Distinct collection days, oldest first
    async fn collection_dates(&self) -> Result<Vec<Date>, Error>;
    async fn health_check(&self) -> Result<(), Error>;
}
