use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use scooby::postgres::{select, Parameters, Select};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    Row,
};
use std::{path::Path, str::FromStr, sync::LazyLock, time::Duration};
use time::Date;
use tokio::fs::create_dir_all;
use weather_aggregator_core::DATABASE_FILE;

use super::{
    City, CityWithCountry, Country, Error, Forecast, ForecastData, ForecastPredicate,
    ForecastWithRelations, ReferenceData, Source,
};
use crate::{format_iso_date, parse_stored_date};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern is valid"));

const FORECAST_COLUMNS: &str = "f.id, f.city_id, f.country_id, f.source_id, \
     f.collection_date, f.forecasted_day, f.temp_high, f.temp_low, \
     f.wind_speed, f.humidity, f.precipitation_chance, f.precipitation_amount, \
     f.state, f.weather_condition, \
     c.id AS city_ref_id, c.name AS city_name, c.country_id AS city_country_id, \
     cc.id AS city_country_ref_id, cc.name AS city_country_name, \
     co.id AS country_ref_id, co.name AS country_name, \
     s.id AS source_ref_id, s.name AS source_name";

const FORECAST_JOINS: &str = "forecast AS f \
     LEFT JOIN city AS c ON c.id = f.city_id \
     LEFT JOIN country AS cc ON cc.id = c.country_id \
     LEFT JOIN country AS co ON co.id = f.country_id \
     LEFT JOIN source AS s ON s.id = f.source_id";

/// Read-only handle on the scraped forecast database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(dir: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db_path = Path::new(dir).join(DATABASE_FILE);

        if let Some(parent) = db_path.parent() {
            create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory: {parent:?}"))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .pragma("journal_mode", "WAL")
            .pragma("synchronous", "NORMAL")
            .pragma("busy_timeout", "5000")
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let db = Self { pool };
        db.run_migrations().await?;
        info!("SQLite database initialized at: {}", db_path.display());

        Ok(db)
    }

    async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked out connections and close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }

    /// scooby renders postgres style `$n` placeholders, sqlite binds `?` in order
    fn to_sqlite(select: &Select) -> String {
        PLACEHOLDER
            .replace_all(&select.to_string(), "?")
            .into_owned()
    }
}

fn build_forecast_query(predicate: &ForecastPredicate) -> (Select, Vec<QueryValue>) {
    let mut placeholders = Parameters::new();
    let mut values = vec![];

    let mut query = select(FORECAST_COLUMNS).from(FORECAST_JOINS);

    if !predicate.city_ids.is_empty() {
        query = query.where_(format!(
            "f.city_id IN ({})",
            placeholders.next_n(predicate.city_ids.len())
        ));
        values.extend(predicate.city_ids.iter().copied().map(QueryValue::Int));
    }
    if let Some(source_id) = predicate.source_id {
        query = query.where_(format!("f.source_id = {}", placeholders.next_n(1)));
        values.push(QueryValue::Int(source_id));
    }
    if let Some(country_id) = predicate.country_id {
        query = query.where_(format!("f.country_id = {}", placeholders.next_n(1)));
        values.push(QueryValue::Int(country_id));
    }
    if let Some(from) = predicate.forecasted_from {
        query = query.where_(format!("date(f.forecasted_day) >= {}", placeholders.next_n(1)));
        values.push(QueryValue::Text(format_iso_date(from)));
    }
    if let Some(to) = predicate.forecasted_to {
        query = query.where_(format!("date(f.forecasted_day) <= {}", placeholders.next_n(1)));
        values.push(QueryValue::Text(format_iso_date(to)));
    }

    (query.order_by("f.id"), values)
}

#[derive(Debug, Clone, PartialEq)]
enum QueryValue {
    Int(i64),
    Text(String),
}

fn city_from_row(row: &SqliteRow) -> Result<City, Error> {
    Ok(City {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        country_id: row.try_get("country_id")?,
    })
}

fn named_from_row(row: &SqliteRow) -> Result<(i64, String), Error> {
    Ok((row.try_get("id")?, row.try_get("name")?))
}

fn stored_date(row: &SqliteRow, column: &str) -> Result<Date, Error> {
    let raw: String = row.try_get(column)?;
    parse_stored_date(&raw).ok_or(Error::InvalidStoredDate(raw))
}

fn forecast_from_row(row: &SqliteRow) -> Result<ForecastWithRelations, Error> {
    let forecast = Forecast {
        id: row.try_get("id")?,
        city_id: row.try_get("city_id")?,
        country_id: row.try_get("country_id")?,
        source_id: row.try_get("source_id")?,
        collection_date: stored_date(row, "collection_date")?,
        forecasted_day: stored_date(row, "forecasted_day")?,
        temp_high: row.try_get("temp_high")?,
        temp_low: row.try_get("temp_low")?,
        wind_speed: row.try_get("wind_speed")?,
        humidity: row.try_get("humidity")?,
        precipitation_chance: row.try_get("precipitation_chance")?,
        precipitation_amount: row.try_get("precipitation_amount")?,
        state: row.try_get("state")?,
        weather_condition: row.try_get("weather_condition")?,
    };

    let city_country = joined_country(row, "city_country_ref_id", "city_country_name")?;
    let city = match row.try_get::<Option<i64>, _>("city_ref_id")? {
        Some(id) => Some(CityWithCountry {
            city: City {
                id,
                name: row.try_get("city_name")?,
                country_id: row.try_get("city_country_id")?,
            },
            country: city_country,
        }),
        None => None,
    };

    let source = match row.try_get::<Option<i64>, _>("source_ref_id")? {
        Some(id) => Some(Source {
            id,
            name: row.try_get("source_name")?,
        }),
        None => None,
    };

    Ok(ForecastWithRelations {
        forecast,
        city,
        country: joined_country(row, "country_ref_id", "country_name")?,
        source,
    })
}

fn joined_country(row: &SqliteRow, id_column: &str, name_column: &str) -> Result<Option<Country>, Error> {
    match row.try_get::<Option<i64>, _>(id_column)? {
        Some(id) => Ok(Some(Country {
            id,
            name: row.try_get(name_column)?,
        })),
        None => Ok(None),
    }
}

#[async_trait]
impl ReferenceData for Database {
    async fn find_cities_by_names(&self, names: &[String]) -> Result<Vec<City>, Error> {
        if names.is_empty() {
            return Ok(vec![]);
        }
        let mut placeholders = Parameters::new();
        let query = select("id, name, country_id")
            .from("city")
            .where_(format!("name IN ({})", placeholders.next_n(names.len())))
            .order_by("id");

        let sql = Self::to_sqlite(&query);
        let mut stmt = sqlx::query(&sql);
        for name in names {
            stmt = stmt.bind(name.as_str());
        }
        let rows = stmt.fetch_all(&self.pool).await?;
        rows.iter().map(city_from_row).collect()
    }

    async fn find_country_by_name(&self, name: &str) -> Result<Option<Country>, Error> {
        let row = sqlx::query("SELECT id, name FROM country WHERE name = ? ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(named_from_row)
            .transpose()
            .map(|found| found.map(|(id, name)| Country { id, name }))
    }

    async fn find_source_by_name(&self, name: &str) -> Result<Option<Source>, Error> {
        let row = sqlx::query("SELECT id, name FROM source WHERE name = ? ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(named_from_row)
            .transpose()
            .map(|found| found.map(|(id, name)| Source { id, name }))
    }

    async fn find_cities_by_country_id(&self, country_id: i64) -> Result<Vec<City>, Error> {
        let rows = sqlx::query("SELECT id, name, country_id FROM city WHERE country_id = ? ORDER BY id")
            .bind(country_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(city_from_row).collect()
    }

    async fn cities(&self, name_contains: Option<String>) -> Result<Vec<City>, Error> {
        let rows = match name_contains {
            Some(fragment) => {
                sqlx::query(
                    "SELECT id, name, country_id FROM city WHERE name LIKE '%' || ? || '%' ORDER BY id",
                )
                .bind(fragment)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT id, name, country_id FROM city ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(city_from_row).collect()
    }

    async fn countries(&self) -> Result<Vec<Country>, Error> {
        let rows = sqlx::query("SELECT id, name FROM country ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| named_from_row(row).map(|(id, name)| Country { id, name }))
            .collect()
    }

    async fn sources(&self) -> Result<Vec<Source>, Error> {
        let rows = sqlx::query("SELECT id, name FROM source ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| named_from_row(row).map(|(id, name)| Source { id, name }))
            .collect()
    }
}

#[async_trait]
impl ForecastData for Database {
    async fn fetch_forecasts(
        &self,
        predicate: &ForecastPredicate,
    ) -> Result<Vec<ForecastWithRelations>, Error> {
        let (query, values) = build_forecast_query(predicate);
        let sql = Self::to_sqlite(&query);
        debug!("forecast query: {}", sql);

        let mut stmt = sqlx::query(&sql);
        for value in values {
            stmt = match value {
                QueryValue::Int(v) => stmt.bind(v),
                QueryValue::Text(v) => stmt.bind(v),
            };
        }
        let rows = stmt.fetch_all(&self.pool).await?;
        rows.iter().map(forecast_from_row).collect()
    }

    async fn collection_dates(&self) -> Result<Vec<Date>, Error> {
        let days: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT date(collection_date) AS day FROM forecast
             WHERE date(collection_date) IS NOT NULL
             ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await?;

        days.into_iter()
            .map(|day| parse_stored_date(&day).ok_or(Error::InvalidStoredDate(day)))
            .collect()
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
