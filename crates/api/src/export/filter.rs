use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use time::Date;
use utoipa::IntoParams;

use super::Error;
use crate::{parse_iso_date, ForecastPredicate, ReferenceData};

/// Raw `/forecasts` query string. Every field is optional and empty values
/// are treated as absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ForecastQuery {
    /// Comma separated city names, e.g. `Tokyo,Berlin`
    pub city: Option<String>,
    /// Country name, expands to every city of that country
    pub country: Option<String>,
    /// Forecast provider name, e.g. `MeteoBlue`
    pub source: Option<String>,
    /// First forecasted day to include (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Last forecasted day to include (YYYY-MM-DD)
    pub end_date: Option<String>,
}

impl ForecastQuery {
    /// City names in request order, trimmed, without blanks or repeats
    pub fn city_names(&self) -> Vec<String> {
        self.city
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unique()
            .map(String::from)
            .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(value: &Option<String>, field: &'static str) -> Result<Option<Date>, Error> {
    non_empty(value)
        .map(|raw| parse_iso_date(raw).map_err(|_| Error::InvalidDateFormat(field)))
        .transpose()
}

/// Predicate plus the requested city names that matched nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFilter {
    pub predicate: ForecastPredicate,
    pub unmatched_cities: Vec<String>,
}

pub struct FilterResolver {
    reference: Arc<dyn ReferenceData>,
}

impl FilterResolver {
    pub fn new(reference: Arc<dyn ReferenceData>) -> Self {
        Self { reference }
    }

    pub async fn resolve(&self, query: &ForecastQuery) -> Result<ResolvedFilter, Error> {
        let forecasted_from = parse_bound(&query.start_date, "startDate")?;
        let forecasted_to = parse_bound(&query.end_date, "endDate")?;
        if let (Some(start), Some(end)) = (forecasted_from, forecasted_to) {
            if start > end {
                return Err(Error::DateRangeInverted);
            }
        }

        let city_names = query.city_names();
        let country_name = non_empty(&query.country);
        let source_name = non_empty(&query.source);

        // independent lookups, errors are still reported city -> country -> source
        let (cities, country, source) = tokio::join!(
            async {
                if city_names.is_empty() {
                    Ok(vec![])
                } else {
                    self.reference.find_cities_by_names(&city_names).await
                }
            },
            async {
                match country_name {
                    Some(name) => self.reference.find_country_by_name(name).await,
                    None => Ok(None),
                }
            },
            async {
                match source_name {
                    Some(name) => self.reference.find_source_by_name(name).await,
                    None => Ok(None),
                }
            },
        );

        let cities = cities?;
        if !city_names.is_empty() && cities.is_empty() {
            return Err(Error::CityNotFound);
        }
        let found: HashSet<&str> = cities.iter().map(|c| c.name.as_str()).collect();
        let unmatched_cities: Vec<String> = city_names
            .iter()
            .filter(|name| !found.contains(name.as_str()))
            .cloned()
            .collect();
        if !unmatched_cities.is_empty() {
            warn!("Cities not found: {}", unmatched_cities.join(", "));
        }

        let country = match (country_name, country?) {
            (Some(_), None) => return Err(Error::CountryNotFound),
            (_, country) => country,
        };
        let source = match (source_name, source?) {
            (Some(_), None) => return Err(Error::SourceNotFound),
            (_, source) => source,
        };

        let mut city_ids: Vec<i64> = cities.iter().map(|c| c.id).collect();
        if let Some(country) = &country {
            let country_cities = self.reference.find_cities_by_country_id(country.id).await?;
            city_ids.extend(country_cities.iter().map(|c| c.id));
        }
        let city_ids = city_ids.into_iter().unique().collect();

        let predicate = ForecastPredicate {
            city_ids,
            source_id: source.map(|s| s.id),
            country_id: country.map(|c| c.id),
            forecasted_from,
            forecasted_to,
        };
        debug!("resolved forecast predicate: {:?}", predicate);

        Ok(ResolvedFilter {
            predicate,
            unmatched_cities,
        })
    }
}
