use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{export::Error, format_iso_date, AppState, City, Country, Source};

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CityFilter {
    /// Only return cities whose name contains this text
    pub name: Option<String>,
}

#[utoipa::path(
    get,
    path = "/cities",
    params(CityFilter),
    responses(
        (status = OK, description = "Successfully retrieved cities", content_type = "application/json", body = Vec<City>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to retrieve cities", body = crate::ErrorBody)
    ))]
pub async fn get_cities(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CityFilter>,
) -> Result<Json<Vec<City>>, Error> {
    let name = filter.name.filter(|n| !n.trim().is_empty());
    let cities = state.reference_data.cities(name).await?;
    Ok(Json(cities))
}

#[utoipa::path(
    get,
    path = "/countries",
    responses(
        (status = OK, description = "Successfully retrieved countries", content_type = "application/json", body = Vec<Country>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to retrieve countries", body = crate::ErrorBody)
    ))]
pub async fn get_countries(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Country>>, Error> {
    let countries = state.reference_data.countries().await?;
    Ok(Json(countries))
}

#[utoipa::path(
    get,
    path = "/sources",
    responses(
        (status = OK, description = "Successfully retrieved forecast sources", content_type = "application/json", body = Vec<Source>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to retrieve sources", body = crate::ErrorBody)
    ))]
pub async fn get_sources(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Source>>, Error> {
    let sources = state.reference_data.sources().await?;
    Ok(Json(sources))
}

#[utoipa::path(
    get,
    path = "/collection-dates",
    responses(
        (status = OK, description = "Distinct forecast collection dates, oldest first", content_type = "application/json", body = Vec<String>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to retrieve collection dates", body = crate::ErrorBody)
    ))]
pub async fn get_collection_dates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, Error> {
    let dates = state.forecast_data.collection_dates().await?;
    Ok(Json(dates.into_iter().map(format_iso_date).collect()))
}
