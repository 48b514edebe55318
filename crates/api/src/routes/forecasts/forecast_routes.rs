use axum::extract::{rejection::QueryRejection, Query, State};
use std::sync::Arc;

use crate::{
    export::{Error, ForecastExport, ForecastQuery},
    AppState,
};

#[utoipa::path(
    get,
    path = "/forecasts",
    params(ForecastQuery),
    responses(
        (status = OK, description = "Matching forecasts grouped by source and city. Requested cities that were not found are listed in the `X-Warning` header", content_type = "text/csv", body = String),
        (status = BAD_REQUEST, description = "Malformed query string, invalid date or date range", body = crate::ErrorBody),
        (status = NOT_FOUND, description = "Unknown city, country or source, or no matching forecasts", body = crate::ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to build the export", body = crate::ErrorBody)
    ))]
pub async fn forecasts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<ForecastExport, Error> {
    let Query(query) = query.map_err(|rejection| Error::InvalidQuery(rejection.body_text()))?;
    state.exporter.export(&query).await
}
