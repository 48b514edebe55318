use axum::{extract::State, http::StatusCode, Json};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct Health {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = OK, description = "Database is reachable", body = Health),
        (status = SERVICE_UNAVAILABLE, description = "Database check failed", body = Health)
    ))]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Health>) {
    match state.forecast_data.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Health {
                status: String::from("ok"),
            }),
        ),
        Err(e) => {
            error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Health {
                    status: String::from("unavailable"),
                }),
            )
        }
    }
}
