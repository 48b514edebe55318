use crate::{
    db, export, forecasts, get_cities, get_collection_dates, get_countries, get_sources, health,
    routes, Database, ForecastData, ForecastExporter, ReferenceData, WeatherConditionStyle,
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{HeaderName, ACCEPT, CONTENT_DISPOSITION},
    Method,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub reference_data: Arc<dyn ReferenceData>,
    pub forecast_data: Arc<dyn ForecastData>,
    pub exporter: Arc<ForecastExporter>,
}

impl AppState {
    pub fn new(
        reference_data: Arc<dyn ReferenceData>,
        forecast_data: Arc<dyn ForecastData>,
        weather_condition: WeatherConditionStyle,
    ) -> Self {
        let exporter = Arc::new(ForecastExporter::new(
            reference_data.clone(),
            forecast_data.clone(),
            weather_condition,
        ));
        Self {
            reference_data,
            forecast_data,
            exporter,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::reference::reference_routes::get_cities,
        routes::reference::reference_routes::get_countries,
        routes::reference::reference_routes::get_sources,
        routes::reference::reference_routes::get_collection_dates,
        routes::forecasts::forecast_routes::forecasts,
        routes::health::health_routes::health,
    ),
    components(
        schemas(
                db::City,
                db::Country,
                db::Source,
                export::ErrorBody,
                routes::health::health_routes::Health
            )
    ),
    tags(
        (name = "weather forecast aggregation api", description = "a RESTful api serving scraped weather forecasts as csv exports")
    )
)]
struct ApiDoc;

pub async fn build_app_state(
    database: Database,
    weather_condition: WeatherConditionStyle,
) -> Result<AppState, anyhow::Error> {
    database
        .health_check()
        .await
        .map_err(|e| anyhow!("error checking database: {}", e))?;

    let database = Arc::new(database);
    Ok(AppState::new(database.clone(), database, weather_condition))
}

pub fn app(app_state: AppState) -> Router {
    let api_docs = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT])
        .expose_headers([
            CONTENT_DISPOSITION,
            HeaderName::from_static(export::WARNING_HEADER),
        ])
        .allow_origin(Any);

    Router::new()
        .route("/cities", get(get_cities))
        .route("/countries", get(get_countries))
        .route("/sources", get(get_sources))
        .route("/collection-dates", get(get_collection_dates))
        .route("/forecasts", get(forecasts))
        .route("/health", get(health))
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default()
        .to_owned();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}
