use crate::helpers::{
    body_text, forecast_for, get, japan, meteoblue, osaka, spawn_app, spawn_app_with_style,
    tokyo, MockForecastStore, MockReferenceStore,
};
use forecast_api::{ForecastPredicate, WeatherConditionStyle};
use hyper::{header, StatusCode};
use serde_json::{from_str, Value};
use time::macros::date;

const HEADER_LINE: &str = "source,city,country,state,collection_date,forecasted_day,temp_high,temp_low,wind_speed,humidity,precipitation_chance,precipitation_amount,weather_condition";

fn error_message(body: &str) -> String {
    let json: Value = from_str(body).unwrap();
    json["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn exports_tokyo_forecasts_as_csv() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_cities_by_names()
        .withf(|names| names == [String::from("Tokyo")])
        .times(1)
        .returning(|_| Ok(vec![tokyo()]));

    let mut forecasts = MockForecastStore::new();
    forecasts
        .expect_fetch_forecasts()
        .withf(|predicate| {
            *predicate
                == ForecastPredicate {
                    city_ids: vec![10],
                    source_id: None,
                    country_id: None,
                    forecasted_from: Some(date!(2024 - 09 - 01)),
                    forecasted_to: Some(date!(2024 - 09 - 07)),
                }
        })
        .times(1)
        .returning(|_| Ok(vec![forecast_for(1, tokyo(), date!(2024 - 09 - 03))]));

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(
        &test_app.app,
        "/forecasts?city=Tokyo&startDate=2024-09-01&endDate=2024-09-07",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=forecasts.csv"
    );
    assert!(response.headers().get("x-warning").is_none());

    let body = body_text(response).await;
    assert_eq!(
        body,
        format!(
            "{}\nMeteoBlue,Tokyo,Japan,,2024-09-01,2024-09-03,28,20,,,,,\"\"  \"\"",
            HEADER_LINE
        )
    );
}

#[tokio::test]
async fn standard_style_quotes_weather_condition_normally() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_cities_by_names()
        .returning(|_| Ok(vec![tokyo()]));

    let mut forecasts = MockForecastStore::new();
    forecasts.expect_fetch_forecasts().returning(|_| {
        let mut entry = forecast_for(1, tokyo(), date!(2024 - 09 - 03));
        entry.forecast.weather_condition = Some(String::from("Rain, heavy"));
        Ok(vec![entry])
    });

    let test_app =
        spawn_app_with_style(reference, forecasts, WeatherConditionStyle::Standard).await;
    let body = body_text(get(&test_app.app, "/forecasts?city=Tokyo").await).await;

    assert!(body.ends_with(",28,20,,,,,\"Rain, heavy\""));
}

#[tokio::test]
async fn partially_matched_cities_are_reported_in_warning_header() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_cities_by_names()
        .withf(|names| names == [String::from("Tokyo"), String::from("Atlantis")])
        .times(1)
        .returning(|_| Ok(vec![tokyo()]));

    let mut forecasts = MockForecastStore::new();
    forecasts
        .expect_fetch_forecasts()
        .withf(|predicate| predicate.city_ids == vec![10])
        .times(1)
        .returning(|_| Ok(vec![forecast_for(1, tokyo(), date!(2024 - 09 - 03))]));

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(&test_app.app, "/forecasts?city=Tokyo,Atlantis").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-warning").unwrap(),
        "Cities not found: Atlantis"
    );
}

#[tokio::test]
async fn no_matching_city_is_not_found() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_cities_by_names()
        .times(1)
        .returning(|_| Ok(vec![]));

    let mut forecasts = MockForecastStore::new();
    forecasts.expect_fetch_forecasts().never();

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(&test_app.app, "/forecasts?city=Atlantis,Lemuria").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(&body_text(response).await),
        "City not found."
    );
}

#[tokio::test]
async fn inverted_date_range_is_rejected_before_any_lookup() {
    let mut reference = MockReferenceStore::new();
    reference.expect_find_cities_by_names().never();
    let mut forecasts = MockForecastStore::new();
    forecasts.expect_fetch_forecasts().never();

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(
        &test_app.app,
        "/forecasts?city=Tokyo&startDate=2024-09-08&endDate=2024-09-01",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&body_text(response).await),
        "startDate cannot be after endDate."
    );
}

#[tokio::test]
async fn malformed_start_date_is_rejected() {
    let test_app = spawn_app(MockReferenceStore::new(), MockForecastStore::new()).await;
    let response = get(&test_app.app, "/forecasts?startDate=09/01/2024").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&body_text(response).await),
        "Invalid startDate format."
    );
}

#[tokio::test]
async fn malformed_end_date_is_rejected() {
    let test_app = spawn_app(MockReferenceStore::new(), MockForecastStore::new()).await;
    let response = get(
        &test_app.app,
        "/forecasts?startDate=2024-09-01&endDate=2024-13-40",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(&body_text(response).await),
        "Invalid endDate format."
    );
}

#[tokio::test]
async fn duplicated_query_parameter_is_a_json_bad_request() {
    let test_app = spawn_app(MockReferenceStore::new(), MockForecastStore::new()).await;
    let response = get(
        &test_app.app,
        "/forecasts?startDate=2024-09-01&startDate=2024-09-02",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(&body_text(response).await).contains("startDate"));
}

#[tokio::test]
async fn unknown_country_is_not_found() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_country_by_name()
        .withf(|name| name == "Atlantis")
        .times(1)
        .returning(|_| Ok(None));
    reference.expect_find_cities_by_country_id().never();

    let mut forecasts = MockForecastStore::new();
    forecasts.expect_fetch_forecasts().never();

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(&test_app.app, "/forecasts?country=Atlantis").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(&body_text(response).await),
        "Country not found."
    );
}

#[tokio::test]
async fn unknown_source_is_not_found() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_source_by_name()
        .withf(|name| name == "Nowhere")
        .times(1)
        .returning(|_| Ok(None));

    let test_app = spawn_app(reference, MockForecastStore::new()).await;
    let response = get(&test_app.app, "/forecasts?source=Nowhere").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(&body_text(response).await),
        "Source not found."
    );
}

#[tokio::test]
async fn city_errors_take_precedence_over_country_errors() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_cities_by_names()
        .returning(|_| Ok(vec![]));
    reference
        .expect_find_country_by_name()
        .returning(|_| Ok(None));

    let test_app = spawn_app(reference, MockForecastStore::new()).await;
    let response = get(&test_app.app, "/forecasts?city=Atlantis&country=Nowhere").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(&body_text(response).await),
        "City not found."
    );
}

#[tokio::test]
async fn country_expands_to_its_cities() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_country_by_name()
        .withf(|name| name == "Japan")
        .times(1)
        .returning(|_| Ok(Some(japan())));
    reference
        .expect_find_cities_by_country_id()
        .withf(|id| *id == 1)
        .times(1)
        .returning(|_| Ok(vec![tokyo(), osaka()]));
    reference
        .expect_find_source_by_name()
        .withf(|name| name == "MeteoBlue")
        .times(1)
        .returning(|_| Ok(Some(meteoblue())));

    let mut forecasts = MockForecastStore::new();
    forecasts
        .expect_fetch_forecasts()
        .withf(|predicate| {
            predicate.city_ids == vec![10, 11]
                && predicate.country_id == Some(1)
                && predicate.source_id == Some(3)
        })
        .times(1)
        .returning(|_| {
            Ok(vec![
                forecast_for(1, osaka(), date!(2024 - 09 - 02)),
                forecast_for(2, tokyo(), date!(2024 - 09 - 02)),
                forecast_for(3, osaka(), date!(2024 - 09 - 03)),
            ])
        });

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(&test_app.app, "/forecasts?country=Japan&source=MeteoBlue").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    let cities: Vec<&str> = body
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(cities, vec!["Osaka", "Osaka", "Tokyo"]);
}

#[tokio::test]
async fn country_without_forecasts_is_not_found() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_country_by_name()
        .returning(|_| Ok(Some(japan())));
    reference
        .expect_find_cities_by_country_id()
        .returning(|_| Ok(vec![tokyo()]));

    let mut forecasts = MockForecastStore::new();
    forecasts
        .expect_fetch_forecasts()
        .times(1)
        .returning(|_| Ok(vec![]));

    let test_app = spawn_app(reference, forecasts).await;
    let response = get(&test_app.app, "/forecasts?country=Japan").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(&body_text(response).await),
        "No forecasts found for the specified criteria."
    );
}

#[tokio::test]
async fn only_dangling_rows_is_not_found() {
    let mut forecasts = MockForecastStore::new();
    forecasts.expect_fetch_forecasts().returning(|_| {
        let mut orphan = forecast_for(1, tokyo(), date!(2024 - 09 - 03));
        orphan.city = None;
        Ok(vec![orphan])
    });

    let test_app = spawn_app(MockReferenceStore::new(), forecasts).await;
    let response = get(&test_app.app, "/forecasts").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_failures_hide_details() {
    let mut forecasts = MockForecastStore::new();
    forecasts
        .expect_fetch_forecasts()
        .returning(|_| Err(sqlx::Error::PoolTimedOut.into()));

    let test_app = spawn_app(MockReferenceStore::new(), forecasts).await;
    let response = get(&test_app.app, "/forecasts").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(&body_text(response).await),
        "Internal Server Error"
    );
}

#[tokio::test]
async fn repeated_requests_return_identical_bodies() {
    let mut reference = MockReferenceStore::new();
    reference
        .expect_find_cities_by_names()
        .times(2)
        .returning(|_| Ok(vec![tokyo(), osaka()]));

    let mut forecasts = MockForecastStore::new();
    forecasts.expect_fetch_forecasts().times(2).returning(|_| {
        Ok(vec![
            forecast_for(1, tokyo(), date!(2024 - 09 - 02)),
            forecast_for(2, osaka(), date!(2024 - 09 - 02)),
            forecast_for(3, tokyo(), date!(2024 - 09 - 03)),
        ])
    });

    let test_app = spawn_app(reference, forecasts).await;
    let first = body_text(get(&test_app.app, "/forecasts?city=Tokyo,Osaka").await).await;
    let second = body_text(get(&test_app.app, "/forecasts?city=Tokyo,Osaka").await).await;

    assert_eq!(first, second);
    assert_eq!(first.lines().count(), 4);
}
