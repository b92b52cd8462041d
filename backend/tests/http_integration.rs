#![cfg(feature = "http-server")]

mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use salah::config::AppConfig;
use salah::http::{create_router, AppState};
use salah::scheduler::{LoggingDispatcher, ReminderScheduler};
use salah::services::{FixedClock, PrayerEngine, StaticLocation};
use support::{at, date, offset_hours};

fn london_state() -> AppState {
    let config = AppConfig::parse(
        r#"
[location]
latitude = 51.5074
longitude = -0.1278
utc_offset_minutes = 60

[calculation]
method = "muslim_world_league"
fallback = { kind = "angle_based" }
"#,
    )
    .unwrap();

    let clock = FixedClock::new(at(offset_hours(1), date(2024, 6, 21), 12, 0));
    let scheduler = ReminderScheduler::new(
        Arc::new(LoggingDispatcher::new()),
        config.scheduler_config(),
    );
    AppState::new(
        &config,
        Arc::new(PrayerEngine::new(config.engine_config())),
        Arc::new(scheduler),
        Arc::new(clock),
    )
    .unwrap()
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_configured_fallback_applies_to_default_location() {
    let (status, body) = get(london_state(), "/v1/prayer-times").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2024-06-21");
    assert_eq!(body["method"], "muslim_world_league");
    assert_eq!(body["anomaly"]["fallback"], "angle_based");
    assert_eq!(body["timings"][0]["time"], "02:31");
    assert_eq!(body["timings"][5]["time"], "23:27");
}

#[tokio::test]
async fn test_device_location_overrides_default() {
    let device = StaticLocation(Some(salah::models::GeoCoordinate::MECCA));
    let state = london_state().with_location(Arc::new(device));

    let (status, body) = get(state, "/v1/qibla").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 21.3891);
    assert!(body["distance_km"].as_f64().unwrap() < 10.0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = create_router(london_state())
        .oneshot(Request::builder().uri("/v2/prayer-times").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_reminder_path_is_rejected() {
    let response = create_router(london_state())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/v1/reminders/2024-06-21/brunch")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
