//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/methods", get(handlers::list_methods))
        // Schedules
        .route("/prayer-times", get(handlers::get_prayer_times))
        .route("/next-prayer", get(handlers::get_next_prayer))
        .route("/qibla", get(handlers::get_qibla))
        // Reminders
        .route("/reminders", delete(handlers::cancel_all_reminders))
        .route("/reminders/refresh", post(handlers::refresh_reminders))
        .route("/reminders/{date}", get(handlers::get_reminders))
        .route("/reminders/{date}/{prayer}", delete(handlers::cancel_reminder));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use chrono::{FixedOffset, TimeZone};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::scheduler::{LoggingDispatcher, ReminderScheduler};
    use crate::services::{FixedClock, PrayerEngine};

    fn test_state(hour: u32) -> (AppState, Arc<LoggingDispatcher>) {
        let config = AppConfig::default();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let clock = FixedClock::new(offset.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap());
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let scheduler = ReminderScheduler::new(dispatcher.clone(), config.scheduler_config());
        let state = AppState::new(
            &config,
            Arc::new(PrayerEngine::new(config.engine_config())),
            Arc::new(scheduler),
            Arc::new(clock),
        )
        .unwrap();
        (state, dispatcher)
    }

    async fn send(state: AppState, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state(4);
        let (status, body) = send(state, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_methods_lists_every_method() {
        let (state, _) = test_state(4);
        let (status, body) = send(state, Method::GET, "/v1/methods", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["methods"].as_array().unwrap().len(), 15);
        assert_eq!(body["default"], "umm_al_qura");
    }

    #[tokio::test]
    async fn test_prayer_times_defaults_to_configured_location() {
        let (state, _) = test_state(4);
        let (status, body) = send(state, Method::GET, "/v1/prayer-times", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2024-01-01");
        assert_eq!(body["source"], "local");
        assert_eq!(body["utc_offset_minutes"], 180);

        let timings = body["timings"].as_array().unwrap();
        let times: Vec<&str> = timings.iter().map(|t| t["time"].as_str().unwrap()).collect();
        assert_eq!(times, ["05:37", "06:58", "12:24", "15:29", "17:50", "19:20"]);
        assert!(body.get("anomaly").is_none());
    }

    #[tokio::test]
    async fn test_prayer_times_explicit_location_and_format() {
        let (state, _) = test_state(4);
        let uri = "/v1/prayer-times?lat=21.3891&lon=39.8579&offset_minutes=180&method=mwl&date=2024-01-01&format=12h";
        let (status, body) = send(state, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "muslim_world_league");
        assert_eq!(body["timings"][0]["time"], "5:39 AM");
        assert_eq!(body["timings"][5]["time"], "7:04 PM");
    }

    #[tokio::test]
    async fn test_prayer_times_rejects_bad_input() {
        let (state, _) = test_state(4);
        let (status, body) = send(state.clone(), Method::GET, "/v1/prayer-times?lat=95&lon=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = send(state.clone(), Method::GET, "/v1/prayer-times?lat=10", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(state, Method::GET, "/v1/prayer-times?method=unknown", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_polar_schedule_reports_anomaly() {
        let (state, _) = test_state(4);
        let uri = "/v1/prayer-times?lat=70&lon=25&offset_minutes=120&method=mwl&date=2024-06-21";
        let (status, body) = send(state, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["anomaly"]["fallback"], "nearest_latitude");
        assert_eq!(body["timings"][0]["adjusted"], true);
        assert_eq!(body["timings"][2]["adjusted"], false);
    }

    #[tokio::test]
    async fn test_next_prayer_uses_clock() {
        let (state, _) = test_state(13);
        let (status, body) = send(state, Method::GET, "/v1/next-prayer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prayer"], "Asr");
        assert_eq!(body["time"], "15:29");
        assert_eq!(body["minutes_remaining"], 149);
        assert_eq!(body["is_tomorrow"], false);
    }

    #[tokio::test]
    async fn test_next_prayer_after_isha_is_tomorrow() {
        let (state, _) = test_state(22);
        let (status, body) = send(state, Method::GET, "/v1/next-prayer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prayer"], "Fajr");
        assert_eq!(body["is_tomorrow"], true);
    }

    #[tokio::test]
    async fn test_qibla() {
        let (state, _) = test_state(4);
        let (status, body) = send(state, Method::GET, "/v1/qibla?lat=40.7128&lon=-74.0060", None).await;
        assert_eq!(status, StatusCode::OK);
        let bearing = body["bearing"].as_f64().unwrap();
        assert!((bearing - 58.48).abs() < 0.1, "bearing {}", bearing);
    }

    #[tokio::test]
    async fn test_refresh_then_list_and_cancel() {
        let (state, dispatcher) = test_state(13);

        let (status, body) =
            send(state.clone(), Method::POST, "/v1/reminders/refresh", Some("{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(dispatcher.live_count(), 3);

        let (status, body) = send(state.clone(), Method::GET, "/v1/reminders/2024-01-01", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reminders"][0]["prayer"], "Asr");

        let (status, body) =
            send(state.clone(), Method::DELETE, "/v1/reminders/2024-01-01/asr", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);

        let (status, _) =
            send(state.clone(), Method::DELETE, "/v1/reminders/2024-01-01/fajr", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(state, Method::DELETE, "/v1/reminders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cancelled"], 2);
        assert_eq!(dispatcher.live_count(), 0);
    }
}
