//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::PrayerError;
use crate::scheduler::SchedulerError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Engine or remote source error
    Prayer(PrayerError),
    /// Reminder scheduler error
    Scheduler(SchedulerError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Prayer(e) => {
                let details = e.context().to_string();
                let (status, code) = match &e {
                    PrayerError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                    PrayerError::AstronomicalAnomaly { .. } => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE")
                    }
                    PrayerError::RemoteSource { .. } => (StatusCode::BAD_GATEWAY, "INTERNAL_ERROR"),
                    PrayerError::Configuration { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                (status, ApiError::new(code, e.to_string()).with_details(details))
            }
            AppError::Scheduler(e) => match &e {
                SchedulerError::DispatcherUnavailable { armed, failed, .. } => {
                    let armed: Vec<&str> = armed.iter().map(|r| r.id.as_str()).collect();
                    let failed: Vec<&str> = failed.iter().map(|id| id.as_str()).collect();
                    let details = format!("armed=[{}]; failed=[{}]", armed.join(", "), failed.join(", "));
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        ApiError::new("DISPATCHER_UNAVAILABLE", e.to_string()).with_details(details),
                    )
                }
                SchedulerError::InvalidTransition { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ApiError::new("UNPROCESSABLE", e.to_string()),
                ),
                SchedulerError::UnknownReminder { .. } => {
                    (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", e.to_string()))
                }
            },
        };

        (status, Json(error)).into_response()
    }
}

impl From<PrayerError> for AppError {
    fn from(err: PrayerError) -> Self {
        AppError::Prayer(err)
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        AppError::Scheduler(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    use crate::models::Prayer;
    use crate::scheduler::{ReminderId, ReminderRequest};

    async fn body_of(error: AppError) -> (StatusCode, ApiError) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_dispatcher_unavailable_lists_reminder_ids() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let fire_at = FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 5, 39, 0)
            .unwrap();
        let error = SchedulerError::DispatcherUnavailable {
            armed: vec![ReminderRequest::new(day, Prayer::Fajr, fire_at, "adhan.wav")],
            failed: vec![ReminderId::new(day, Prayer::Sunrise), ReminderId::new(day, Prayer::Dhuhr)],
            reason: "notifications disabled".to_string(),
        };

        let (status, body) = body_of(AppError::from(error)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code, "DISPATCHER_UNAVAILABLE");
        assert_eq!(
            body.details.as_deref(),
            Some("armed=[2024-01-01:Fajr]; failed=[2024-01-01:Sunrise, 2024-01-01:Dhuhr]")
        );
    }

    #[tokio::test]
    async fn test_remote_error_is_bad_gateway() {
        let (status, body) = body_of(AppError::from(PrayerError::remote("timeout"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.code, "INTERNAL_ERROR");
    }
}
