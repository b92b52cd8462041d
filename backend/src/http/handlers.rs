//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! schedule source or the reminder scheduler held in [`AppState`].

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{FixedOffset, NaiveDate};
use log::debug;

use super::dto::{
    HealthResponse, LocationQuery, MethodDto, MethodsResponse, NextPrayerResponse,
    PrayerTimesQuery, PrayerTimesResponse, QiblaQuery, QiblaResponse, RefreshRemindersRequest,
    RemindersResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::{
    offset_from_minutes, CalculationMethod, GeoCoordinate, Prayer, TimeFormat,
    METHOD_TABLE_VERSION,
};
use crate::scheduler::ReminderId;
use crate::services::qibla_direction;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Request helpers
// =============================================================================

/// Coordinate and offset for a request, falling back to the server defaults.
fn resolve_location(
    state: &AppState,
    query: &LocationQuery,
) -> Result<(GeoCoordinate, FixedOffset), AppError> {
    let explicit_offset = query.offset_minutes.map(offset_from_minutes).transpose()?;

    match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => {
            let coordinate = GeoCoordinate::new(lat, lon)?;
            let offset = explicit_offset.unwrap_or_else(|| coordinate.nominal_utc_offset());
            Ok((coordinate, offset))
        }
        (None, None) => Ok((
            state.current_coordinate(),
            explicit_offset.unwrap_or(state.default_offset),
        )),
        _ => Err(AppError::BadRequest(
            "lat and lon must be provided together".to_string(),
        )),
    }
}

fn resolve_method(state: &AppState, method: Option<&str>) -> Result<CalculationMethod, AppError> {
    match method {
        Some(raw) => raw.parse().map_err(AppError::BadRequest),
        None => Ok(state.default_method),
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: format!("v1 ({})", state.source.name()),
    }))
}

// =============================================================================
// Calculation methods
// =============================================================================

/// GET /v1/methods
///
/// The versioned table of calculation methods and their solar parameters.
pub async fn list_methods(State(state): State<AppState>) -> HandlerResult<MethodsResponse> {
    Ok(Json(MethodsResponse {
        table_version: METHOD_TABLE_VERSION,
        default: state.default_method,
        methods: CalculationMethod::ALL.into_iter().map(MethodDto::from).collect(),
    }))
}

// =============================================================================
// Prayer times
// =============================================================================

/// GET /v1/prayer-times
///
/// Daily schedule for a date and location. Defaults to today at the server's
/// location.
pub async fn get_prayer_times(
    State(state): State<AppState>,
    Query(query): Query<PrayerTimesQuery>,
) -> HandlerResult<PrayerTimesResponse> {
    let location = query.location();
    let (coordinate, offset) = resolve_location(&state, &location)?;
    let method = resolve_method(&state, location.method.as_deref())?;
    let format: TimeFormat = match query.format.as_deref() {
        Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
        None => TimeFormat::default(),
    };
    let date = query
        .date
        .unwrap_or_else(|| state.clock.now().with_timezone(&offset).date_naive());

    let schedule = state
        .source
        .schedule_for(date, &coordinate, method, offset)
        .await?;

    Ok(Json(PrayerTimesResponse::from_schedule(
        &schedule,
        format,
        state.source.name(),
    )))
}

/// GET /v1/next-prayer
///
/// The next prayer after the server clock's current reading.
pub async fn get_next_prayer(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> HandlerResult<NextPrayerResponse> {
    let (coordinate, offset) = resolve_location(&state, &query)?;
    let method = resolve_method(&state, query.method.as_deref())?;
    let now = state.clock.now();

    let upcoming = state
        .source
        .upcoming_prayer(now, &coordinate, method, offset)
        .await?;

    Ok(Json(NextPrayerResponse {
        time: TimeFormat::default().format(upcoming.at.time()),
        upcoming,
    }))
}

/// GET /v1/qibla
pub async fn get_qibla(
    State(state): State<AppState>,
    Query(query): Query<QiblaQuery>,
) -> HandlerResult<QiblaResponse> {
    let location = LocationQuery {
        lat: query.lat,
        lon: query.lon,
        ..Default::default()
    };
    let (coordinate, _) = resolve_location(&state, &location)?;
    let direction = qibla_direction(&coordinate)?;

    Ok(Json(QiblaResponse {
        latitude: coordinate.latitude(),
        longitude: coordinate.longitude(),
        direction,
    }))
}

// =============================================================================
// Reminders
// =============================================================================

/// POST /v1/reminders/refresh
///
/// Rebuild the reminders of a date (default today) from a fresh schedule.
pub async fn refresh_reminders(
    State(state): State<AppState>,
    Json(request): Json<RefreshRemindersRequest>,
) -> HandlerResult<RemindersResponse> {
    let (coordinate, offset) = resolve_location(&state, &request.location)?;
    let method = resolve_method(&state, request.location.method.as_deref())?;
    let now = state.clock.now();
    let date = request
        .date
        .unwrap_or_else(|| now.with_timezone(&offset).date_naive());

    let schedule = state
        .source
        .schedule_for(date, &coordinate, method, offset)
        .await?;
    let armed = state.scheduler.refresh_reminders(&schedule, now).await?;
    debug!("Refresh for {} armed {} reminders", date, armed.len());

    Ok(Json(RemindersResponse::new(date, armed)))
}

/// GET /v1/reminders/{date}
pub async fn get_reminders(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> HandlerResult<RemindersResponse> {
    Ok(Json(RemindersResponse::new(
        date,
        state.scheduler.armed_for(date),
    )))
}

/// DELETE /v1/reminders/{date}/{prayer}
pub async fn cancel_reminder(
    State(state): State<AppState>,
    Path((date, prayer)): Path<(NaiveDate, String)>,
) -> HandlerResult<RemindersResponse> {
    let prayer: Prayer = prayer.parse().map_err(AppError::BadRequest)?;
    state
        .scheduler
        .cancel_reminder(&ReminderId::new(date, prayer))
        .await?;

    Ok(Json(RemindersResponse::new(
        date,
        state.scheduler.armed_for(date),
    )))
}

/// DELETE /v1/reminders
///
/// Cancel every pending reminder. Returns how many were pending.
pub async fn cancel_all_reminders(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cancelled = state.scheduler.cancel_all().await?;
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}
