//! Data Transfer Objects for the HTTP API.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{
    AnomalyReport, CalculationMethod, IshaRule, MaghribRule, Prayer, PrayerSchedule, TimeFormat,
    UpcomingPrayer,
};
use crate::scheduler::ReminderRequest;
use crate::services::QiblaDirection;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Location and method selectors shared by the query endpoints.
///
/// `lat` and `lon` go together; without them the server's default location
/// is used. Without `offset_minutes` an explicit location gets its nominal
/// offset (longitude / 15) and the default location its configured one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub offset_minutes: Option<i32>,
    pub method: Option<String>,
}

/// Query for `GET /v1/prayer-times`.
///
/// Fields are repeated from [`LocationQuery`] because query strings cannot
/// carry flattened numeric fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrayerTimesQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub offset_minutes: Option<i32>,
    pub method: Option<String>,
    /// Calendar date, defaults to today at the resolved offset
    pub date: Option<NaiveDate>,
    /// `24h` (default) or `12h`
    pub format: Option<String>,
}

impl PrayerTimesQuery {
    pub fn location(&self) -> LocationQuery {
        LocationQuery {
            lat: self.lat,
            lon: self.lon,
            offset_minutes: self.offset_minutes,
            method: self.method.clone(),
        }
    }
}

/// One row of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrayerTimeDto {
    pub prayer: Prayer,
    /// Wall-clock time in the requested format
    pub time: String,
    pub at: DateTime<FixedOffset>,
    /// Produced by a high-latitude fallback
    pub adjusted: bool,
}

/// Response for `GET /v1/prayer-times`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrayerTimesResponse {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset_minutes: i32,
    pub method: CalculationMethod,
    pub source: String,
    pub timings: Vec<PrayerTimeDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyReport>,
}

impl PrayerTimesResponse {
    pub fn from_schedule(schedule: &PrayerSchedule, format: TimeFormat, source: &str) -> Self {
        let anomaly = schedule.anomaly().cloned();
        let timings = schedule
            .iter()
            .map(|(prayer, at)| PrayerTimeDto {
                prayer,
                time: format.format(at.time()),
                at,
                adjusted: anomaly.as_ref().is_some_and(|a| a.affects(prayer)),
            })
            .collect();

        Self {
            date: schedule.date(),
            latitude: schedule.coordinate().latitude(),
            longitude: schedule.coordinate().longitude(),
            utc_offset_minutes: schedule.utc_offset_minutes(),
            method: schedule.method(),
            source: source.to_string(),
            timings,
            anomaly,
        }
    }
}

/// Response for `GET /v1/next-prayer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextPrayerResponse {
    #[serde(flatten)]
    pub upcoming: UpcomingPrayer,
    pub time: String,
}

/// Query for `GET /v1/qibla`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QiblaQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Response for `GET /v1/qibla`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QiblaResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub direction: QiblaDirection,
}

/// One entry of `GET /v1/methods`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDto {
    pub id: CalculationMethod,
    pub name: String,
    pub aladhan_id: u8,
    pub fajr_angle: f64,
    pub isha: IshaRule,
    pub maghrib: MaghribRule,
}

impl From<CalculationMethod> for MethodDto {
    fn from(method: CalculationMethod) -> Self {
        let params = method.parameters();
        Self {
            id: method,
            name: method.display_name().to_string(),
            aladhan_id: method.aladhan_id(),
            fajr_angle: params.fajr_angle,
            isha: params.isha,
            maghrib: params.maghrib,
        }
    }
}

/// Response for `GET /v1/methods`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodsResponse {
    pub table_version: u32,
    pub default: CalculationMethod,
    pub methods: Vec<MethodDto>,
}

/// Body of `POST /v1/reminders/refresh`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshRemindersRequest {
    #[serde(flatten)]
    pub location: LocationQuery,
    pub date: Option<NaiveDate>,
}

/// Armed reminders for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersResponse {
    pub date: NaiveDate,
    pub total: usize,
    pub reminders: Vec<ReminderRequest>,
}

impl RemindersResponse {
    pub fn new(date: NaiveDate, reminders: Vec<ReminderRequest>) -> Self {
        Self {
            date,
            total: reminders.len(),
            reminders,
        }
    }
}
