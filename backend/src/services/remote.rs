//! Aladhan timings API as a schedule source.
//!
//! Response parsing is always compiled so that payloads can be validated
//! offline; the HTTP client itself lives behind the `remote-source` feature.
//!
//! ```text
//! GET {base}/timings/{DD-MM-YYYY}?latitude=..&longitude=..&method=..&school=..&iso8601=true
//!
//! { "code": 200, "status": "OK",
//!   "data": { "timings": { "Fajr": "2024-01-01T05:37:00+03:00", ... } } }
//! ```
//!
//! Times are in the location's own timezone, not the caller's. The parser
//! accepts ISO 8601 values, `"05:37 (+03)"` style values and bare `"05:37"`,
//! and converts whatever offset they carry to the requested one.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use serde::Deserialize;

use super::engine::{enforce_strict_order, local_midnight};
use crate::error::{ErrorContext, PrayerError, PrayerResult};
use crate::models::{CalculationMethod, GeoCoordinate, Prayer, PrayerSchedule};

/// Public Aladhan endpoint.
pub const ALADHAN_BASE_URL: &str = "https://api.aladhan.com/v1";

#[derive(Debug, Deserialize)]
struct TimingsResponse {
    code: u16,
    #[serde(default)]
    status: String,
    data: Option<TimingsData>,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: HashMap<String, String>,
}

/// Path and query for one day's timings.
pub fn timings_path(
    date: NaiveDate,
    coordinate: &GeoCoordinate,
    method: CalculationMethod,
    school: u8,
) -> String {
    format!(
        "timings/{}?latitude={}&longitude={}&method={}&school={}&iso8601=true",
        date.format("%d-%m-%Y"),
        coordinate.latitude(),
        coordinate.longitude(),
        method.aladhan_id(),
        school
    )
}

/// Parse the `"HH:MM"` part of a value, ignoring a trailing `" (TZ)"` annotation.
pub fn parse_clock_minutes(value: &str) -> Option<i64> {
    let clock = value.split_whitespace().next()?;
    let (hours, minutes) = clock.split_once(':')?;
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Offset named by a `"(+03)"`, `"(+0530)"`, `"(-03:30)"` or `"(UTC)"` annotation.
///
/// Zone abbreviations other than UTC/GMT are ambiguous and yield `None`.
pub fn parse_suffix_offset(suffix: &str) -> Option<FixedOffset> {
    let inner = suffix.strip_prefix('(')?.strip_suffix(')')?;
    if matches!(inner, "UTC" | "GMT" | "Z") {
        return FixedOffset::east_opt(0);
    }
    let sign = match inner.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = inner[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes): (i32, i32) = match digits.len() {
        1 | 2 => (digits.parse().ok()?, 0),
        4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => return None,
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Minutes after midnight of `date` and the offset they are counted in, if
/// the value names one.
fn parse_timing(value: &str, date: NaiveDate) -> Option<(i64, Option<FixedOffset>)> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        let minutes = (instant.naive_local() - date.and_time(NaiveTime::MIN)).num_minutes();
        return Some((minutes, Some(*instant.offset())));
    }

    let minutes = parse_clock_minutes(value)?;
    match value.split_once(char::is_whitespace) {
        None => Some((minutes, None)),
        Some((_, suffix)) => Some((minutes, Some(parse_suffix_offset(suffix.trim())?))),
    }
}

/// Build a schedule from an Aladhan timings payload.
///
/// Clock values are wrapped to one day; a time that jumps back by more than
/// twelve hours is taken to be past midnight. Every annotated value must carry
/// the same offset; bare values share it, or use `utc_offset` when nothing is
/// annotated. The instants are returned at `utc_offset`.
pub fn parse_timings_response(
    body: &str,
    date: NaiveDate,
    coordinate: &GeoCoordinate,
    method: CalculationMethod,
    utc_offset: FixedOffset,
) -> PrayerResult<PrayerSchedule> {
    let context = || ErrorContext::new("parse_timings").with_details(format!("date={}", date));

    let response: TimingsResponse = serde_json::from_str(body)
        .map_err(|e| PrayerError::remote_with_context(format!("malformed payload: {}", e), context()))?;
    if response.code != 200 {
        return Err(PrayerError::remote_with_context(
            format!("API returned code {} ({})", response.code, response.status),
            context(),
        ));
    }
    let timings = response
        .data
        .ok_or_else(|| PrayerError::remote_with_context("payload has no data", context()))?
        .timings;

    let mut minutes = [0i64; 6];
    let mut source_offset: Option<FixedOffset> = None;
    for prayer in Prayer::ALL {
        let raw = timings.get(prayer.name()).ok_or_else(|| {
            PrayerError::remote_with_context(
                format!("missing {} timing", prayer),
                context().with_field(prayer.name()),
            )
        })?;
        let (value, offset) = parse_timing(raw, date).ok_or_else(|| {
            PrayerError::remote_with_context(
                format!("unparseable {} timing {:?}", prayer, raw),
                context().with_field(prayer.name()),
            )
        })?;
        match (source_offset, offset) {
            (Some(seen), Some(offset)) if seen != offset => {
                return Err(PrayerError::remote_with_context(
                    format!("{} timing is at {} but earlier ones at {}", prayer, offset, seen),
                    context().with_field(prayer.name()),
                ));
            }
            (None, Some(offset)) => source_offset = Some(offset),
            _ => {}
        }
        minutes[prayer.index()] = value;
    }

    for i in 1..minutes.len() {
        while minutes[i] < minutes[i - 1] - 12 * 60 {
            minutes[i] += 24 * 60;
        }
    }
    enforce_strict_order(&mut minutes);

    let midnight = local_midnight(date, source_offset.unwrap_or(utc_offset))?;
    Ok(PrayerSchedule::new(
        date,
        *coordinate,
        method,
        utc_offset,
        minutes.map(|m| (midnight + TimeDelta::minutes(m)).with_timezone(&utc_offset)),
        None,
    ))
}

#[cfg(feature = "remote-source")]
pub use client::AladhanSource;

#[cfg(feature = "remote-source")]
mod client {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{FixedOffset, NaiveDate};
    use log::debug;

    use super::{parse_timings_response, timings_path, ALADHAN_BASE_URL};
    use crate::error::{ErrorContext, PrayerError, PrayerResult};
    use crate::models::{AsrJuristic, CalculationMethod, GeoCoordinate, PrayerSchedule};
    use crate::services::source::ScheduleSource;

    /// Schedule source backed by the Aladhan REST API.
    #[derive(Debug, Clone)]
    pub struct AladhanSource {
        client: reqwest::Client,
        base_url: String,
        asr: AsrJuristic,
    }

    impl AladhanSource {
        pub fn new(base_url: impl Into<String>, timeout: Duration, asr: AsrJuristic) -> PrayerResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PrayerError::remote(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                asr,
            })
        }

        pub fn public(asr: AsrJuristic) -> PrayerResult<Self> {
            Self::new(ALADHAN_BASE_URL, Duration::from_secs(20), asr)
        }
    }

    #[async_trait]
    impl ScheduleSource for AladhanSource {
        async fn schedule_for(
            &self,
            date: NaiveDate,
            coordinate: &GeoCoordinate,
            method: CalculationMethod,
            utc_offset: FixedOffset,
        ) -> PrayerResult<PrayerSchedule> {
            coordinate.validate()?;
            let url = format!(
                "{}/{}",
                self.base_url,
                timings_path(date, coordinate, method, self.asr.aladhan_school())
            );
            debug!("Fetching timings from {}", url);

            let context = || ErrorContext::new("fetch_timings").with_details(url.clone());
            let response = self.client.get(&url).send().await.map_err(|e| {
                PrayerError::remote_with_context(format!("request failed: {}", e), context())
            })?;

            let status = response.status();
            let body = response.text().await.map_err(|e| {
                PrayerError::remote_with_context(
                    format!("failed to read response body (HTTP {}): {}", status, e),
                    context(),
                )
            })?;
            if !status.is_success() {
                return Err(PrayerError::remote_with_context(
                    format!("HTTP {}: {}", status, body.trim()),
                    context(),
                ));
            }

            parse_timings_response(&body, date, coordinate, method, utc_offset)
        }

        fn name(&self) -> &'static str {
            "aladhan"
        }
    }
}


#[cfg(all(test, feature = "remote-source"))]
mod client_tests {
    use std::time::Duration;

    use chrono::{FixedOffset, NaiveDate};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::AladhanSource;
    use crate::error::PrayerError;
    use crate::models::{AsrJuristic, CalculationMethod, GeoCoordinate};
    use crate::services::source::ScheduleSource;

    /// Serves one response whose body stops short of its Content-Length.
    async fn truncated_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 512\r\n\r\n{\"code\":")
                .await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_truncated_body_is_a_remote_error() {
        let base_url = truncated_server().await;
        let source = AladhanSource::new(base_url, Duration::from_secs(5), AsrJuristic::Standard).unwrap();

        let err = source
            .schedule_for(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                &GeoCoordinate::MECCA,
                CalculationMethod::UmmAlQura,
                FixedOffset::east_opt(3 * 3600).unwrap(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PrayerError::RemoteSource { .. }));
        assert!(err.to_string().contains("failed to read response body"), "{}", err);
        assert!(err.context().details.as_deref().unwrap_or_default().contains("/timings/01-01-2024"));
    }
}
