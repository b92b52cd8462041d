//! # Salah
//!
//! Local Islamic prayer-time engine and reminder scheduler.
//!
//! Computes the six daily instants (Fajr, Sunrise, Dhuhr, Asr, Maghrib,
//! Isha) from the sun's position for any coordinate, date and UTC offset,
//! with configurable fallbacks where twilight never ends. Schedules feed a
//! reminder scheduler that keeps one notification per upcoming instant.
//!
//! ## Features
//!
//! - **Engine**: 15 calculation methods, Standard/Hanafi Asr, high-latitude fallbacks
//! - **Qibla**: great-circle bearing and distance to the Kaaba
//! - **Reminders**: idempotent per-date refresh behind a pluggable dispatcher
//! - **Remote source**: Aladhan API as an alternate schedule provider (`remote-source`)
//! - **HTTP API**: REST endpoints over the same services (`http-server`)
//!
//! ## Architecture
//!
//! - [`models`]: coordinates, methods, prayers and schedules
//! - [`services`]: solar position, engine, Qibla, clock/location seams, schedule sources
//! - [`scheduler`]: reminder lifecycle and notification dispatch
//! - [`config`]: TOML file plus environment overrides
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ```no_run
//! use chrono::{FixedOffset, NaiveDate};
//! use salah::models::{CalculationMethod, GeoCoordinate};
//! use salah::services::PrayerEngine;
//!
//! let engine = PrayerEngine::default();
//! let schedule = engine.compute_schedule(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     &GeoCoordinate::MECCA,
//!     CalculationMethod::UmmAlQura,
//!     FixedOffset::east_opt(3 * 3600).unwrap(),
//! )?;
//! for (prayer, at) in schedule.iter() {
//!     println!("{prayer}: {}", at.format("%H:%M"));
//! }
//! # Ok::<(), salah::error::PrayerError>(())
//! ```

// SchedulerError carries the partially armed reminders
#![allow(clippy::result_large_err)]

pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
