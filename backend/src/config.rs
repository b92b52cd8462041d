//! Application configuration.
//!
//! Settings come from an optional `salah.toml` file and are then overridden
//! by environment variables. Every section and field has a default, so an
//! empty file (or no file at all) yields the Mecca / Umm al-Qura setup.
//!
//! ```toml
//! [location]
//! latitude = 51.5074
//! longitude = -0.1278
//! utc_offset_minutes = 60
//!
//! [calculation]
//! method = "muslim_world_league"
//! asr = "hanafi"
//! fallback = { kind = "angle_based" }
//!
//! [reminders]
//! dispatch_timeout_ms = 3000
//! rollback_on_failure = true
//!
//! [server]
//! port = 8080
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PrayerError, PrayerResult};
use crate::models::{offset_from_minutes, AsrJuristic, CalculationMethod, GeoCoordinate};
use crate::scheduler::{SchedulerConfig, SoundConfig};
use crate::services::{EngineConfig, HighLatitudeFallback};

/// File name looked up by [`AppConfig::from_default_location`].
pub const CONFIG_FILE_NAME: &str = "salah.toml";

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub location: LocationSettings,
    #[serde(default)]
    pub calculation: CalculationSettings,
    #[serde(default)]
    pub reminders: ReminderSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
}

/// Default observer location, used when no device location is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSettings {
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_latitude() -> f64 {
    GeoCoordinate::MECCA.latitude()
}

fn default_longitude() -> f64 {
    GeoCoordinate::MECCA.longitude()
}

fn default_utc_offset_minutes() -> i32 {
    180
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

/// Calculation method and engine options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationSettings {
    #[serde(default)]
    pub method: CalculationMethod,
    #[serde(default)]
    pub asr: AsrJuristic,
    #[serde(default)]
    pub fallback: HighLatitudeFallback,
}

/// Reminder scheduler options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSettings {
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    #[serde(default)]
    pub rollback_on_failure: bool,
    #[serde(default)]
    pub sounds: SoundConfig,
}

fn default_dispatch_timeout_ms() -> u64 {
    5000
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            rollback_on_failure: false,
            sounds: SoundConfig::default(),
        }
    }
}

/// HTTP server bind settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Aladhan API settings (used with the `remote-source` feature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    crate::services::remote::ALADHAN_BASE_URL.to_string()
}

fn default_remote_timeout_secs() -> u64 {
    20
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

fn config_error(message: impl Into<String>, field: &str, value: &str) -> PrayerError {
    PrayerError::configuration_with_context(
        message,
        ErrorContext::new("load_config")
            .with_field(field)
            .with_details(format!("value={}", value)),
    )
}

impl AppConfig {
    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> PrayerResult<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// `Configuration` if the file cannot be read or parsed, `InvalidInput` if
    /// the location is out of range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PrayerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PrayerError::configuration_with_context(
                format!("Failed to read config file: {}", e),
                ErrorContext::new("load_config").with_details(path.display().to_string()),
            )
        })?;
        Self::parse(&content)
    }

    /// Load configuration from the first `salah.toml` found in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Returns `Ok(None)` when none exists.
    pub fn from_default_location() -> PrayerResult<Option<Self>> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// File configuration (or defaults) with environment overrides applied.
    pub fn load() -> PrayerResult<Self> {
        let mut config = match Self::from_default_location()? {
            Some(config) => config,
            None => {
                debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Self::default()
            }
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply environment overrides.
    ///
    /// # Environment Variables
    /// - `SALAH_LATITUDE`, `SALAH_LONGITUDE`: default location in degrees
    /// - `SALAH_UTC_OFFSET_MINUTES`: offset of the default location
    /// - `SALAH_METHOD`: method name (`muslim_world_league`, `isna`, ...) or Aladhan id
    /// - `SALAH_ASR`: `standard` | `hanafi`
    /// - `SALAH_FALLBACK`: `nearest_latitude` | `fixed_offset` | `angle_based` | `reject`
    /// - `HOST`, `PORT`: server bind address
    pub fn apply_env(&mut self) -> PrayerResult<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> PrayerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SALAH_LATITUDE") {
            self.location.latitude = value
                .trim()
                .parse()
                .map_err(|_| config_error("SALAH_LATITUDE must be a number", "latitude", &value))?;
        }
        if let Some(value) = lookup("SALAH_LONGITUDE") {
            self.location.longitude = value
                .trim()
                .parse()
                .map_err(|_| config_error("SALAH_LONGITUDE must be a number", "longitude", &value))?;
        }
        if let Some(value) = lookup("SALAH_UTC_OFFSET_MINUTES") {
            self.location.utc_offset_minutes = value.trim().parse().map_err(|_| {
                config_error(
                    "SALAH_UTC_OFFSET_MINUTES must be an integer",
                    "utc_offset_minutes",
                    &value,
                )
            })?;
        }
        if let Some(value) = lookup("SALAH_METHOD") {
            self.calculation.method = value
                .parse()
                .map_err(|e: String| config_error(e, "method", &value))?;
        }
        if let Some(value) = lookup("SALAH_ASR") {
            self.calculation.asr = value
                .parse()
                .map_err(|e: String| config_error(e, "asr", &value))?;
        }
        if let Some(value) = lookup("SALAH_FALLBACK") {
            self.calculation.fallback = value
                .parse()
                .map_err(|e: String| config_error(e, "fallback", &value))?;
        }
        if let Some(value) = lookup("HOST") {
            self.server.host = value;
        }
        if let Some(value) = lookup("PORT") {
            self.server.port = value
                .trim()
                .parse()
                .map_err(|_| config_error("PORT must be a valid port number", "port", &value))?;
        }
        self.validate()
    }

    /// Check the default location and offset.
    pub fn validate(&self) -> PrayerResult<()> {
        self.coordinate()?;
        self.utc_offset()?;
        Ok(())
    }

    pub fn coordinate(&self) -> PrayerResult<GeoCoordinate> {
        GeoCoordinate::new(self.location.latitude, self.location.longitude)
    }

    pub fn utc_offset(&self) -> PrayerResult<FixedOffset> {
        offset_from_minutes(self.location.utc_offset_minutes)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            asr: self.calculation.asr,
            fallback: self.calculation.fallback,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            dispatch_timeout: Duration::from_millis(self.reminders.dispatch_timeout_ms),
            rollback_on_failure: self.reminders.rollback_on_failure,
            sounds: self.reminders.sounds.clone(),
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
