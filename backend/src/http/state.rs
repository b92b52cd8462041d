//! Application state for the HTTP server.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::config::AppConfig;
use crate::error::PrayerResult;
use crate::models::{CalculationMethod, GeoCoordinate};
use crate::scheduler::{NotificationDispatcher, ReminderScheduler};
use crate::services::{
    resolve_coordinate, Clock, LocationProvider, PrayerEngine, ScheduleSource, StaticLocation,
    SystemClock,
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Where schedules come from (local engine or remote API)
    pub source: Arc<dyn ScheduleSource>,
    pub scheduler: Arc<ReminderScheduler>,
    pub clock: Arc<dyn Clock>,
    /// Device location, when the deployment has one
    pub location: Arc<dyn LocationProvider>,
    pub default_coordinate: GeoCoordinate,
    pub default_offset: FixedOffset,
    pub default_method: CalculationMethod,
}

impl AppState {
    /// Create a new application state from its parts.
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn ScheduleSource>,
        scheduler: Arc<ReminderScheduler>,
        clock: Arc<dyn Clock>,
    ) -> PrayerResult<Self> {
        Ok(Self {
            source,
            scheduler,
            clock,
            location: Arc::new(StaticLocation::default()),
            default_coordinate: config.coordinate()?,
            default_offset: config.utc_offset()?,
            default_method: config.calculation.method,
        })
    }

    /// State backed by the local engine and the system clock.
    pub fn from_config(
        config: &AppConfig,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> PrayerResult<Self> {
        let engine = PrayerEngine::new(config.engine_config());
        let scheduler = ReminderScheduler::new(dispatcher, config.scheduler_config());
        Self::new(
            config,
            Arc::new(engine),
            Arc::new(scheduler),
            Arc::new(SystemClock::new(config.utc_offset()?)),
        )
    }

    pub fn with_location(mut self, location: Arc<dyn LocationProvider>) -> Self {
        self.location = location;
        self
    }

    /// Device location if known, else the configured default.
    pub fn current_coordinate(&self) -> GeoCoordinate {
        resolve_coordinate(self.location.as_ref(), self.default_coordinate)
    }
}
