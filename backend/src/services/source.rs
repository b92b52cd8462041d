//! Schedule source trait.
//!
//! The reminder scheduler and the HTTP layer only need "a schedule for this
//! day and place"; whether it comes from the local engine or a remote API is
//! an implementation detail behind [`ScheduleSource`].

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};

use super::engine::PrayerEngine;
use crate::error::{ErrorContext, PrayerError, PrayerResult};
use crate::models::{CalculationMethod, GeoCoordinate, Prayer, PrayerSchedule, UpcomingPrayer};

/// Provider of daily prayer schedules.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to be shared across tasks.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Schedule for `date` at `coordinate`, instants expressed at `utc_offset`.
    async fn schedule_for(
        &self,
        date: NaiveDate,
        coordinate: &GeoCoordinate,
        method: CalculationMethod,
        utc_offset: FixedOffset,
    ) -> PrayerResult<PrayerSchedule>;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Next instant strictly after `now`, rolling over to tomorrow's first one.
    async fn upcoming_prayer(
        &self,
        now: DateTime<FixedOffset>,
        coordinate: &GeoCoordinate,
        method: CalculationMethod,
        utc_offset: FixedOffset,
    ) -> PrayerResult<UpcomingPrayer> {
        let lookup = UpcomingLookup::new(now, utc_offset);
        let today = self.schedule_for(lookup.today(), coordinate, method, utc_offset).await?;
        match lookup.search_today(&today)? {
            Lookahead::Found(upcoming) => Ok(upcoming),
            Lookahead::Fetch(tomorrow) => {
                let schedule = self.schedule_for(tomorrow, coordinate, method, utc_offset).await?;
                lookup.search_tomorrow(&schedule)
            }
        }
    }
}

/// Outcome of looking for the next prayer in today's schedule.
pub(crate) enum Lookahead {
    Found(UpcomingPrayer),
    /// Today is over; the first instant of this date is next.
    Fetch(NaiveDate),
}

/// Next-prayer lookup shared by the engine and every [`ScheduleSource`]:
/// today's schedule first, the following date's only once today is over.
pub(crate) struct UpcomingLookup {
    local_now: DateTime<FixedOffset>,
}

impl UpcomingLookup {
    pub(crate) fn new(now: DateTime<FixedOffset>, utc_offset: FixedOffset) -> Self {
        Self {
            local_now: now.with_timezone(&utc_offset),
        }
    }

    /// Date of `now` at the requested offset.
    pub(crate) fn today(&self) -> NaiveDate {
        self.local_now.date_naive()
    }

    pub(crate) fn search_today(&self, schedule: &PrayerSchedule) -> PrayerResult<Lookahead> {
        if let Some((prayer, at)) = schedule.next_after(&self.local_now) {
            return Ok(Lookahead::Found(UpcomingPrayer::new(prayer, at, self.local_now, false)));
        }
        let tomorrow = self.today().succ_opt().ok_or_else(|| {
            PrayerError::invalid_input_with_context(
                "date has no successor",
                ErrorContext::new("next_prayer").with_field("date"),
            )
        })?;
        Ok(Lookahead::Fetch(tomorrow))
    }

    pub(crate) fn search_tomorrow(&self, schedule: &PrayerSchedule) -> PrayerResult<UpcomingPrayer> {
        let (prayer, at) = schedule.next_after(&self.local_now).ok_or_else(|| {
            PrayerError::anomaly(
                vec![Prayer::Fajr],
                ErrorContext::new("next_prayer")
                    .with_details(format!("no instant after now on {}", schedule.date())),
            )
        })?;
        Ok(UpcomingPrayer::new(prayer, at, self.local_now, true))
    }
}

#[async_trait]
impl ScheduleSource for PrayerEngine {
    async fn schedule_for(
        &self,
        date: NaiveDate,
        coordinate: &GeoCoordinate,
        method: CalculationMethod,
        utc_offset: FixedOffset,
    ) -> PrayerResult<PrayerSchedule> {
        self.compute_schedule(date, coordinate, method, utc_offset)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_engine_as_source_matches_direct_call() {
        let engine = PrayerEngine::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();

        let source: Arc<dyn ScheduleSource> = Arc::new(engine.clone());
        let via_source = source
            .schedule_for(date, &GeoCoordinate::MECCA, CalculationMethod::UmmAlQura, offset)
            .await
            .unwrap();
        let direct = engine
            .compute_schedule(date, &GeoCoordinate::MECCA, CalculationMethod::UmmAlQura, offset)
            .unwrap();

        assert_eq!(via_source, direct);
        assert_eq!(source.name(), "local");
    }

    #[tokio::test]
    async fn test_upcoming_prayer_matches_engine() {
        use chrono::TimeZone;

        let engine = PrayerEngine::default();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let method = CalculationMethod::MuslimWorldLeague;

        for hour in [0, 7, 13, 16, 18, 23] {
            let now = offset.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap();
            let via_trait = ScheduleSource::upcoming_prayer(&engine, now, &GeoCoordinate::MECCA, method, offset)
                .await
                .unwrap();
            let direct = engine
                .next_prayer(now, &GeoCoordinate::MECCA, method, offset)
                .unwrap();
            assert_eq!(via_trait, direct, "mismatch at {:02}:00", hour);
        }
    }
}
