use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use super::coordinate::GeoCoordinate;
use super::method::CalculationMethod;

/// The six daily prayer-time markers, in their daily order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Position in [`Prayer::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Sunrise => "Sunrise",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    /// Sunrise marks the end of Fajr and is not itself a prayer.
    pub const fn is_prayer(self) -> bool {
        !matches!(self, Prayer::Sunrise)
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Prayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prayer::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown prayer: {}", s))
    }
}

/// Which high-latitude fallback produced a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    NearestLatitude,
    FixedOffset,
    AngleBased,
}

/// Record of instants that were not taken from the direct solar solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Fallback configured on the engine.
    pub fallback: FallbackKind,
    /// Affected instants, in daily order.
    pub prayers: Vec<Prayer>,
}

impl AnomalyReport {
    pub fn affects(&self, prayer: Prayer) -> bool {
        self.prayers.contains(&prayer)
    }
}

/// Prayer times for one date and location.
///
/// Built only by the engine (or a schedule source); instants are strictly
/// increasing in [`Prayer::ALL`] order. An instant may fall on the previous or
/// next calendar day at extreme latitudes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerSchedule {
    date: NaiveDate,
    coordinate: GeoCoordinate,
    method: CalculationMethod,
    utc_offset_minutes: i32,
    times: [DateTime<FixedOffset>; 6],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anomaly: Option<AnomalyReport>,
}

impl PrayerSchedule {
    pub(crate) fn new(
        date: NaiveDate,
        coordinate: GeoCoordinate,
        method: CalculationMethod,
        utc_offset: FixedOffset,
        times: [DateTime<FixedOffset>; 6],
        anomaly: Option<AnomalyReport>,
    ) -> Self {
        debug_assert!(times.windows(2).all(|w| w[0] < w[1]));
        Self {
            date,
            coordinate,
            method,
            utc_offset_minutes: utc_offset.local_minus_utc() / 60,
            times,
            anomaly,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn coordinate(&self) -> &GeoCoordinate {
        &self.coordinate
    }

    pub fn method(&self) -> CalculationMethod {
        self.method
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.utc_offset_minutes
    }

    pub fn time(&self, prayer: Prayer) -> DateTime<FixedOffset> {
        self.times[prayer.index()]
    }

    /// (prayer, instant) pairs in daily order.
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, DateTime<FixedOffset>)> + '_ {
        Prayer::ALL.into_iter().zip(self.times.iter().copied())
    }

    pub fn anomaly(&self) -> Option<&AnomalyReport> {
        self.anomaly.as_ref()
    }

    /// Whether any instant came from a high-latitude fallback.
    pub fn is_adjusted(&self) -> bool {
        self.anomaly.is_some()
    }

    /// First instant strictly after `now`, if any remain today.
    pub fn next_after<Tz: chrono::TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Option<(Prayer, DateTime<FixedOffset>)> {
        self.iter().find(|(_, at)| at > now)
    }
}

/// The next prayer relative to a clock reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPrayer {
    pub prayer: Prayer,
    pub at: DateTime<FixedOffset>,
    /// Whole minutes until `at`, rounded down.
    pub minutes_remaining: i64,
    /// True when today's prayers are over and this is tomorrow's Fajr.
    pub is_tomorrow: bool,
}

impl UpcomingPrayer {
    pub fn new(
        prayer: Prayer,
        at: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
        is_tomorrow: bool,
    ) -> Self {
        let remaining: TimeDelta = at - now;
        Self {
            prayer,
            at,
            minutes_remaining: remaining.num_minutes(),
            is_tomorrow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_schedule() -> PrayerSchedule {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let at = |h, m| tz.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap();
        PrayerSchedule::new(
            date,
            GeoCoordinate::MECCA,
            CalculationMethod::MuslimWorldLeague,
            tz,
            [at(5, 39), at(6, 58), at(12, 24), at(15, 29), at(17, 50), at(19, 4)],
            None,
        )
    }

    #[test]
    fn test_prayer_order_and_index() {
        for (i, p) in Prayer::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        assert!(Prayer::Fajr < Prayer::Isha);
        assert!(!Prayer::Sunrise.is_prayer());
        assert!(Prayer::Maghrib.is_prayer());
    }

    #[test]
    fn test_prayer_parse() {
        assert_eq!("maghrib".parse::<Prayer>(), Ok(Prayer::Maghrib));
        assert_eq!(" FAJR ".parse::<Prayer>(), Ok(Prayer::Fajr));
        assert!("tahajjud".parse::<Prayer>().is_err());
    }

    #[test]
    fn test_schedule_accessors() {
        let s = sample_schedule();
        assert_eq!(s.utc_offset_minutes(), 180);
        assert_eq!(s.time(Prayer::Dhuhr).format("%H:%M").to_string(), "12:24");
        assert_eq!(s.iter().count(), 6);
        assert!(!s.is_adjusted());
    }

    #[test]
    fn test_next_after() {
        let s = sample_schedule();
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();

        let morning = tz.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
        assert_eq!(s.next_after(&morning).map(|(p, _)| p), Some(Prayer::Dhuhr));

        // Exactly at Asr: Asr is not "after" now.
        let at_asr = s.time(Prayer::Asr);
        assert_eq!(s.next_after(&at_asr).map(|(p, _)| p), Some(Prayer::Maghrib));

        let night = tz.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        assert!(s.next_after(&night).is_none());
    }

    #[test]
    fn test_next_after_other_timezone() {
        let s = sample_schedule();
        // 09:00 UTC == 12:00 +03:00
        let now = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(s.next_after(&now).map(|(p, _)| p), Some(Prayer::Dhuhr));
    }

    #[test]
    fn test_upcoming_minutes_remaining() {
        let s = sample_schedule();
        let now = s.time(Prayer::Dhuhr) - TimeDelta::seconds(90);
        let up = UpcomingPrayer::new(Prayer::Dhuhr, s.time(Prayer::Dhuhr), now, false);
        assert_eq!(up.minutes_remaining, 1);
    }

    #[test]
    fn test_schedule_serde() {
        let s = sample_schedule();
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("anomaly"));
        let back: PrayerSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
