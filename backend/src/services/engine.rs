//! Prayer time engine.
//!
//! Computes the six daily instants for a date, coordinate, UTC offset and
//! calculation method from the solar ephemeris in [`super::solar`]. The engine
//! is a pure function of its inputs and its [`EngineConfig`]; it holds no
//! mutable state and can be shared freely across threads.
//!
//! ## Algorithm
//!
//! 1. Julian Day of the date, shifted by the longitude so that "hours" below
//!    are local apparent solar time.
//! 2. Each event is evaluated once against the sun's position at an initial
//!    guess (Fajr 05h, Sunrise 06h, Dhuhr 12h, Asr 13h, Maghrib/Isha 18h).
//! 3. Dhuhr is solar noon (`12h - equation of time`); twilight events are
//!    noon ± the hour angle of their depression angle; Asr uses the shadow
//!    ratio altitude.
//! 4. Events the sun never reaches are supplied by the configured
//!    [`HighLatitudeFallback`] and listed in the schedule's anomaly report.
//! 5. Hours are shifted to the requested offset, rounded half-up to the
//!    minute, and forced strictly increasing. Across the date line the
//!    solar day of the previous or next date is used so that the instants
//!    stay on the requested civil date.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use log::debug;
use qtty::Degrees;
use serde::{Deserialize, Serialize};

use super::solar::{asr_altitude, hour_angle, solar_position, SUNRISE_DEPRESSION};
use super::source::{Lookahead, UpcomingLookup};
use crate::error::{ErrorContext, PrayerError, PrayerResult};
use crate::models::{
    round_to_minute, validate_utc_offset, AnomalyReport, AsrJuristic, CalculationMethod,
    FallbackKind, GeoCoordinate, IshaRule, JulianDay, MaghribRule, MethodParameters, Prayer,
    PrayerSchedule, UpcomingPrayer,
};

/// Latitude step used when searching for the nearest latitude with a solution.
pub const LATITUDE_STEP_DEG: f64 = 0.5;

/// Initial guesses, in hours, for the sun position of each event.
const INITIAL_GUESS_HOURS: [f64; 6] = [5.0, 6.0, 12.0, 13.0, 18.0, 18.0];

/// Minutes relative to Dhuhr used by [`HighLatitudeFallback::FixedOffset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhuhrOffsets {
    pub fajr: i64,
    pub sunrise: i64,
    pub asr: i64,
    pub maghrib: i64,
    pub isha: i64,
}

impl Default for DhuhrOffsets {
    fn default() -> Self {
        Self {
            fajr: -480,
            sunrise: -360,
            asr: 180,
            maghrib: 360,
            isha: 450,
        }
    }
}

/// What to do when the sun never reaches an event's altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HighLatitudeFallback {
    /// Take the event from the nearest latitude (same hemisphere, toward the
    /// equator) where it exists.
    #[default]
    NearestLatitude,
    /// Place missing events at fixed offsets from Dhuhr. Fajr is kept before
    /// Sunrise and Isha after Maghrib by the same nominal gap.
    FixedOffset(DhuhrOffsets),
    /// Bound Fajr and Isha by `angle / 60` of the night, even when they exist.
    /// Missing sunrise/sunset/Asr come from the nearest latitude.
    AngleBased,
    /// Fail with [`PrayerError::AstronomicalAnomaly`].
    Reject,
}

impl std::str::FromStr for HighLatitudeFallback {
    type Err = String;

    /// Parse a fallback name; `fixed_offset` uses the default offsets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "nearest_latitude" | "nearest" => Ok(HighLatitudeFallback::NearestLatitude),
            "fixed_offset" | "fixed" => Ok(HighLatitudeFallback::FixedOffset(DhuhrOffsets::default())),
            "angle_based" | "angle" => Ok(HighLatitudeFallback::AngleBased),
            "reject" => Ok(HighLatitudeFallback::Reject),
            other => Err(format!("Unknown high-latitude fallback: {}", other)),
        }
    }
}

impl HighLatitudeFallback {
    fn kind(&self) -> Option<FallbackKind> {
        match self {
            HighLatitudeFallback::NearestLatitude => Some(FallbackKind::NearestLatitude),
            HighLatitudeFallback::FixedOffset(_) => Some(FallbackKind::FixedOffset),
            HighLatitudeFallback::AngleBased => Some(FallbackKind::AngleBased),
            HighLatitudeFallback::Reject => None,
        }
    }
}

/// Engine configuration, passed in explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub asr: AsrJuristic,
    #[serde(default)]
    pub fallback: HighLatitudeFallback,
}

/// Local prayer-time calculator.
#[derive(Debug, Clone, Default)]
pub struct PrayerEngine {
    config: EngineConfig,
}

impl PrayerEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the schedule for one calendar date.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` - coordinate out of range or non-finite, offset beyond ±14h
    /// * `AstronomicalAnomaly` - an event has no solution and the fallback is `Reject`
    pub fn compute_schedule(
        &self,
        date: NaiveDate,
        coordinate: &GeoCoordinate,
        method: CalculationMethod,
        utc_offset: FixedOffset,
    ) -> PrayerResult<PrayerSchedule> {
        coordinate.validate()?;
        validate_utc_offset(utc_offset)?;

        let params = method.parameters();
        let shift = utc_offset.local_minus_utc() as f64 / 3600.0 - coordinate.longitude() / 15.0;
        let (solar_date, shift) = solar_date(date, shift)?;
        let day = SolarDay::new(
            solar_date,
            coordinate.longitude(),
            params,
            self.config.asr.shadow_factor(),
        );
        let latitude = coordinate.latitude();

        let mut hours: [Option<f64>; 6] = Prayer::ALL.map(|p| day.event(p, latitude));
        let isha_interval = match params.isha {
            IshaRule::MinutesAfterMaghrib(minutes) => Some(minutes),
            IshaRule::Angle(_) => None,
        };

        let missing: Vec<Prayer> = Prayer::ALL
            .into_iter()
            .filter(|p| hours[p.index()].is_none())
            .filter(|p| !(*p == Prayer::Isha && isha_interval.is_some()))
            .collect();

        let mut adjusted = missing.clone();
        match self.config.fallback {
            HighLatitudeFallback::Reject if !missing.is_empty() => {
                return Err(PrayerError::anomaly(
                    missing,
                    ErrorContext::new("compute_schedule").with_details(format!(
                        "date={}, latitude={}, method={}",
                        date, latitude, method
                    )),
                ));
            }
            HighLatitudeFallback::Reject => {}
            HighLatitudeFallback::NearestLatitude => {
                for prayer in &missing {
                    hours[prayer.index()] = Some(day.nearest_latitude(*prayer, latitude, date)?);
                }
            }
            HighLatitudeFallback::FixedOffset(offsets) => {
                apply_fixed_offsets(&mut hours, &missing, &offsets);
            }
            HighLatitudeFallback::AngleBased => {
                for prayer in missing.iter().filter(|p| !is_twilight(**p)) {
                    hours[prayer.index()] = Some(day.nearest_latitude(*prayer, latitude, date)?);
                }
                let sunset = match day.sunset(latitude) {
                    Some(h) => h,
                    None => day.nearest_latitude_with(latitude, date, |lat| day.sunset(lat))?,
                };
                for prayer in day.apply_night_portion(&mut hours, sunset, isha_interval.is_none()) {
                    if !adjusted.contains(&prayer) {
                        adjusted.push(prayer);
                    }
                }
            }
        }

        let mut resolved = [0.0; 6];
        for prayer in Prayer::ALL {
            resolved[prayer.index()] = match (prayer, isha_interval) {
                (Prayer::Isha, Some(minutes)) => {
                    // Interval methods follow Maghrib, including an adjusted one.
                    if adjusted.contains(&Prayer::Maghrib) && !adjusted.contains(&Prayer::Isha) {
                        adjusted.push(Prayer::Isha);
                    }
                    resolved[Prayer::Maghrib.index()] + minutes / 60.0
                }
                _ => hours[prayer.index()].ok_or_else(|| {
                    PrayerError::anomaly(
                        vec![prayer],
                        ErrorContext::new("compute_schedule")
                            .with_details(format!("date={}, latitude={}", date, latitude)),
                    )
                })?,
            };
        }

        let mut minutes = resolved.map(|h| round_to_minute((h + shift) * 3600.0));
        enforce_strict_order(&mut minutes);

        let local_midnight = local_midnight(date, utc_offset)?;
        let times = minutes.map(|m| local_midnight + TimeDelta::minutes(m));

        adjusted.sort();
        let anomaly = match self.config.fallback.kind() {
            Some(fallback) if !adjusted.is_empty() => {
                debug!(
                    "High-latitude fallback {:?} applied to {:?} (date={}, latitude={})",
                    fallback, adjusted, date, latitude
                );
                Some(AnomalyReport {
                    fallback,
                    prayers: adjusted,
                })
            }
            _ => None,
        };

        Ok(PrayerSchedule::new(
            date,
            *coordinate,
            method,
            utc_offset,
            times,
            anomaly,
        ))
    }

    /// The next instant strictly after `now`; tomorrow's Fajr once Isha has passed.
    pub fn next_prayer(
        &self,
        now: DateTime<FixedOffset>,
        coordinate: &GeoCoordinate,
        method: CalculationMethod,
        utc_offset: FixedOffset,
    ) -> PrayerResult<UpcomingPrayer> {
        let lookup = UpcomingLookup::new(now, utc_offset);
        let today = self.compute_schedule(lookup.today(), coordinate, method, utc_offset)?;
        match lookup.search_today(&today)? {
            Lookahead::Found(upcoming) => Ok(upcoming),
            Lookahead::Fetch(tomorrow) => {
                lookup.search_tomorrow(&self.compute_schedule(tomorrow, coordinate, method, utc_offset)?)
            }
        }
    }
}

/// Sun geometry for one date and meridian.
struct SolarDay {
    jd: JulianDay,
    params: MethodParameters,
    shadow_factor: f64,
}

impl SolarDay {
    fn new(date: NaiveDate, longitude: f64, params: MethodParameters, shadow_factor: f64) -> Self {
        Self {
            jd: JulianDay::from_date(date).plus_days(-longitude / (15.0 * 24.0)),
            params,
            shadow_factor,
        }
    }

    fn midday(&self, guess_hours: f64) -> f64 {
        let position = solar_position(self.jd.plus_days(guess_hours / 24.0));
        12.0 - position.equation_of_time.value()
    }

    /// Time (hours) when the sun is `depression` below the horizon, before
    /// (`rising`) or after noon.
    fn angle_time(&self, depression: Degrees, guess_hours: f64, latitude: f64, rising: bool) -> Option<f64> {
        let declination = solar_position(self.jd.plus_days(guess_hours / 24.0)).declination;
        let noon = self.midday(guess_hours);
        let t = hour_angle(depression, declination, Degrees::new(latitude))?;
        Some(if rising { noon - t } else { noon + t })
    }

    fn asr(&self, guess_hours: f64, latitude: f64) -> Option<f64> {
        let declination = solar_position(self.jd.plus_days(guess_hours / 24.0)).declination;
        let altitude = asr_altitude(self.shadow_factor, declination, Degrees::new(latitude))?;
        self.angle_time(Degrees::new(-altitude.value()), guess_hours, latitude, false)
    }

    fn sunset(&self, latitude: f64) -> Option<f64> {
        self.angle_time(
            SUNRISE_DEPRESSION,
            INITIAL_GUESS_HOURS[Prayer::Maghrib.index()],
            latitude,
            false,
        )
    }

    /// Hours for one event at a latitude; `None` when the sun never gets there.
    /// Isha is `None` for interval methods (derived from Maghrib instead).
    fn event(&self, prayer: Prayer, latitude: f64) -> Option<f64> {
        let guess = INITIAL_GUESS_HOURS[prayer.index()];
        match prayer {
            Prayer::Fajr => {
                self.angle_time(self.params.fajr_angle_deg(), guess, latitude, true)
            }
            Prayer::Sunrise => self.angle_time(SUNRISE_DEPRESSION, guess, latitude, true),
            Prayer::Dhuhr => Some(self.midday(guess)),
            Prayer::Asr => self.asr(guess, latitude),
            Prayer::Maghrib => match self.params.maghrib {
                MaghribRule::Sunset => self.sunset(latitude),
                MaghribRule::Angle(angle) => {
                    self.angle_time(Degrees::new(angle), guess, latitude, false)
                }
            },
            Prayer::Isha => match self.params.isha {
                IshaRule::Angle(angle) => {
                    self.angle_time(Degrees::new(angle), guess, latitude, false)
                }
                IshaRule::MinutesAfterMaghrib(_) => None,
            },
        }
    }

    fn nearest_latitude(&self, prayer: Prayer, latitude: f64, date: NaiveDate) -> PrayerResult<f64> {
        self.nearest_latitude_with(latitude, date, |lat| self.event(prayer, lat))
            .map_err(|e| match e {
                PrayerError::AstronomicalAnomaly { context, .. } => {
                    PrayerError::anomaly(vec![prayer], context)
                }
                other => other,
            })
    }

    /// Step toward the equator until `event` has a solution.
    fn nearest_latitude_with<F>(&self, latitude: f64, date: NaiveDate, event: F) -> PrayerResult<f64>
    where
        F: Fn(f64) -> Option<f64>,
    {
        let mut candidate = latitude.abs();
        while candidate > 0.0 {
            candidate = (candidate - LATITUDE_STEP_DEG).max(0.0);
            if let Some(hours) = event(candidate.copysign(latitude)) {
                return Ok(hours);
            }
        }
        Err(PrayerError::anomaly(
            Vec::new(),
            ErrorContext::new("nearest_latitude")
                .with_details(format!("date={}, latitude={}", date, latitude)),
        ))
    }

    /// Bound Fajr and (angle-defined) Isha by a fraction of the night.
    /// Returns the prayers it moved.
    fn apply_night_portion(
        &self,
        hours: &mut [Option<f64>; 6],
        sunset: f64,
        isha_by_angle: bool,
    ) -> Vec<Prayer> {
        let mut moved = Vec::new();
        let Some(sunrise) = hours[Prayer::Sunrise.index()] else {
            return moved;
        };
        let night = 24.0 - (sunset - sunrise);

        let fajr_portion = self.params.fajr_angle / 60.0 * night;
        let fajr = hours[Prayer::Fajr.index()];
        if fajr.map_or(true, |f| sunrise - f > fajr_portion) {
            hours[Prayer::Fajr.index()] = Some(sunrise - fajr_portion);
            moved.push(Prayer::Fajr);
        }

        if let (true, IshaRule::Angle(angle)) = (isha_by_angle, self.params.isha) {
            let isha_portion = angle / 60.0 * night;
            let isha = hours[Prayer::Isha.index()];
            if isha.map_or(true, |i| i - sunset > isha_portion) {
                hours[Prayer::Isha.index()] = Some(sunset + isha_portion);
                moved.push(Prayer::Isha);
            }
        }
        moved
    }
}

fn is_twilight(prayer: Prayer) -> bool {
    matches!(prayer, Prayer::Fajr | Prayer::Isha)
}

fn apply_fixed_offsets(hours: &mut [Option<f64>; 6], missing: &[Prayer], offsets: &DhuhrOffsets) {
    let dhuhr = hours[Prayer::Dhuhr.index()].unwrap_or(12.0);
    let at = |minutes: i64| dhuhr + minutes as f64 / 60.0;

    for prayer in missing {
        match prayer {
            Prayer::Sunrise => hours[prayer.index()] = Some(at(offsets.sunrise)),
            Prayer::Asr => hours[prayer.index()] = Some(at(offsets.asr)),
            Prayer::Maghrib => hours[prayer.index()] = Some(at(offsets.maghrib)),
            _ => {}
        }
    }
    if missing.contains(&Prayer::Fajr) {
        let sunrise = hours[Prayer::Sunrise.index()].unwrap_or_else(|| at(offsets.sunrise));
        let gap = (offsets.sunrise - offsets.fajr) as f64 / 60.0;
        hours[Prayer::Fajr.index()] = Some(at(offsets.fajr).min(sunrise - gap));
    }
    if missing.contains(&Prayer::Isha) {
        let maghrib = hours[Prayer::Maghrib.index()].unwrap_or_else(|| at(offsets.maghrib));
        let gap = (offsets.isha - offsets.maghrib) as f64 / 60.0;
        hours[Prayer::Isha.index()] = Some(at(offsets.isha).max(maghrib + gap));
    }
}

/// Push any minute that does not strictly follow its predecessor to
/// predecessor + 1, preserving the declared order.
pub(crate) fn enforce_strict_order(minutes: &mut [i64; 6]) {
    for i in 1..minutes.len() {
        if minutes[i] <= minutes[i - 1] {
            debug!(
                "{} moved from minute {} to {} to follow {}",
                Prayer::ALL[i],
                minutes[i],
                minutes[i - 1] + 1,
                Prayer::ALL[i - 1]
            );
            minutes[i] = minutes[i - 1] + 1;
        }
    }
}

/// Solar day whose events fall on local `date`, and the hour shift from
/// local solar time to the offset.
///
/// Past the date line (UTC+14 at -157°, UTC-12 at +180°) the civil day is
/// a solar day ahead of or behind the meridian's.
fn solar_date(date: NaiveDate, shift: f64) -> PrayerResult<(NaiveDate, f64)> {
    let adjacent = |day: Option<NaiveDate>| {
        day.ok_or_else(|| {
            PrayerError::invalid_input_with_context(
                "date out of range",
                ErrorContext::new("compute_schedule")
                    .with_field("date")
                    .with_details(date.to_string()),
            )
        })
    };
    if shift > 12.0 {
        Ok((adjacent(date.pred_opt())?, shift - 24.0))
    } else if shift < -12.0 {
        Ok((adjacent(date.succ_opt())?, shift + 24.0))
    } else {
        Ok((date, shift))
    }
}

pub(crate) fn local_midnight(date: NaiveDate, offset: FixedOffset) -> PrayerResult<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or_else(|| {
            PrayerError::invalid_input_with_context(
                "date is not representable at this offset",
                ErrorContext::new("compute_schedule")
                    .with_field("date")
                    .with_details(date.to_string()),
            )
        })
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
