use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Julian Day number.
/// JD 2451545.0 = 2000-01-01 12:00:00 TT (J2000.0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct JulianDay(qtty::Days);

/// Julian Day of the J2000.0 epoch.
pub const J2000: f64 = 2451545.0;

impl JulianDay {
    /// Create a new Julian Day value.
    pub fn new<V: Into<qtty::Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw Julian Day value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Julian Day at 00:00 UT of a Gregorian calendar date.
    ///
    /// Meeus, *Astronomical Algorithms*, ch. 7.
    pub fn from_date(date: NaiveDate) -> Self {
        let (mut year, mut month) = (date.year() as f64, date.month() as f64);
        let day = date.day() as f64;
        if month <= 2.0 {
            year -= 1.0;
            month += 12.0;
        }
        let a = (year / 100.0).floor();
        let b = 2.0 - a + (a / 4.0).floor();
        Self::new(
            (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b
                - 1524.5,
        )
    }

    /// Days elapsed since J2000.0.
    pub fn days_since_j2000(&self) -> f64 {
        self.value() - J2000
    }

    /// Shift by a fraction of a day.
    pub fn plus_days(&self, days: f64) -> Self {
        Self::new(self.value() + days)
    }

    /// Convert to Modified Julian Date.
    pub fn to_mjd(&self) -> f64 {
        self.value() - 2400000.5
    }
}

impl From<f64> for JulianDay {
    fn from(v: f64) -> Self {
        JulianDay::new(v)
    }
}

/// Round seconds-of-day to whole minutes, half-up.
///
/// The value is first snapped to the microsecond so floating noise around
/// `:30` cannot flip the result. Never truncates: 12:00:30.0 is 12:01.
pub fn round_to_minute(seconds: f64) -> i64 {
    let snapped = (seconds * 1e6).round() / 1e6;
    (snapped / 60.0 + 0.5).floor() as i64
}

/// Clock display convention for prayer times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// "05:39"
    #[default]
    #[serde(rename = "24h")]
    H24,
    /// "5:39 AM"
    #[serde(rename = "12h")]
    H12,
}

impl TimeFormat {
    pub fn format(self, time: NaiveTime) -> String {
        match self {
            TimeFormat::H24 => format!("{:02}:{:02}", time.hour(), time.minute()),
            TimeFormat::H12 => {
                let (pm, hour) = time.hour12();
                format!(
                    "{}:{:02} {}",
                    hour,
                    time.minute(),
                    if pm { "PM" } else { "AM" }
                )
            }
        }
    }
}

impl std::str::FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "24h" | "24" => Ok(TimeFormat::H24),
            "12h" | "12" => Ok(TimeFormat::H12),
            other => Err(format!("Unknown time format: {}", other)),
        }
    }
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
