use std::fmt;

use chrono::{FixedOffset, Offset, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PrayerError, PrayerResult};

/// Geographic coordinate of an observer.
///
/// Latitude in [-90, 90] degrees (north positive), longitude in [-180, 180]
/// degrees (east positive). Construct through [`GeoCoordinate::new`] so the
/// range check cannot be skipped; deserialized values are re-checked by the
/// engine before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

impl GeoCoordinate {
    /// Mecca, the default location when the caller supplies none.
    pub const MECCA: GeoCoordinate = GeoCoordinate::from_raw(21.3891, 39.8579);

    /// Unchecked constructor for compile-time constants.
    pub(crate) const fn from_raw(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a validated coordinate.
    pub fn new(latitude: f64, longitude: f64) -> PrayerResult<Self> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check range and finiteness.
    pub fn validate(&self) -> PrayerResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PrayerError::invalid_input_with_context(
                "latitude must be a finite value in [-90, 90]",
                ErrorContext::new("validate_coordinate")
                    .with_field("latitude")
                    .with_details(format!("value={}", self.latitude)),
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PrayerError::invalid_input_with_context(
                "longitude must be a finite value in [-180, 180]",
                ErrorContext::new("validate_coordinate")
                    .with_field("longitude")
                    .with_details(format!("value={}", self.longitude)),
            ));
        }
        Ok(())
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude_deg(&self) -> Degrees {
        Degrees::new(self.latitude)
    }

    pub fn longitude_deg(&self) -> Degrees {
        Degrees::new(self.longitude)
    }

    /// Whole-hour offset implied by the longitude (15° per hour).
    ///
    /// Only a stand-in for callers that have no timezone information.
    pub fn nominal_utc_offset(&self) -> FixedOffset {
        let hours = (self.longitude / 15.0).round() as i32;
        // |hours| <= 12, always representable
        FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Validate a UTC offset for use with a schedule.
pub fn validate_utc_offset(offset: FixedOffset) -> PrayerResult<()> {
    let seconds = offset.local_minus_utc();
    if seconds.abs() > 14 * 3600 {
        return Err(PrayerError::invalid_input_with_context(
            "UTC offset must be within ±14 hours",
            ErrorContext::new("validate_offset")
                .with_field("utc_offset")
                .with_details(format!("seconds={}", seconds)),
        ));
    }
    Ok(())
}

/// Build a [`FixedOffset`] from minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> PrayerResult<FixedOffset> {
    let offset = FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        PrayerError::invalid_input_with_context(
            "UTC offset out of range",
            ErrorContext::new("offset_from_minutes")
                .with_field("utc_offset")
                .with_details(format!("minutes={}", minutes)),
        )
    })?;
    validate_utc_offset(offset)?;
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinate() {
        let c = GeoCoordinate::new(21.3891, 39.8579).unwrap();
        assert_eq!(c.latitude(), 21.3891);
        assert_eq!(c.longitude(), 39.8579);
        assert_eq!(c, GeoCoordinate::MECCA);
    }

    #[test]
    fn test_display() {
        assert_eq!(GeoCoordinate::MECCA.to_string(), "(21.3891, 39.8579)");
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        assert!(GeoCoordinate::new(90.0, 180.0).is_ok());
        assert!(GeoCoordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_out_of_range_latitude() {
        let err = GeoCoordinate::new(90.5, 0.0).unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(err.context().field.as_deref(), Some("latitude"));
    }

    #[test]
    fn test_out_of_range_longitude() {
        let err = GeoCoordinate::new(0.0, -180.01).unwrap_err();
        assert_eq!(err.context().field.as_deref(), Some("longitude"));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(GeoCoordinate::new(f64::NAN, 0.0).is_err());
        assert!(GeoCoordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialized_coordinate_is_rechecked() {
        let c: GeoCoordinate = serde_json::from_str(r#"{"latitude": 120.0, "longitude": 0.0}"#).unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_nominal_offset() {
        assert_eq!(GeoCoordinate::MECCA.nominal_utc_offset().local_minus_utc(), 3 * 3600);
        let west = GeoCoordinate::new(40.7, -74.0).unwrap();
        assert_eq!(west.nominal_utc_offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_offset_from_minutes() {
        assert_eq!(offset_from_minutes(180).unwrap().local_minus_utc(), 10800);
        assert_eq!(offset_from_minutes(-570).unwrap().local_minus_utc(), -34200);
        assert!(offset_from_minutes(15 * 60).is_err());
    }
}
