//! Low-precision solar ephemeris.
//!
//! Sun declination and equation of time from the U.S. Naval Observatory
//! almanac approximation (accurate to about a minute of time between 1950
//! and 2050), plus the hour-angle helpers the engine builds on.

use qtty::{Degrees, Hours};

use crate::models::JulianDay;

/// Refraction-corrected depression of the sun's upper limb at sunrise/sunset.
pub const SUNRISE_DEPRESSION: Degrees = Degrees::new(0.833);

/// Apparent position of the sun for one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub declination: Degrees,
    /// Apparent minus mean solar time, in [-12h, 12h).
    pub equation_of_time: Hours,
}

/// Compute the sun's declination and the equation of time.
pub fn solar_position(jd: JulianDay) -> SolarPosition {
    let d = jd.days_since_j2000();

    let mean_anomaly = Degrees::new(357.529 + 0.98560028 * d).wrap_pos();
    let mean_longitude = Degrees::new(280.459 + 0.98564736 * d).wrap_pos();
    let ecliptic_longitude = Degrees::new(
        mean_longitude.value()
            + 1.915 * mean_anomaly.sin()
            + 0.020 * Degrees::new(2.0 * mean_anomaly.value()).sin(),
    )
    .wrap_pos();
    let obliquity = Degrees::new(23.439 - 0.00000036 * d);

    let right_ascension_hours = wrap_hours(
        (obliquity.cos() * ecliptic_longitude.sin())
            .atan2(ecliptic_longitude.cos())
            .to_degrees()
            / 15.0,
    );
    let equation_of_time = wrap_signed_hours(mean_longitude.value() / 15.0 - right_ascension_hours);
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin().to_degrees();

    SolarPosition {
        declination: Degrees::new(declination),
        equation_of_time: Hours::new(equation_of_time),
    }
}

/// Hour angle, in hours, at which the sun's centre sits `depression` below
/// the horizon (negative depression = altitude above the horizon).
///
/// `None` when the sun never reaches that altitude on this day.
pub fn hour_angle(depression: Degrees, declination: Degrees, latitude: Degrees) -> Option<f64> {
    let cos_h = (-depression.sin() - declination.sin() * latitude.sin())
        / (declination.cos() * latitude.cos());
    if !(-1.0..=1.0).contains(&cos_h) {
        return None;
    }
    Some(cos_h.acos().to_degrees() / 15.0)
}

/// Solar altitude at which an object's shadow equals `shadow_factor` times
/// its length plus its noon shadow.
///
/// `None` when the sun does not rise above the horizon at noon (no shadow).
pub fn asr_altitude(shadow_factor: f64, declination: Degrees, latitude: Degrees) -> Option<Degrees> {
    let noon_zenith = Degrees::new((latitude.value() - declination.value()).abs());
    if noon_zenith.value() >= 90.0 {
        return None;
    }
    let altitude = (1.0 / (shadow_factor + noon_zenith.tan())).atan().to_degrees();
    Some(Degrees::new(altitude))
}

fn wrap_hours(hours: f64) -> f64 {
    hours.rem_euclid(24.0)
}

fn wrap_signed_hours(hours: f64) -> f64 {
    (hours + 12.0).rem_euclid(24.0) - 12.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn jd(y: i32, m: u32, d: u32) -> JulianDay {
        JulianDay::from_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_declination_at_solstices_and_equinox() {
        let june = solar_position(jd(2024, 6, 21).plus_days(0.5));
        assert!((june.declination.value() - 23.44).abs() < 0.05);

        let december = solar_position(jd(2024, 12, 21).plus_days(0.5));
        assert!((december.declination.value() + 23.44).abs() < 0.05);

        let march = solar_position(jd(2024, 3, 20).plus_days(0.5));
        assert!(march.declination.value().abs() < 0.5);
    }

    #[test]
    fn test_equation_of_time_extremes() {
        // Early November: sundial fast by ~16.4 minutes
        let nov = solar_position(jd(2024, 11, 3).plus_days(0.5));
        assert!((nov.equation_of_time.value() * 60.0 - 16.4).abs() < 0.5);

        // Mid February: sundial slow by ~14.2 minutes
        let feb = solar_position(jd(2024, 2, 11).plus_days(0.5));
        assert!((feb.equation_of_time.value() * 60.0 + 14.2).abs() < 0.5);
    }

    #[test]
    fn test_equation_of_time_stays_signed() {
        // Mean longitude wraps through 0° around the March equinox
        for day in 1..=31 {
            let pos = solar_position(jd(2024, 3, day));
            assert!(pos.equation_of_time.value().abs() < 0.5);
        }
    }

    #[test]
    fn test_hour_angle_equator_equinox() {
        // Geometric sunset at the equator on an equinox: 6 hours after noon
        let h = hour_angle(Degrees::new(0.0), Degrees::new(0.0), Degrees::new(0.0)).unwrap();
        assert!((h - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_hour_angle_midnight_sun() {
        let h = hour_angle(SUNRISE_DEPRESSION, Degrees::new(23.44), Degrees::new(70.0));
        assert!(h.is_none());
    }

    #[test]
    fn test_hour_angle_pole_is_undefined() {
        assert!(hour_angle(SUNRISE_DEPRESSION, Degrees::new(10.0), Degrees::new(90.0)).is_none());
    }

    #[test]
    fn test_asr_altitude_equal_shadow() {
        // Sun overhead at noon: Asr when shadow == height, i.e. altitude 45°
        let alt = asr_altitude(1.0, Degrees::new(20.0), Degrees::new(20.0)).unwrap();
        assert!((alt.value() - 45.0).abs() < 1e-9);

        let hanafi = asr_altitude(2.0, Degrees::new(20.0), Degrees::new(20.0)).unwrap();
        assert!(hanafi.value() < alt.value());
    }

    #[test]
    fn test_asr_altitude_polar_night() {
        assert!(asr_altitude(1.0, Degrees::new(-23.44), Degrees::new(80.0)).is_none());
    }
}
