//! Qibla direction.

use qtty::Degrees;
use serde::{Deserialize, Serialize};

use crate::error::PrayerResult;
use crate::models::GeoCoordinate;

/// Coordinates of the Kaaba, Masjid al-Haram.
pub const KAABA: GeoCoordinate = GeoCoordinate::from_raw(21.4225, 39.8262);

/// Bearing from an observer toward the Kaaba.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QiblaDirection {
    /// Initial great-circle bearing, degrees clockwise from true north in [0, 360).
    pub bearing: f64,
    /// Great-circle distance in kilometres.
    pub distance_km: f64,
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Initial great-circle bearing and distance to the Kaaba.
///
/// The bearing at the Kaaba itself is reported as 0.
pub fn qibla_direction(from: &GeoCoordinate) -> PrayerResult<QiblaDirection> {
    from.validate()?;

    let (lat1, lat2) = (from.latitude_deg(), KAABA.latitude_deg());
    let delta_lng = Degrees::new(KAABA.longitude() - from.longitude());

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();
    let bearing = if x == 0.0 && y == 0.0 {
        0.0
    } else {
        Degrees::new(y.atan2(x).to_degrees()).wrap_pos().value()
    };

    // Haversine
    let delta_lat = KAABA.latitude() - from.latitude();
    let a = (delta_lat.to_radians() / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng.value().to_radians() / 2.0).sin().powi(2);
    let distance_km = 2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin();

    Ok(QiblaDirection {
        bearing,
        distance_km,
    })
}
