//! Optional device location.

use log::debug;

use crate::models::GeoCoordinate;

/// Where the observer currently is, if known.
pub trait LocationProvider: Send + Sync {
    fn current(&self) -> Option<GeoCoordinate>;
}

/// Provider returning a fixed answer (including "unknown").
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocation(pub Option<GeoCoordinate>);

impl LocationProvider for StaticLocation {
    fn current(&self) -> Option<GeoCoordinate> {
        self.0
    }
}

/// Provider's coordinate when it has a valid one, else `default`.
pub fn resolve_coordinate(provider: &dyn LocationProvider, default: GeoCoordinate) -> GeoCoordinate {
    match provider.current() {
        Some(coordinate) if coordinate.validate().is_ok() => coordinate,
        Some(coordinate) => {
            debug!("Ignoring invalid location {:?}, using default", coordinate);
            default
        }
        None => {
            debug!("No location available, using default {:?}", default);
            default
        }
    }
}
