//! Service layer: prayer-time computation and its collaborators.
//!
//! - [`solar`]: sun declination, equation of time and hour angles
//! - [`engine`]: the local [`PrayerEngine`]
//! - [`source`]: the [`ScheduleSource`] seam (local engine or [`remote`])
//! - [`qibla`]: bearing to the Kaaba
//! - [`clock`], [`location`]: injectable "now" and "here"

pub mod clock;
pub mod engine;
pub mod location;
pub mod qibla;
pub mod remote;
pub mod solar;
pub mod source;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{DhuhrOffsets, EngineConfig, HighLatitudeFallback, PrayerEngine};
pub use location::{resolve_coordinate, LocationProvider, StaticLocation};
pub use qibla::{qibla_direction, QiblaDirection, KAABA};
#[cfg(feature = "remote-source")]
pub use remote::AladhanSource;
pub use source::ScheduleSource;
