//! Micro-grid components: solar array, battery store, and prioritized loads.

/// DC-coupled battery storage model.
pub mod battery;
/// Prioritized electrical loads.
pub mod load;
/// Solar array model and irradiance profiles.
pub mod solar;

pub use battery::BatteryStore;
pub use load::{Load, Priority};
pub use solar::{IrradianceProfile, SolarSource, daylight_irradiance};
