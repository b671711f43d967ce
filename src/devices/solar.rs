use std::f64::consts::PI;

use serde::Serialize;

use crate::error::{ConfigError, ensure_at_least, ensure_fraction};

/// Hour of day at which the daylight curve starts producing (inclusive).
pub const SUNRISE_HOUR: f64 = 6.0;

/// Hour of day at which the daylight curve stops producing (exclusive).
pub const SUNSET_HOUR: f64 = 18.0;

/// A DC solar array whose output follows irradiance and panel efficiency.
///
/// Output is always `max_output_w * irradiance * efficiency`. Irradiance is
/// overwritten every tick by the engine; efficiency only ever decreases,
/// through [`SolarSource::apply_degradation`].
#[derive(Debug, Clone, PartialEq)]
pub struct SolarSource {
    /// Rated output in watts at full irradiance and full efficiency.
    max_output_w: f64,

    /// Panel efficiency as a fraction (0.0 to 1.0).
    efficiency: f64,

    /// Normalized irradiance (0.0 = night, 1.0 = peak sun).
    irradiance: f64,
}

impl SolarSource {
    /// Creates a solar source with zero initial irradiance.
    ///
    /// # Arguments
    ///
    /// * `max_output_w` - Rated output in watts (must be >= 0)
    /// * `efficiency` - Panel efficiency fraction (0.0 to 1.0)
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either value is out of range or not finite.
    pub fn new(max_output_w: f64, efficiency: f64) -> Result<Self, ConfigError> {
        ensure_at_least("max_output_w", max_output_w, 0.0)?;
        ensure_fraction("efficiency", efficiency)?;
        Ok(Self {
            max_output_w,
            efficiency,
            irradiance: 0.0,
        })
    }

    /// Instantaneous output in watts for the current irradiance and efficiency.
    pub fn current_output(&self) -> f64 {
        self.max_output_w * self.irradiance * self.efficiency
    }

    /// Overwrites the irradiance, clamped to `[0.0, 1.0]`.
    ///
    /// NaN is treated as darkness.
    pub fn set_irradiance(&mut self, irradiance: f64) {
        self.irradiance = if irradiance.is_nan() {
            0.0
        } else {
            irradiance.clamp(0.0, 1.0)
        };
    }

    /// Reduces efficiency by `factor` of its current value.
    ///
    /// Repeated applications compound: each one multiplies the current
    /// efficiency by `1 - factor`. The factor is clamped to `[0.0, 1.0]`.
    pub fn apply_degradation(&mut self, factor: f64) {
        let factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        self.efficiency = (self.efficiency * (1.0 - factor)).clamp(0.0, 1.0);
    }

    /// Rated output in watts.
    pub fn max_output_w(&self) -> f64 {
        self.max_output_w
    }

    /// Current panel efficiency.
    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// Current irradiance.
    pub fn irradiance(&self) -> f64 {
        self.irradiance
    }
}

/// Source of the per-tick base irradiance before faults are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "profile", content = "irradiance", rename_all = "snake_case")]
pub enum IrradianceProfile {
    /// Single-humped daily curve from [`daylight_irradiance`].
    #[default]
    Daylight,
    /// Fixed irradiance regardless of time of day.
    Constant(f64),
}

impl IrradianceProfile {
    /// Base irradiance at the given hour of day.
    pub fn irradiance_at(&self, hour_of_day: f64) -> f64 {
        match self {
            Self::Daylight => daylight_irradiance(hour_of_day),
            Self::Constant(v) => v.clamp(0.0, 1.0),
        }
    }
}

/// Daily irradiance curve: zero outside `[6, 18)`, otherwise
/// `sin(pi * (hour - 6) / 12)`, peaking at 1.0 at solar noon.
pub fn daylight_irradiance(hour_of_day: f64) -> f64 {
    if !(SUNRISE_HOUR..SUNSET_HOUR).contains(&hour_of_day) {
        return 0.0;
    }
    let day_position = (hour_of_day - SUNRISE_HOUR) / (SUNSET_HOUR - SUNRISE_HOUR);
    (PI * day_position).sin().clamp(0.0, 1.0)
}
