//! Core simulation types: run configuration and per-step records.

use std::fmt;

use serde::Serialize;

use crate::devices::IrradianceProfile;
use crate::error::{ConfigError, ensure_at_least, ensure_fraction};

use super::fault::ActiveFault;
use super::trace::{self, DecisionEvent};

/// Timing and environment configuration for one run.
///
/// # Examples
///
/// ```
/// use microgrid_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(60, 6.0, 24.0).unwrap();
/// assert_eq!(cfg.total_steps(), 1440);
/// assert_eq!(cfg.duration_s(), 86_400);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimConfig {
    /// Length of one tick in seconds.
    pub timestep_s: u64,
    /// Hour of day at the first tick, in `[0, 24)`.
    pub start_hour: f64,
    /// Simulated duration in hours.
    pub duration_hours: f64,
    /// Source of the per-tick irradiance before faults.
    pub irradiance: IrradianceProfile,
}

/// Upper bound on ticks per run; the whole history is kept in memory.
pub const MAX_STEPS: usize = 10_000_000;

impl SimConfig {
    /// Creates a configuration using the daylight irradiance curve.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `timestep_s` is zero, `start_hour` is
    /// outside `[0, 24)`, `duration_hours` is negative, or the run would
    /// exceed [`MAX_STEPS`] ticks.
    pub fn new(timestep_s: u64, start_hour: f64, duration_hours: f64) -> Result<Self, ConfigError> {
        if timestep_s == 0 {
            return Err(ConfigError::new("timestep_s", "must be > 0"));
        }
        if !start_hour.is_finite() || !(0.0..24.0).contains(&start_hour) {
            return Err(ConfigError::new(
                "start_hour",
                format!("must be in [0, 24), got {start_hour}"),
            ));
        }
        ensure_at_least("duration_hours", duration_hours, 0.0)?;
        let steps = duration_hours * 3600.0 / timestep_s as f64;
        if steps > MAX_STEPS as f64 {
            return Err(ConfigError::new(
                "duration_hours",
                format!(
                    "{duration_hours} h at {timestep_s} s per tick exceeds {MAX_STEPS} ticks"
                ),
            ));
        }
        Ok(Self {
            timestep_s,
            start_hour,
            duration_hours,
            irradiance: IrradianceProfile::Daylight,
        })
    }

    /// Replaces the irradiance profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a constant irradiance is outside `[0, 1]`.
    pub fn with_irradiance(mut self, profile: IrradianceProfile) -> Result<Self, ConfigError> {
        if let IrradianceProfile::Constant(v) = profile {
            ensure_fraction("constant_irradiance", v)?;
        }
        self.irradiance = profile;
        Ok(self)
    }

    /// Number of ticks in the run, truncated to whole steps.
    pub fn total_steps(&self) -> usize {
        (self.duration_hours * 3600.0 / self.timestep_s as f64) as usize
    }

    /// Duration rounded to whole seconds.
    pub fn duration_s(&self) -> u64 {
        (self.duration_hours * 3600.0).round() as u64
    }

    /// Tick length as a float, for energy arithmetic.
    pub fn timestep_secs_f64(&self) -> f64 {
        self.timestep_s as f64
    }
}

/// Complete record of one simulation tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// Zero-based tick index.
    pub step: usize,
    /// Seconds since the start of the run.
    pub timestamp_s: u64,
    /// Hour of day in `[0, 24)`.
    pub hour_of_day: f64,
    /// Irradiance after faults.
    pub irradiance: f64,
    /// Solar output seen by the controller (W).
    pub solar_output_w: f64,
    /// SOC after this tick's energy commit.
    pub battery_soc: f64,
    /// Stored energy after this tick's energy commit (Wh).
    pub battery_charge_wh: f64,
    pub power_from_solar: f64,
    pub power_from_battery: f64,
    pub power_to_battery: f64,
    /// Demand of active loads after shedding or restoring (W).
    pub total_demand: f64,
    /// Solar plus usable battery power (W).
    pub total_available: f64,
    pub active_load_names: Vec<String>,
    pub shed_load_names: Vec<String>,
    /// Faults in effect during the tick.
    pub active_faults: Vec<ActiveFault>,
    /// Controller branches taken, in order.
    pub decision_trace: Vec<DecisionEvent>,
    /// Whether the battery was held for critical loads.
    pub reserve_mode: bool,
}

impl StepRecord {
    pub fn num_active(&self) -> usize {
        self.active_load_names.len()
    }

    pub fn num_shed(&self) -> usize {
        self.shed_load_names.len()
    }

    /// Fault descriptions as shown in reports.
    pub fn fault_descriptions(&self) -> Vec<String> {
        self.active_faults.iter().map(ToString::to_string).collect()
    }

    /// Decision trace rendered as one line.
    pub fn trace_line(&self) -> String {
        trace::render(&self.decision_trace)
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} ({:>5.2}h) | solar={:>7.1} W  demand={:>7.1} W  avail={:>7.1} W | \
             bat +{:.1}/-{:.1} W (SoC={:.1}%){} | loads {} on, {} shed",
            self.step,
            self.hour_of_day,
            self.solar_output_w,
            self.total_demand,
            self.total_available,
            self.power_to_battery,
            self.power_from_battery,
            self.battery_soc * 100.0,
            if self.reserve_mode { " RESERVE" } else { "" },
            self.num_active(),
            self.num_shed(),
        )?;
        if !self.active_faults.is_empty() {
            write!(f, " | faults: {}", self.fault_descriptions().join("; "))?;
        }
        Ok(())
    }
}
