use crate::error::{ConfigError, ensure_at_least, ensure_fraction};

/// Seconds per hour, for watt-hour conversions.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// A DC-coupled battery store that tracks stored energy in watt-hours.
///
/// Charge and discharge never fail: requests are capped by the rate limit
/// and by the headroom to the `max_soc`/`min_soc` bounds, and the energy
/// actually moved is returned. The stored energy therefore always stays in
/// `[min_soc * capacity, max_soc * capacity]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryStore {
    /// Total energy capacity in watt-hours.
    capacity_wh: f64,

    /// Currently stored energy in watt-hours.
    charge_wh: f64,

    /// Maximum charging power in watts.
    max_charge_rate_w: f64,

    /// Maximum discharging power in watts.
    max_discharge_rate_w: f64,

    /// Lower state-of-charge bound (0.0 to 1.0).
    min_soc: f64,

    /// Upper state-of-charge bound (0.0 to 1.0).
    max_soc: f64,
}

impl BatteryStore {
    /// Creates a battery with the full `[0.0, 1.0]` SOC window.
    ///
    /// # Errors
    ///
    /// See [`BatteryStore::with_soc_limits`].
    pub fn new(
        capacity_wh: f64,
        initial_charge_wh: f64,
        max_charge_rate_w: f64,
        max_discharge_rate_w: f64,
    ) -> Result<Self, ConfigError> {
        Self::with_soc_limits(
            capacity_wh,
            initial_charge_wh,
            max_charge_rate_w,
            max_discharge_rate_w,
            0.0,
            1.0,
        )
    }

    /// Creates a battery with explicit SOC bounds.
    ///
    /// # Arguments
    ///
    /// * `capacity_wh` - Capacity in watt-hours (must be > 0)
    /// * `initial_charge_wh` - Starting energy, within the SOC window
    /// * `max_charge_rate_w` - Charge power limit (must be >= 0)
    /// * `max_discharge_rate_w` - Discharge power limit (must be >= 0)
    /// * `min_soc` - Lower SOC bound
    /// * `max_soc` - Upper SOC bound (`min_soc <= max_soc`)
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first offending argument.
    pub fn with_soc_limits(
        capacity_wh: f64,
        initial_charge_wh: f64,
        max_charge_rate_w: f64,
        max_discharge_rate_w: f64,
        min_soc: f64,
        max_soc: f64,
    ) -> Result<Self, ConfigError> {
        if !capacity_wh.is_finite() || capacity_wh <= 0.0 {
            return Err(ConfigError::new(
                "capacity_wh",
                format!("must be > 0, got {capacity_wh}"),
            ));
        }
        ensure_at_least("max_charge_rate_w", max_charge_rate_w, 0.0)?;
        ensure_at_least("max_discharge_rate_w", max_discharge_rate_w, 0.0)?;
        ensure_fraction("min_soc", min_soc)?;
        ensure_fraction("max_soc", max_soc)?;
        if min_soc > max_soc {
            return Err(ConfigError::new("min_soc", "must be <= max_soc"));
        }

        let floor = capacity_wh * min_soc;
        let ceiling = capacity_wh * max_soc;
        if !initial_charge_wh.is_finite() || initial_charge_wh < floor || initial_charge_wh > ceiling
        {
            return Err(ConfigError::new(
                "initial_charge_wh",
                format!("must be in [{floor}, {ceiling}], got {initial_charge_wh}"),
            ));
        }

        Ok(Self {
            capacity_wh,
            charge_wh: initial_charge_wh,
            max_charge_rate_w,
            max_discharge_rate_w,
            min_soc,
            max_soc,
        })
    }

    /// Stored energy as a fraction of capacity.
    pub fn state_of_charge(&self) -> f64 {
        self.charge_wh / self.capacity_wh
    }

    /// Energy that can still be stored before reaching `max_soc`.
    pub fn available_charge_headroom_wh(&self) -> f64 {
        (self.ceiling_wh() - self.charge_wh).max(0.0)
    }

    /// Energy that can still be drawn before reaching `min_soc`.
    pub fn available_discharge_headroom_wh(&self) -> f64 {
        (self.charge_wh - self.floor_wh()).max(0.0)
    }

    /// Charges at `power_w` for `duration_s` and returns the energy stored (Wh).
    ///
    /// Power is capped at the charge rate, then energy is capped at the
    /// charge headroom.
    pub fn charge(&mut self, power_w: f64, duration_s: f64) -> f64 {
        let power_w = power_w.min(self.max_charge_rate_w).max(0.0);
        let energy_wh = (power_w * duration_s / SECONDS_PER_HOUR)
            .min(self.available_charge_headroom_wh())
            .max(0.0);
        self.charge_wh = (self.charge_wh + energy_wh).min(self.ceiling_wh());
        energy_wh
    }

    /// Discharges at `power_w` for `duration_s` and returns the energy drawn (Wh).
    ///
    /// Power is capped at the discharge rate, then energy is capped at the
    /// discharge headroom.
    pub fn discharge(&mut self, power_w: f64, duration_s: f64) -> f64 {
        let power_w = power_w.min(self.max_discharge_rate_w).max(0.0);
        let energy_wh = (power_w * duration_s / SECONDS_PER_HOUR)
            .min(self.available_discharge_headroom_wh())
            .max(0.0);
        self.charge_wh = (self.charge_wh - energy_wh).max(self.floor_wh());
        energy_wh
    }

    /// Total capacity in watt-hours.
    pub fn capacity_wh(&self) -> f64 {
        self.capacity_wh
    }

    /// Stored energy in watt-hours.
    pub fn charge_wh(&self) -> f64 {
        self.charge_wh
    }

    /// Charge power limit in watts.
    pub fn max_charge_rate_w(&self) -> f64 {
        self.max_charge_rate_w
    }

    /// Discharge power limit in watts.
    pub fn max_discharge_rate_w(&self) -> f64 {
        self.max_discharge_rate_w
    }

    /// Lower SOC bound.
    pub fn min_soc(&self) -> f64 {
        self.min_soc
    }

    /// Upper SOC bound.
    pub fn max_soc(&self) -> f64 {
        self.max_soc
    }

    fn floor_wh(&self) -> f64 {
        self.capacity_wh * self.min_soc
    }

    fn ceiling_wh(&self) -> f64 {
        self.capacity_wh * self.max_soc
    }
}
