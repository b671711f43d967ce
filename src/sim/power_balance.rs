//! Solar-first power routing.

/// Power flows chosen for one tick, all in watts and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerFlows {
    /// Solar power delivered to loads.
    pub from_solar: f64,
    /// Battery power delivered to loads.
    pub from_battery: f64,
    /// Excess solar sent into the battery.
    pub to_battery: f64,
}

/// Routes demand solar-first, battery-second, and sends excess solar to the
/// battery unless the battery is held in reserve.
///
/// At most one of `from_battery` and `to_battery` is non-zero: charging
/// needs a solar surplus, which means the battery supplies nothing.
///
/// # Arguments
///
/// * `solar_w` - Solar output
/// * `demand_w` - Demand of the active loads
/// * `charge_limit_w` - Largest power the battery can absorb this tick
/// * `reserve_mode` - Whether charging is suppressed
pub fn route(solar_w: f64, demand_w: f64, charge_limit_w: f64, reserve_mode: bool) -> PowerFlows {
    let from_solar = solar_w.min(demand_w);
    let from_battery = (demand_w - solar_w).max(0.0);
    let excess_solar = (solar_w - demand_w).max(0.0);

    let to_battery = if excess_solar > 0.0 && !reserve_mode {
        excess_solar.min(charge_limit_w).max(0.0)
    } else {
        0.0
    };

    PowerFlows {
        from_solar,
        from_battery,
        to_battery,
    }
}
