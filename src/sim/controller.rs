//! Per-tick power routing and load shedding decisions.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::devices::battery::SECONDS_PER_HOUR;
use crate::devices::{BatteryStore, Load, Priority, SolarSource};
use crate::error::{ConfigError, ensure_at_least, ensure_fraction};

use super::power_balance::route;
use super::trace::DecisionEvent;

/// Tunable thresholds for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerSettings {
    /// SOC at or below which the battery only serves critical loads.
    pub critical_reserve_soc: f64,
    /// Fractional margin above available power within which shed loads may
    /// be restored.
    pub hysteresis_margin: f64,
}

impl ControllerSettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the reserve SOC is outside `[0, 1]` or the
    /// margin is negative.
    pub fn new(critical_reserve_soc: f64, hysteresis_margin: f64) -> Result<Self, ConfigError> {
        ensure_fraction("critical_reserve_soc", critical_reserve_soc)?;
        ensure_at_least("hysteresis_margin", hysteresis_margin, 0.0)?;
        Ok(Self {
            critical_reserve_soc,
            hysteresis_margin,
        })
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            critical_reserve_soc: 0.20,
            hysteresis_margin: 0.10,
        }
    }
}

/// Routing decision for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// Solar power delivered to loads (W).
    pub power_from_solar: f64,
    /// Battery power requested for loads (W).
    pub power_from_battery: f64,
    /// Excess solar sent into the battery (W).
    pub power_to_battery: f64,
    /// Names of loads left on, in collection order.
    pub active_loads: Vec<String>,
    /// Names of loads left off, in collection order.
    pub shed_loads: Vec<String>,
    /// Branches taken, in order.
    pub trace: Vec<DecisionEvent>,
    /// Battery SOC seen by the decision.
    pub battery_soc: f64,
    /// Demand of active loads after shedding or restoring (W).
    pub total_demand: f64,
    /// Solar plus usable battery power (W).
    pub total_available: f64,
    /// Whether the battery was held in reserve for critical loads.
    pub reserve_mode: bool,
}

/// Solar-first, battery-second controller with priority load shedding.
///
/// The controller owns no components; it reads them for the duration of a
/// [`PowerController::decide`] call and only mutates the loads' active
/// flags. Loads it has shed are remembered across ticks so that only those
/// are candidates for restoring.
#[derive(Debug, Clone, Default)]
pub struct PowerController {
    settings: ControllerSettings,
    shed_set: BTreeSet<String>,
}

impl PowerController {
    /// Creates a controller with an empty shed set.
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            shed_set: BTreeSet::new(),
        }
    }

    /// Decides routing for one tick of `timestep_s` seconds.
    ///
    /// Sheds loads (deferrable first) when demand exceeds solar plus usable
    /// battery power; otherwise restores previously shed loads (critical
    /// first) that fit under the hysteresis threshold. A tick never does
    /// both. Energy stores are left untouched; the caller commits the
    /// returned flows.
    pub fn decide(
        &mut self,
        solar: &SolarSource,
        battery: &BatteryStore,
        loads: &mut [Load],
        timestep_s: f64,
    ) -> Decision {
        let mut trace = Vec::new();

        let solar_output = solar.current_output();
        trace.push(DecisionEvent::SolarOutput {
            watts: solar_output,
        });

        let critical_demand = critical_demand(loads);
        trace.push(DecisionEvent::CriticalDemand {
            watts: critical_demand,
        });

        let demand_before = total_demand(loads);
        trace.push(DecisionEvent::TotalDemand {
            watts: demand_before,
        });

        let battery_soc = battery.state_of_charge();
        let reserve_mode = battery_soc <= self.settings.critical_reserve_soc;

        let discharge_ceiling = if reserve_mode {
            trace.push(DecisionEvent::ReserveMode {
                soc: battery_soc,
                reserve_soc: self.settings.critical_reserve_soc,
            });
            trace.push(DecisionEvent::BatteryReservedForCritical {
                ceiling_w: critical_demand,
            });
            critical_demand
        } else {
            battery.max_discharge_rate_w()
        };

        let available_battery_w = discharge_ceiling
            .min(battery.available_discharge_headroom_wh() * SECONDS_PER_HOUR / timestep_s);
        let total_available = solar_output + available_battery_w;
        trace.push(DecisionEvent::TotalAvailable {
            watts: total_available,
        });

        if demand_before > total_available {
            trace.push(DecisionEvent::Shortfall {
                demand_w: demand_before,
                available_w: total_available,
            });
            self.shed(loads, total_available, &mut trace);
        } else {
            self.restore(loads, total_available, &mut trace);
        }

        let total_demand = total_demand(loads);

        let charge_limit_w = battery
            .max_charge_rate_w()
            .min(battery.available_charge_headroom_wh() * SECONDS_PER_HOUR / timestep_s);
        let flows = route(solar_output, total_demand, charge_limit_w, reserve_mode);
        if flows.to_battery > 0.0 {
            trace.push(DecisionEvent::ChargeBattery {
                watts: flows.to_battery,
            });
        }

        let (active, shed): (Vec<&Load>, Vec<&Load>) = loads.iter().partition(|l| l.is_active());

        Decision {
            power_from_solar: flows.from_solar,
            power_from_battery: flows.from_battery,
            power_to_battery: flows.to_battery,
            active_loads: active.iter().map(|l| l.name().to_string()).collect(),
            shed_loads: shed.iter().map(|l| l.name().to_string()).collect(),
            trace,
            battery_soc,
            total_demand,
            total_available,
            reserve_mode,
        }
    }

    /// Deactivates active loads, highest priority number first, until demand
    /// fits `available_w` or nothing is left on.
    fn shed(&mut self, loads: &mut [Load], available_w: f64, trace: &mut Vec<DecisionEvent>) {
        let mut order: Vec<usize> = (0..loads.len()).collect();
        order.sort_by_key(|&i| Reverse(loads[i].priority()));

        let mut demand = total_demand(loads);
        for i in order {
            if demand <= available_w {
                break;
            }
            let load = &mut loads[i];
            if !load.is_active() {
                continue;
            }
            load.deactivate();
            demand -= load.power_draw_w();
            self.shed_set.insert(load.name().to_string());
            debug!(load = load.name(), priority = %load.priority(), draw_w = load.power_draw_w(), "shed load");
            trace.push(DecisionEvent::Shed {
                load: load.name().to_string(),
                priority: load.priority(),
                draw_w: load.power_draw_w(),
            });
        }

        if loads.iter().all(|l| !l.is_active()) {
            trace.push(DecisionEvent::AllLoadsShed { available_w });
        }
    }

    /// Reactivates loads from the shed set, lowest priority number first,
    /// while demand stays within `available_w * (1 + hysteresis_margin)`.
    fn restore(&mut self, loads: &mut [Load], available_w: f64, trace: &mut Vec<DecisionEvent>) {
        if self.shed_set.is_empty() {
            return;
        }

        let threshold_w = available_w * (1.0 + self.settings.hysteresis_margin);
        trace.push(DecisionEvent::RestoreWindow { threshold_w });

        let mut order: Vec<usize> = (0..loads.len()).collect();
        order.sort_by_key(|&i| loads[i].priority());

        let mut demand = total_demand(loads);
        for i in order {
            let load = &mut loads[i];
            if load.is_active() || !self.shed_set.contains(load.name()) {
                continue;
            }
            let potential = demand + load.power_draw_w();
            if potential <= threshold_w {
                load.activate();
                demand = potential;
                self.shed_set.remove(load.name());
                debug!(load = load.name(), priority = %load.priority(), draw_w = load.power_draw_w(), "restored load");
                trace.push(DecisionEvent::Restore {
                    load: load.name().to_string(),
                    priority: load.priority(),
                    draw_w: load.power_draw_w(),
                });
            }
        }
    }

    /// Controller thresholds.
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Names of loads shed by this controller and not yet restored.
    pub fn shed_set(&self) -> &BTreeSet<String> {
        &self.shed_set
    }
}

/// Loads with critical priority.
pub fn critical_loads(loads: &[Load]) -> impl Iterator<Item = &Load> {
    loads.iter().filter(|l| l.priority() == Priority::Critical)
}

/// Configured draw of all critical loads, whether active or not.
pub fn critical_demand(loads: &[Load]) -> f64 {
    critical_loads(loads).map(Load::power_draw_w).sum()
}

/// Draw of all active loads.
pub fn total_demand(loads: &[Load]) -> f64 {
    loads.iter().map(Load::current_draw).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(name: &str, w: f64, p: Priority) -> Load {
        Load::new(name, w, p).unwrap()
    }

    fn dark_solar() -> SolarSource {
        SolarSource::new(1000.0, 1.0).unwrap()
    }

    fn sunny_solar(watts: f64) -> SolarSource {
        let mut s = SolarSource::new(watts, 1.0).unwrap();
        s.set_irradiance(1.0);
        s
    }

    #[test]
    fn settings_defaults_and_validation() {
        let s = ControllerSettings::default();
        assert_eq!(s.critical_reserve_soc, 0.20);
        assert_eq!(s.hysteresis_margin, 0.10);
        assert!(ControllerSettings::new(1.5, 0.1).is_err());
        assert!(ControllerSettings::new(0.2, -0.1).is_err());
    }

    #[test]
    fn reserve_mode_caps_battery_to_critical_demand() {
        // SOC exactly at the reserve, no sun
        let battery = BatteryStore::new(10_000.0, 2_000.0, 1_000.0, 1_000.0).unwrap();
        let mut loads = vec![
            load("Vaccine fridge", 200.0, Priority::Critical),
            load("Water pump", 500.0, Priority::Deferrable),
        ];
        let mut c = PowerController::default();

        let d = c.decide(&dark_solar(), &battery, &mut loads, 60.0);

        assert!(d.reserve_mode);
        assert_eq!(d.total_available, 200.0);
        assert_eq!(d.active_loads, vec!["Vaccine fridge"]);
        assert_eq!(d.shed_loads, vec!["Water pump"]);
        assert_eq!(d.total_demand, 200.0);
        assert_eq!(d.power_from_battery, 200.0);
        assert_eq!(d.power_to_battery, 0.0);
        assert!(c.shed_set().contains("Water pump"));
    }

    #[test]
    fn sheds_deferrable_before_high_before_critical() {
        let battery = BatteryStore::new(10_000.0, 9_000.0, 1_000.0, 250.0).unwrap();
        let mut loads = vec![
            load("crit", 200.0, Priority::Critical),
            load("high", 100.0, Priority::High),
            load("defer", 100.0, Priority::Deferrable),
        ];
        let mut c = PowerController::default();

        let d = c.decide(&dark_solar(), &battery, &mut loads, 60.0);

        assert_eq!(d.shed_loads, vec!["high", "defer"]);
        assert_eq!(d.total_demand, 200.0);
        let shed_order: Vec<&str> = d
            .trace
            .iter()
            .filter_map(|e| match e {
                DecisionEvent::Shed { load, .. } => Some(load.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(shed_order, vec!["defer", "high"]);
    }

    #[test]
    fn equal_priorities_shed_in_collection_order() {
        let battery = BatteryStore::new(10_000.0, 9_000.0, 1_000.0, 150.0).unwrap();
        let mut loads = vec![
            load("a", 100.0, Priority::Deferrable),
            load("b", 100.0, Priority::Deferrable),
        ];
        let mut c = PowerController::default();
        let d = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert_eq!(d.shed_loads, vec!["a"]);
    }

    #[test]
    fn sheds_everything_without_supply() {
        let battery = BatteryStore::new(1_000.0, 0.0, 100.0, 100.0).unwrap();
        let mut loads = vec![
            load("crit", 50.0, Priority::Critical),
            load("defer", 50.0, Priority::Deferrable),
        ];
        let mut c = PowerController::default();
        let d = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert!(d.active_loads.is_empty());
        assert_eq!(d.total_demand, 0.0);
        assert_eq!(d.power_from_battery, 0.0);
        assert!(d
            .trace
            .iter()
            .any(|e| matches!(e, DecisionEvent::AllLoadsShed { .. })));
    }

    #[test]
    fn restores_when_supply_returns() {
        let battery = BatteryStore::new(10_000.0, 9_000.0, 1_000.0, 300.0).unwrap();
        let mut loads = vec![
            load("crit", 300.0, Priority::Critical),
            load("defer", 200.0, Priority::Deferrable),
        ];
        let mut c = PowerController::default();

        let first = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert_eq!(first.shed_loads, vec!["defer"]);

        let second = c.decide(&sunny_solar(400.0), &battery, &mut loads, 60.0);
        assert!(second.shed_loads.is_empty());
        assert!(c.shed_set().is_empty());
        assert!(second
            .trace
            .iter()
            .any(|e| matches!(e, DecisionEvent::Restore { load, .. } if load == "defer")));
        assert!(!second
            .trace
            .iter()
            .any(|e| matches!(e, DecisionEvent::Shed { .. })));
    }

    #[test]
    fn restore_respects_threshold() {
        // available 200 W, threshold 220 W: a 300 W load stays off
        let battery = BatteryStore::new(10_000.0, 9_000.0, 1_000.0, 200.0).unwrap();
        let mut loads = vec![
            load("crit", 100.0, Priority::Critical),
            load("big", 300.0, Priority::High),
        ];
        let mut c = PowerController::default();
        c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        let d = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert_eq!(d.shed_loads, vec!["big"]);
        assert!(d
            .trace
            .iter()
            .any(|e| matches!(e, DecisionEvent::RestoreWindow { threshold_w } if (*threshold_w - 220.0).abs() < 1e-9)));
    }

    #[test]
    fn only_loads_in_shed_set_are_restored() {
        let battery = BatteryStore::new(10_000.0, 9_000.0, 1_000.0, 1_000.0).unwrap();
        let mut loads = vec![load("manual", 100.0, Priority::High)];
        loads[0].deactivate();
        let mut c = PowerController::default();
        let d = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert_eq!(d.shed_loads, vec!["manual"]);
    }

    #[test]
    fn excess_solar_charges_battery() {
        let battery = BatteryStore::new(10_000.0, 5_000.0, 400.0, 1_000.0).unwrap();
        let mut loads = vec![load("crit", 100.0, Priority::Critical)];
        let mut c = PowerController::default();
        let d = c.decide(&sunny_solar(1000.0), &battery, &mut loads, 60.0);
        assert_eq!(d.power_from_solar, 100.0);
        assert_eq!(d.power_from_battery, 0.0);
        assert_eq!(d.power_to_battery, 400.0);
    }

    #[test]
    fn charging_capped_by_headroom() {
        // 1 Wh of headroom over a 60 s tick is at most 60 W
        let battery = BatteryStore::new(1_000.0, 999.0, 5_000.0, 1_000.0).unwrap();
        let mut loads = vec![load("crit", 100.0, Priority::Critical)];
        let mut c = PowerController::default();
        let d = c.decide(&sunny_solar(1000.0), &battery, &mut loads, 60.0);
        assert!((d.power_to_battery - 60.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_decide_is_idempotent() {
        let battery = BatteryStore::new(10_000.0, 2_000.0, 1_000.0, 1_000.0).unwrap();
        let mut loads = vec![
            load("crit", 200.0, Priority::Critical),
            load("defer", 500.0, Priority::Deferrable),
        ];
        let mut c = PowerController::default();
        let first = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        let counts: Vec<u32> = loads.iter().map(Load::shed_count).collect();
        let second = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert_eq!(first.active_loads, second.active_loads);
        assert_eq!(first.shed_loads, second.shed_loads);
        assert_eq!(first.total_demand, second.total_demand);
        assert_eq!(counts, loads.iter().map(Load::shed_count).collect::<Vec<_>>());
        // once settled, the whole decision repeats, trace included
        let third = c.decide(&dark_solar(), &battery, &mut loads, 60.0);
        assert_eq!(second, third);
    }

    #[test]
    fn demand_helpers() {
        let mut loads = vec![
            load("crit", 200.0, Priority::Critical),
            load("defer", 500.0, Priority::Deferrable),
        ];
        loads[0].deactivate();
        assert_eq!(critical_demand(&loads), 200.0);
        assert_eq!(total_demand(&loads), 500.0);
        assert_eq!(critical_loads(&loads).count(), 1);
    }
}
