//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use microgrid_sim::config::{ProfileKind, ScenarioConfig};
use microgrid_sim::devices::{BatteryStore, IrradianceProfile, Load, Priority, SolarSource};
use microgrid_sim::sim::{ControllerSettings, SimConfig, SimulationEngine};

/// Solar source with full efficiency so output equals `max_output_w * irradiance`.
pub fn unit_solar(max_output_w: f64, irradiance: f64) -> SolarSource {
    let mut solar = SolarSource::new(max_output_w, 1.0).unwrap();
    solar.set_irradiance(irradiance);
    solar
}

/// Battery that holds charge but cannot deliver or absorb power.
pub fn idle_battery() -> BatteryStore {
    BatteryStore::new(1000.0, 500.0, 0.0, 0.0).unwrap()
}

/// Default controller thresholds (reserve 0.20, margin 0.10).
pub fn default_settings() -> ControllerSettings {
    ControllerSettings::default()
}

pub fn load(name: &str, power_draw_w: f64, priority: Priority) -> Load {
    Load::new(name, power_draw_w, priority).unwrap()
}

/// Household loads: critical 150 W, high 100 W, deferrable 300 W.
pub fn household_loads() -> Vec<Load> {
    vec![
        load("Refrigerator", 150.0, Priority::Critical),
        load("Lighting", 100.0, Priority::High),
        load("Water pump", 300.0, Priority::Deferrable),
    ]
}

/// One day at one-minute ticks from midnight under the daylight curve.
pub fn one_day_config() -> SimConfig {
    SimConfig::new(60, 0.0, 24.0).unwrap()
}

/// Engine built from the household fixtures.
pub fn household_engine(config: SimConfig, battery: BatteryStore) -> SimulationEngine {
    SimulationEngine::new(
        config,
        SolarSource::new(3000.0, 0.2).unwrap(),
        battery,
        household_loads(),
        default_settings(),
    )
    .unwrap()
}

/// Baseline preset shortened to `hours`.
pub fn short_baseline(hours: f64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.duration_hours = hours;
    cfg
}

/// Baseline preset under constant full sun with a battery large enough to
/// carry every load for the whole run.
pub fn always_sunny(hours: f64) -> ScenarioConfig {
    let mut cfg = short_baseline(hours);
    cfg.solar.profile = ProfileKind::Constant;
    cfg.solar.constant_irradiance = 1.0;
    cfg
}

/// Profile for a fixed irradiance.
pub fn constant(irradiance: f64) -> IrradianceProfile {
    IrradianceProfile::Constant(irradiance)
}
