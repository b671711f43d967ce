//! Simulation engine that owns the micro-grid and advances it tick by tick.

use std::collections::HashSet;

use tracing::info;

use crate::devices::{BatteryStore, Load, SolarSource};
use crate::error::ConfigError;

use super::clock::Clock;
use super::controller::{ControllerSettings, PowerController};
use super::fault::{FaultEvent, FaultSchedule};
use super::kpi::RunSummary;
use super::types::{SimConfig, StepRecord};

/// Simulation engine owning the solar source, battery, loads, controller,
/// fault schedule, and step history.
///
/// Each engine is independent; running several scenarios means building
/// several engines.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    config: SimConfig,
    clock: Clock,
    solar: SolarSource,
    battery: BatteryStore,
    loads: Vec<Load>,
    controller: PowerController,
    faults: FaultSchedule,
    history: Vec<StepRecord>,
    last_logged_hour: Option<u64>,
}

impl SimulationEngine {
    /// Creates a new engine at time zero.
    ///
    /// # Arguments
    ///
    /// * `config` - Timing and irradiance configuration
    /// * `solar` - Solar source
    /// * `battery` - Battery store
    /// * `loads` - Loads in collection order, which is also the tie-break
    ///   order for equal priorities
    /// * `settings` - Controller thresholds
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if two loads share a name.
    pub fn new(
        config: SimConfig,
        solar: SolarSource,
        battery: BatteryStore,
        loads: Vec<Load>,
        settings: ControllerSettings,
    ) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for (i, load) in loads.iter().enumerate() {
            if !seen.insert(load.name()) {
                return Err(ConfigError::new(
                    format!("loads[{i}].name"),
                    format!("duplicate load name '{}'", load.name()),
                ));
            }
        }

        let clock = Clock::new(config.total_steps(), config.timestep_s, config.start_hour);
        Ok(Self {
            clock,
            history: Vec::new(),
            config,
            solar,
            battery,
            loads,
            controller: PowerController::new(settings),
            faults: FaultSchedule::new(),
            last_logged_hour: None,
        })
    }

    /// Schedules a fault.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the fault targets an unknown load or
    /// overlaps another spike on the same load.
    pub fn inject_fault(&mut self, event: FaultEvent) -> Result<(), ConfigError> {
        self.faults.register(event, &self.loads)
    }

    /// Runs one tick and returns its record, or `None` once the run is over.
    pub fn step(&mut self) -> Option<&StepRecord> {
        let tick = self.clock.tick()?;
        if tick.step == 0 {
            info!(
                steps = self.clock.total(),
                timestep_s = self.config.timestep_s,
                start_hour = self.config.start_hour,
                loads = self.loads.len(),
                faults = self.faults.len(),
                "simulation started"
            );
        }

        self.solar
            .set_irradiance(self.config.irradiance.irradiance_at(tick.hour_of_day));
        let active_faults = self
            .faults
            .apply(tick.elapsed_s, &mut self.solar, &mut self.loads);

        let timestep_s = self.config.timestep_secs_f64();
        let decision =
            self.controller
                .decide(&self.solar, &self.battery, &mut self.loads, timestep_s);

        if decision.power_to_battery > 0.0 {
            self.battery.charge(decision.power_to_battery, timestep_s);
        } else if decision.power_from_battery > 0.0 {
            self.battery.discharge(decision.power_from_battery, timestep_s);
        }

        let record = StepRecord {
            step: tick.step,
            timestamp_s: tick.elapsed_s,
            hour_of_day: tick.hour_of_day,
            irradiance: self.solar.irradiance(),
            solar_output_w: self.solar.current_output(),
            battery_soc: self.battery.state_of_charge(),
            battery_charge_wh: self.battery.charge_wh(),
            power_from_solar: decision.power_from_solar,
            power_from_battery: decision.power_from_battery,
            power_to_battery: decision.power_to_battery,
            total_demand: decision.total_demand,
            total_available: decision.total_available,
            active_load_names: decision.active_loads,
            shed_load_names: decision.shed_loads,
            active_faults,
            decision_trace: decision.trace,
            reserve_mode: decision.reserve_mode,
        };

        let hour = tick.elapsed_s / 3600;
        if self.last_logged_hour != Some(hour) {
            self.last_logged_hour = Some(hour);
            info!(
                hour,
                hour_of_day = record.hour_of_day,
                solar_w = record.solar_output_w,
                soc = record.battery_soc,
                demand_w = record.total_demand,
                active = record.num_active(),
                shed = record.num_shed(),
                "progress"
            );
        }

        self.history.push(record);

        if self.clock.is_finished() {
            info!(
                steps = self.history.len(),
                final_soc = self.battery.state_of_charge(),
                "simulation finished"
            );
        }

        self.history.last()
    }

    /// Runs every remaining tick and returns the full history.
    pub fn run(&mut self) -> &[StepRecord] {
        while self.step().is_some() {}
        &self.history
    }

    /// Run-level summary of the history so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(&self.history, self.config.timestep_secs_f64(), &self.loads)
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn settings(&self) -> &ControllerSettings {
        self.controller.settings()
    }

    pub fn controller(&self) -> &PowerController {
        &self.controller
    }

    pub fn solar(&self) -> &SolarSource {
        &self.solar
    }

    pub fn battery(&self) -> &BatteryStore {
        &self.battery
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn faults(&self) -> &FaultSchedule {
        &self.faults
    }

    /// Step records appended so far, in time order.
    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }
}
