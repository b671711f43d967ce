//! Simulation runner and TUI application state.

use std::time::Instant;

use crate::config::ScenarioConfig;
use crate::error::ConfigError;
use crate::sim::{SimulationEngine, StepRecord};

/// Maximum number of steps shown in the rolling chart.
pub const MAX_HISTORY: usize = 200;

/// Tick interval options in milliseconds (slowest → fastest).
const SPEED_LEVELS_MS: [u64; 6] = [500, 250, 100, 50, 20, 5];

/// Default speed index (100 ms).
const DEFAULT_SPEED_IDX: usize = 2;

/// TUI application state.
pub struct App {
    engine: SimulationEngine,
    /// Scenario kept for restart.
    scenario: ScenarioConfig,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Current index into `SPEED_LEVELS_MS`.
    pub speed_idx: usize,
    /// Whether the user has requested quit.
    pub quit: bool,
    /// When the last simulation tick was executed.
    pub last_tick: Instant,
}

impl App {
    /// Creates a new app for a scenario.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the scenario does not build.
    pub fn new(scenario: ScenarioConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: scenario.build()?,
            scenario,
            paused: false,
            speed_idx: DEFAULT_SPEED_IDX,
            quit: false,
            last_tick: Instant::now(),
        })
    }

    /// Creates a new app from a preset name.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset is unknown.
    pub fn from_preset(preset: &str) -> Result<Self, ConfigError> {
        Self::new(ScenarioConfig::from_preset(preset)?)
    }

    /// Advances the simulation by one step if not finished.
    pub fn tick(&mut self) {
        self.engine.step();
    }

    /// Toggles pause/resume.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Increases simulation speed (shorter tick interval).
    pub fn speed_up(&mut self) {
        if self.speed_idx + 1 < SPEED_LEVELS_MS.len() {
            self.speed_idx += 1;
        }
    }

    /// Decreases simulation speed (longer tick interval).
    pub fn speed_down(&mut self) {
        if self.speed_idx > 0 {
            self.speed_idx -= 1;
        }
    }

    /// Returns the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        SPEED_LEVELS_MS[self.speed_idx]
    }

    /// Switches to a different preset, resetting simulation state.
    ///
    /// Unknown presets leave the current run untouched.
    pub fn switch_preset(&mut self, name: &str) {
        let Ok(scenario) = ScenarioConfig::from_preset(name) else {
            return;
        };
        self.load(scenario);
    }

    /// Restarts the current scenario from the beginning.
    pub fn restart(&mut self) {
        self.load(self.scenario.clone());
    }

    fn load(&mut self, scenario: ScenarioConfig) {
        if let Ok(engine) = scenario.build() {
            self.engine = engine;
            self.scenario = scenario;
            self.paused = false;
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    /// Scenario display name.
    pub fn scenario_name(&self) -> &str {
        &self.scenario.name
    }

    /// Number of steps executed so far.
    pub fn completed_steps(&self) -> usize {
        self.engine.history().len()
    }

    pub fn total_steps(&self) -> usize {
        self.engine.config().total_steps()
    }

    /// Up to [`MAX_HISTORY`] most recent records.
    pub fn recent(&self) -> &[StepRecord] {
        let history = self.engine.history();
        &history[history.len().saturating_sub(MAX_HISTORY)..]
    }

    /// Current battery SOC.
    pub fn battery_soc(&self) -> f64 {
        self.engine.battery().state_of_charge()
    }

    /// Reserve threshold of the controller.
    pub fn reserve_soc(&self) -> f64 {
        self.engine.settings().critical_reserve_soc
    }

    /// Returns `true` when all steps have been executed.
    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    /// Returns the most recent step record, if any.
    pub fn last_record(&self) -> Option<&StepRecord> {
        self.engine.history().last()
    }
}
