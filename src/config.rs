//! Scenario configuration (TOML or JSON) and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::devices::{BatteryStore, IrradianceProfile, Load, Priority, SolarSource};
use crate::error::ConfigError;
use crate::sim::fault::{FaultEvent, FaultSchedule, hours_to_seconds};
use crate::sim::{ControllerSettings, SimConfig, SimulationEngine};

/// Top-level scenario configuration.
///
/// Solar and battery sections are required; everything else falls back to
/// defaults. Load from a file with [`ScenarioConfig::from_file`] or use one
/// of the built-in [`ScenarioConfig::PRESETS`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario name shown in reports.
    #[serde(default = "default_name")]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Simulation timing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Controller thresholds.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Solar array parameters.
    pub solar: SolarConfig,
    /// Battery parameters.
    pub battery: BatteryConfig,
    /// Loads in collection order.
    #[serde(default)]
    pub loads: Vec<LoadConfig>,
    /// Scheduled faults.
    #[serde(default)]
    pub faults: Vec<FaultConfig>,
}

fn default_name() -> String {
    "Unnamed scenario".to_string()
}

/// Simulation timing parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Tick length in seconds (must be > 0).
    pub timestep_s: u64,
    /// Hour of day at the first tick.
    pub start_hour: f64,
    /// Simulated duration in hours.
    pub duration_hours: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep_s: 60,
            start_hour: 0.0,
            duration_hours: 24.0,
        }
    }
}

/// Controller thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// SOC at or below which only critical loads may use the battery.
    pub critical_reserve_soc: f64,
    /// Restore margin above available power.
    pub hysteresis_margin: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let s = ControllerSettings::default();
        Self {
            critical_reserve_soc: s.critical_reserve_soc,
            hysteresis_margin: s.hysteresis_margin,
        }
    }
}

/// How the base irradiance is produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Time-of-day curve.
    #[default]
    Daylight,
    /// Fixed at `constant_irradiance`.
    Constant,
}

/// Solar array parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SolarConfig {
    /// Rated output (W).
    pub max_output_w: f64,
    /// Panel efficiency (0.0-1.0).
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,
    /// Irradiance profile.
    #[serde(default)]
    pub profile: ProfileKind,
    /// Irradiance used by the constant profile.
    #[serde(default = "default_constant_irradiance")]
    pub constant_irradiance: f64,
}

fn default_efficiency() -> f64 {
    0.20
}

fn default_constant_irradiance() -> f64 {
    1.0
}

impl SolarConfig {
    /// Builds the solar source.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` under `solar.` for out-of-range values.
    pub fn build(&self) -> Result<SolarSource, ConfigError> {
        SolarSource::new(self.max_output_w, self.efficiency).map_err(|e| e.within("solar"))
    }

    /// Irradiance profile selected by this section.
    pub fn irradiance_profile(&self) -> IrradianceProfile {
        match self.profile {
            ProfileKind::Daylight => IrradianceProfile::Daylight,
            ProfileKind::Constant => IrradianceProfile::Constant(self.constant_irradiance),
        }
    }
}

/// Battery parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryConfig {
    /// Capacity (Wh).
    pub capacity_wh: f64,
    /// Stored energy at the start (Wh).
    pub initial_charge_wh: f64,
    /// Charge power limit (W).
    pub max_charge_rate_w: f64,
    /// Discharge power limit (W).
    pub max_discharge_rate_w: f64,
    /// Lower SOC bound.
    #[serde(default)]
    pub min_soc: f64,
    /// Upper SOC bound.
    #[serde(default = "default_max_soc")]
    pub max_soc: f64,
}

fn default_max_soc() -> f64 {
    1.0
}

impl BatteryConfig {
    /// Builds the battery store.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` under `battery.` for out-of-range values.
    pub fn build(&self) -> Result<BatteryStore, ConfigError> {
        BatteryStore::with_soc_limits(
            self.capacity_wh,
            self.initial_charge_wh,
            self.max_charge_rate_w,
            self.max_discharge_rate_w,
            self.min_soc,
            self.max_soc,
        )
        .map_err(|e| e.within("battery"))
    }
}

/// One load.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    pub name: String,
    pub power_draw_w: f64,
    /// 0 = critical, 1 = high, 2 = deferrable.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    2
}

impl LoadConfig {
    fn new(name: &str, power_draw_w: f64, priority: Priority) -> Self {
        Self {
            name: name.to_string(),
            power_draw_w,
            priority: priority.rank(),
        }
    }

    /// Builds the load; `index` is its position in the list for error paths.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` under `loads[index].` for invalid values.
    pub fn build(&self, index: usize) -> Result<Load, ConfigError> {
        let prefix = format!("loads[{index}]");
        let priority = Priority::try_from(self.priority).map_err(|e| e.within(&prefix))?;
        Load::new(&self.name, self.power_draw_w, priority).map_err(|e| e.within(&prefix))
    }
}

/// One scheduled fault, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum FaultConfig {
    CloudCover {
        start_hour: f64,
        duration_hours: f64,
        #[serde(default = "default_reduction")]
        reduction_factor: f64,
    },
    LoadSpike {
        start_hour: f64,
        duration_hours: f64,
        load_name: String,
        spike_power_w: f64,
    },
    PanelFailure {
        start_hour: f64,
        #[serde(default = "default_degradation")]
        degradation: f64,
    },
}

fn default_reduction() -> f64 {
    0.7
}

fn default_degradation() -> f64 {
    0.5
}

impl FaultConfig {
    /// Converts hour offsets to a fault event.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` under `faults[index].` for negative offsets,
    /// empty windows or out-of-range magnitudes.
    pub fn to_event(&self, index: usize) -> Result<FaultEvent, ConfigError> {
        let prefix = format!("faults[{index}]");
        let start_hour = match self {
            Self::CloudCover { start_hour, .. }
            | Self::LoadSpike { start_hour, .. }
            | Self::PanelFailure { start_hour, .. } => *start_hour,
        };
        let start_s = hours_to_seconds("start_hour", start_hour).map_err(|e| e.within(&prefix))?;
        let window_end = |duration_hours: f64| -> Result<u64, ConfigError> {
            if !duration_hours.is_finite() || duration_hours <= 0.0 {
                return Err(ConfigError::new("duration_hours", "must be > 0").within(&prefix));
            }
            hours_to_seconds("duration_hours", duration_hours)
                .and_then(|d| {
                    start_s.checked_add(d).ok_or_else(|| {
                        ConfigError::new("duration_hours", "window end overflows the clock")
                    })
                })
                .map_err(|e| e.within(&prefix))
        };

        let event = match self {
            Self::CloudCover {
                duration_hours,
                reduction_factor,
                ..
            } => FaultEvent::cloud_cover(start_s, window_end(*duration_hours)?, *reduction_factor),
            Self::LoadSpike {
                duration_hours,
                load_name,
                spike_power_w,
                ..
            } => FaultEvent::load_spike(
                start_s,
                window_end(*duration_hours)?,
                load_name.as_str(),
                *spike_power_w,
            ),
            Self::PanelFailure { degradation, .. } => {
                FaultEvent::panel_failure(start_s, *degradation)
            }
        };
        event.map_err(|e| e.within(&prefix))
    }
}

/// Scenario metadata, available without building an engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    pub solar_capacity_w: f64,
    pub battery_capacity_wh: f64,
    pub num_loads: usize,
    pub duration_hours: f64,
    pub has_faults: bool,
}

impl fmt::Display for ScenarioInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.name)?;
        if !self.description.is_empty() {
            writeln!(f, "  {}", self.description)?;
        }
        write!(
            f,
            "  solar {:.0} W | battery {:.0} Wh | {} loads | {:.1} h | faults: {}",
            self.solar_capacity_w,
            self.battery_capacity_wh,
            self.num_loads,
            self.duration_hours,
            if self.has_faults { "yes" } else { "no" }
        )
    }
}

impl ScenarioConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "remote_clinic", "cloudy_week"];

    /// Small fault-free system: one day, daylight curve.
    pub fn baseline() -> Self {
        Self {
            name: "Baseline".to_string(),
            description: "Small solar home system over one fault-free day".to_string(),
            simulation: SimulationConfig::default(),
            controller: ControllerConfig::default(),
            solar: SolarConfig {
                max_output_w: 3000.0,
                efficiency: default_efficiency(),
                profile: ProfileKind::Daylight,
                constant_irradiance: default_constant_irradiance(),
            },
            battery: BatteryConfig {
                capacity_wh: 5000.0,
                initial_charge_wh: 2500.0,
                max_charge_rate_w: 1000.0,
                max_discharge_rate_w: 1000.0,
                min_soc: 0.0,
                max_soc: 1.0,
            },
            loads: vec![
                LoadConfig::new("Refrigerator", 150.0, Priority::Critical),
                LoadConfig::new("Lighting", 100.0, Priority::High),
                LoadConfig::new("Water pump", 300.0, Priority::Deferrable),
            ],
            faults: Vec::new(),
        }
    }

    /// Remote clinic over two days with cloud cover, a pump spike, and a
    /// panel failure on the second day.
    pub fn remote_clinic() -> Self {
        Self {
            name: "Remote Medical Clinic".to_string(),
            description: "Off-grid clinic keeping vaccines cold through weather and equipment faults"
                .to_string(),
            simulation: SimulationConfig {
                timestep_s: 60,
                start_hour: 0.0,
                duration_hours: 48.0,
            },
            controller: ControllerConfig::default(),
            solar: SolarConfig {
                max_output_w: 5000.0,
                efficiency: default_efficiency(),
                profile: ProfileKind::Daylight,
                constant_irradiance: default_constant_irradiance(),
            },
            battery: BatteryConfig {
                capacity_wh: 10_000.0,
                initial_charge_wh: 6000.0,
                max_charge_rate_w: 1500.0,
                max_discharge_rate_w: 1500.0,
                min_soc: 0.0,
                max_soc: 1.0,
            },
            loads: vec![
                LoadConfig::new("Vaccine refrigerator", 150.0, Priority::Critical),
                LoadConfig::new("Communications radio", 50.0, Priority::Critical),
                LoadConfig::new("Medical lighting", 120.0, Priority::High),
                LoadConfig::new("Staff laptop", 80.0, Priority::Deferrable),
                LoadConfig::new("Water pump", 500.0, Priority::Deferrable),
            ],
            faults: vec![
                FaultConfig::CloudCover {
                    start_hour: 10.0,
                    duration_hours: 3.0,
                    reduction_factor: 0.7,
                },
                FaultConfig::LoadSpike {
                    start_hour: 14.0,
                    duration_hours: 1.0,
                    load_name: "Water pump".to_string(),
                    spike_power_w: 300.0,
                },
                FaultConfig::PanelFailure {
                    start_hour: 30.0,
                    degradation: 0.25,
                },
            ],
        }
    }

    /// One overcast week at five-minute resolution.
    pub fn cloudy_week() -> Self {
        let clouds = [(30.0, 0.8), (54.0, 0.6), (78.0, 0.9), (102.0, 0.5)];
        let mut faults: Vec<FaultConfig> = clouds
            .iter()
            .map(|&(start_hour, reduction_factor)| FaultConfig::CloudCover {
                start_hour,
                duration_hours: 12.0,
                reduction_factor,
            })
            .collect();
        faults.push(FaultConfig::PanelFailure {
            start_hour: 120.0,
            degradation: 0.3,
        });

        Self {
            name: "Cloudy Week".to_string(),
            description: "Seven days with four overcast days and a late panel failure".to_string(),
            simulation: SimulationConfig {
                timestep_s: 300,
                start_hour: 0.0,
                duration_hours: 168.0,
            },
            controller: ControllerConfig::default(),
            solar: SolarConfig {
                max_output_w: 4000.0,
                efficiency: default_efficiency(),
                profile: ProfileKind::Daylight,
                constant_irradiance: default_constant_irradiance(),
            },
            battery: BatteryConfig {
                capacity_wh: 8000.0,
                initial_charge_wh: 4000.0,
                max_charge_rate_w: 1200.0,
                max_discharge_rate_w: 1200.0,
                min_soc: 0.05,
                max_soc: 0.95,
            },
            loads: vec![
                LoadConfig::new("Vaccine refrigerator", 150.0, Priority::Critical),
                LoadConfig::new("Lighting", 100.0, Priority::High),
                LoadConfig::new("Water pump", 400.0, Priority::Deferrable),
            ],
            faults,
        }
    }

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "remote_clinic" => Ok(Self::remote_clinic()),
            "cloudy_week" => Ok(Self::cloudy_week()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario file, choosing JSON for `.json` and TOML otherwise.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parses a scenario from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the JSON is invalid or contains unknown fields.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::new("json", e.to_string()))
    }

    /// Scenario metadata.
    pub fn info(&self) -> ScenarioInfo {
        ScenarioInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            solar_capacity_w: self.solar.max_output_w,
            battery_capacity_wh: self.battery.capacity_wh,
            num_loads: self.loads.len(),
            duration_hours: self.simulation.duration_hours,
            has_faults: !self.faults.is_empty(),
        }
    }

    /// Timing configuration including the irradiance profile.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` under `simulation.` or `solar.`.
    pub fn sim_config(&self) -> Result<SimConfig, ConfigError> {
        let s = &self.simulation;
        SimConfig::new(s.timestep_s, s.start_hour, s.duration_hours)
            .map_err(|e| e.within("simulation"))?
            .with_irradiance(self.solar.irradiance_profile())
            .map_err(|e| e.within("solar"))
    }

    /// Controller thresholds.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` under `controller.`.
    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        ControllerSettings::new(
            self.controller.critical_reserve_soc,
            self.controller.hysteresis_margin,
        )
        .map_err(|e| e.within("controller"))
    }

    /// Validates every section and returns all problems found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.sim_config() {
            errors.push(e);
        }
        if let Err(e) = self.controller_settings() {
            errors.push(e);
        }
        if let Err(e) = self.solar.build() {
            errors.push(e);
        }
        if let Err(e) = self.battery.build() {
            errors.push(e);
        }

        let mut loads = Vec::with_capacity(self.loads.len());
        for (i, cfg) in self.loads.iter().enumerate() {
            match cfg.build(i) {
                Ok(load) => {
                    if loads.iter().any(|l: &Load| l.name() == load.name()) {
                        errors.push(ConfigError::new(
                            format!("loads[{i}].name"),
                            format!("duplicate load name '{}'", load.name()),
                        ));
                    }
                    loads.push(load);
                }
                Err(e) => errors.push(e),
            }
        }

        let mut schedule = FaultSchedule::new();
        for (i, cfg) in self.faults.iter().enumerate() {
            let registered = cfg
                .to_event(i)
                .and_then(|event| {
                    schedule
                        .register(event, &loads)
                        .map_err(|e| e.within(&format!("faults[{i}]")))
                });
            if let Err(e) = registered {
                errors.push(e);
            }
        }

        errors
    }

    /// Builds a ready-to-run engine with all faults registered.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` encountered.
    pub fn build(&self) -> Result<SimulationEngine, ConfigError> {
        if self.loads.is_empty() {
            warn!(scenario = %self.name, "scenario defines no loads");
        }

        let loads = self
            .loads
            .iter()
            .enumerate()
            .map(|(i, l)| l.build(i))
            .collect::<Result<Vec<_>, _>>()?;

        let mut engine = SimulationEngine::new(
            self.sim_config()?,
            self.solar.build()?,
            self.battery.build()?,
            loads,
            self.controller_settings()?,
        )?;

        for (i, cfg) in self.faults.iter().enumerate() {
            engine
                .inject_fault(cfg.to_event(i)?)
                .map_err(|e| e.within(&format!("faults[{i}]")))?;
        }
        Ok(engine)
    }
}
