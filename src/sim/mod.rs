/// Simulation clock for timestep management.
pub mod clock;
pub mod controller;
pub mod engine;
/// Scheduled fault definitions and their lifecycle.
pub mod fault;
pub mod kpi;
pub mod power_balance;
/// Structured controller decision trace.
pub mod trace;
pub mod types;

pub use controller::{ControllerSettings, Decision, PowerController};
pub use engine::SimulationEngine;
pub use fault::{ActiveFault, FaultEvent, FaultKind, FaultSchedule};
pub use kpi::RunSummary;
pub use trace::DecisionEvent;
pub use types::{SimConfig, StepRecord};
