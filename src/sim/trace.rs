//! Structured audit trail of the controller's per-tick reasoning.
//!
//! Events carry their operands and only become text through `Display`, at
//! the reporting boundary. Nothing in the controller reads them back.

use std::fmt;

use serde::Serialize;

use crate::devices::Priority;

/// One branch taken by the controller during a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecisionEvent {
    /// Solar output read at the start of the decision.
    SolarOutput { watts: f64 },
    /// Sum of critical loads' configured draw, active or not.
    CriticalDemand { watts: f64 },
    /// Sum of active loads' draw before shedding or restoring.
    TotalDemand { watts: f64 },
    /// Battery SOC at or below the critical reserve.
    ReserveMode { soc: f64, reserve_soc: f64 },
    /// Battery discharge limited to the critical demand.
    BatteryReservedForCritical { ceiling_w: f64 },
    /// Solar plus usable battery power.
    TotalAvailable { watts: f64 },
    /// Demand exceeds supply; shedding begins.
    Shortfall { demand_w: f64, available_w: f64 },
    /// A load was shed.
    Shed {
        load: String,
        priority: Priority,
        draw_w: f64,
    },
    /// Every load is off and demand still exceeds supply.
    AllLoadsShed { available_w: f64 },
    /// Supply covers demand; shed loads are checked against this threshold.
    RestoreWindow { threshold_w: f64 },
    /// A previously shed load was restored.
    Restore {
        load: String,
        priority: Priority,
        draw_w: f64,
    },
    /// Excess solar routed into the battery.
    ChargeBattery { watts: f64 },
}

impl fmt::Display for DecisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SolarOutput { watts } => write!(f, "Solar output: {watts:.1}W"),
            Self::CriticalDemand { watts } => write!(f, "Critical load demand: {watts:.1}W"),
            Self::TotalDemand { watts } => write!(f, "Total demand: {watts:.1}W"),
            Self::ReserveMode { soc, reserve_soc } => write!(
                f,
                "Battery at {:.1}% (reserve {:.1}%) - RESERVE MODE",
                soc * 100.0,
                reserve_soc * 100.0
            ),
            Self::BatteryReservedForCritical { ceiling_w } => write!(
                f,
                "Battery reserved for critical loads only ({ceiling_w:.1}W)"
            ),
            Self::TotalAvailable { watts } => write!(f, "Total available power: {watts:.1}W"),
            Self::Shortfall {
                demand_w,
                available_w,
            } => write!(
                f,
                "Demand ({demand_w:.1}W) exceeds supply ({available_w:.1}W) - shedding loads"
            ),
            Self::Shed {
                load,
                priority,
                draw_w,
            } => write!(f, "SHED: {load} ({priority}, {draw_w:.1}W)"),
            Self::AllLoadsShed { available_w } => write!(
                f,
                "All loads shed; supply {available_w:.1}W still short"
            ),
            Self::RestoreWindow { threshold_w } => {
                write!(f, "Restore threshold: {threshold_w:.1}W")
            }
            Self::Restore {
                load,
                priority,
                draw_w,
            } => write!(f, "RESTORE: {load} ({priority}, {draw_w:.1}W)"),
            Self::ChargeBattery { watts } => {
                write!(f, "Charging battery with {watts:.1}W excess solar")
            }
        }
    }
}

/// Renders a trace as one line, entries separated by ` | `.
pub fn render(trace: &[DecisionEvent]) -> String {
    trace
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}
