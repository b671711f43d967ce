//! Post-hoc run summary computed from the step history.

use std::fmt;

use serde::Serialize;

use crate::devices::battery::SECONDS_PER_HOUR;
use crate::devices::{Load, Priority};

use super::types::StepRecord;

/// Shed counter of one load at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadShedCount {
    pub name: String,
    pub priority: Priority,
    pub shed_count: u32,
}

/// Aggregate figures for a complete or partial run.
///
/// Computed from `&[StepRecord]` so the report always agrees with the
/// exported step data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Number of ticks summarised.
    pub ticks: usize,
    /// Simulated hours covered.
    pub duration_hours: f64,
    /// Solar energy produced, whether used or not (Wh).
    pub solar_generated_wh: f64,
    /// Solar energy delivered directly to loads (Wh).
    pub solar_delivered_wh: f64,
    /// Energy sent into the battery (Wh).
    pub battery_charged_wh: f64,
    /// Energy drawn from the battery for loads (Wh).
    pub battery_discharged_wh: f64,
    /// Energy consumed by active loads (Wh).
    pub demand_wh: f64,
    pub soc_min: f64,
    pub soc_avg: f64,
    pub soc_max: f64,
    pub soc_final: f64,
    /// Ticks in which at least one load was off.
    pub ticks_with_shedding: usize,
    /// `ticks_with_shedding / ticks`.
    pub shedding_fraction: f64,
    /// Fraction of ticks with every critical load on; 1.0 without critical loads.
    pub critical_uptime: f64,
    /// Ticks spent in reserve mode.
    pub reserve_mode_ticks: usize,
    /// Per-load shed counters, in collection order.
    pub shed_counts: Vec<LoadShedCount>,
}

impl RunSummary {
    /// Computes the summary from the step history.
    ///
    /// # Arguments
    ///
    /// * `records` - Step history
    /// * `timestep_s` - Tick length in seconds
    /// * `loads` - Loads as they stand at the end of the history
    pub fn from_records(records: &[StepRecord], timestep_s: f64, loads: &[Load]) -> Self {
        let shed_counts = loads
            .iter()
            .map(|l| LoadShedCount {
                name: l.name().to_string(),
                priority: l.priority(),
                shed_count: l.shed_count(),
            })
            .collect();

        let Some(last) = records.last() else {
            return Self {
                ticks: 0,
                duration_hours: 0.0,
                solar_generated_wh: 0.0,
                solar_delivered_wh: 0.0,
                battery_charged_wh: 0.0,
                battery_discharged_wh: 0.0,
                demand_wh: 0.0,
                soc_min: 0.0,
                soc_avg: 0.0,
                soc_max: 0.0,
                soc_final: 0.0,
                ticks_with_shedding: 0,
                shedding_fraction: 0.0,
                critical_uptime: 1.0,
                reserve_mode_ticks: 0,
                shed_counts,
            };
        };

        let critical: Vec<&str> = loads
            .iter()
            .filter(|l| l.priority() == Priority::Critical)
            .map(Load::name)
            .collect();

        let dt_h = timestep_s / SECONDS_PER_HOUR;
        let n = records.len();

        let mut solar_generated = 0.0;
        let mut solar_delivered = 0.0;
        let mut charged = 0.0;
        let mut discharged = 0.0;
        let mut demand = 0.0;
        let mut soc_min = f64::INFINITY;
        let mut soc_max = f64::NEG_INFINITY;
        let mut soc_sum = 0.0;
        let mut shedding = 0_usize;
        let mut critical_up = 0_usize;
        let mut reserve = 0_usize;

        for r in records {
            solar_generated += r.solar_output_w * dt_h;
            solar_delivered += r.power_from_solar * dt_h;
            charged += r.power_to_battery * dt_h;
            discharged += r.power_from_battery * dt_h;
            demand += r.total_demand * dt_h;

            soc_min = soc_min.min(r.battery_soc);
            soc_max = soc_max.max(r.battery_soc);
            soc_sum += r.battery_soc;

            if r.num_shed() > 0 {
                shedding += 1;
            }
            if critical
                .iter()
                .all(|name| r.active_load_names.iter().any(|a| a == name))
            {
                critical_up += 1;
            }
            if r.reserve_mode {
                reserve += 1;
            }
        }

        Self {
            ticks: n,
            duration_hours: n as f64 * dt_h,
            solar_generated_wh: solar_generated,
            solar_delivered_wh: solar_delivered,
            battery_charged_wh: charged,
            battery_discharged_wh: discharged,
            demand_wh: demand,
            soc_min,
            soc_avg: soc_sum / n as f64,
            soc_max,
            soc_final: last.battery_soc,
            ticks_with_shedding: shedding,
            shedding_fraction: shedding as f64 / n as f64,
            critical_uptime: critical_up as f64 / n as f64,
            reserve_mode_ticks: reserve,
            shed_counts,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Simulation Summary ---")?;
        writeln!(
            f,
            "Duration:              {:.1} h ({} ticks)",
            self.duration_hours, self.ticks
        )?;
        writeln!(f, "Solar generated:       {:.1} Wh", self.solar_generated_wh)?;
        writeln!(f, "Solar to loads:        {:.1} Wh", self.solar_delivered_wh)?;
        writeln!(f, "Battery charged:       {:.1} Wh", self.battery_charged_wh)?;
        writeln!(f, "Battery discharged:    {:.1} Wh", self.battery_discharged_wh)?;
        writeln!(f, "Demand served:         {:.1} Wh", self.demand_wh)?;
        writeln!(
            f,
            "Battery SOC:           min {:.1}%  avg {:.1}%  max {:.1}%  final {:.1}%",
            self.soc_min * 100.0,
            self.soc_avg * 100.0,
            self.soc_max * 100.0,
            self.soc_final * 100.0
        )?;
        writeln!(
            f,
            "Critical load uptime:  {:.1}%",
            self.critical_uptime * 100.0
        )?;
        writeln!(f, "Reserve mode ticks:    {}", self.reserve_mode_ticks)?;
        write!(
            f,
            "Ticks with shedding:   {} ({:.1}%)",
            self.ticks_with_shedding,
            self.shedding_fraction * 100.0
        )?;
        for c in &self.shed_counts {
            write!(
                f,
                "\n  {:<24} {:<10} shed {} time(s)",
                c.name,
                c.priority.label(),
                c.shed_count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(soc: f64, solar: f64, demand: f64, active: &[&str], shed: &[&str]) -> StepRecord {
        StepRecord {
            step: 0,
            timestamp_s: 0,
            hour_of_day: 0.0,
            irradiance: 0.0,
            solar_output_w: solar,
            battery_soc: soc,
            battery_charge_wh: soc * 1000.0,
            power_from_solar: solar.min(demand),
            power_from_battery: (demand - solar).max(0.0),
            power_to_battery: 0.0,
            total_demand: demand,
            total_available: solar,
            active_load_names: active.iter().map(|s| s.to_string()).collect(),
            shed_load_names: shed.iter().map(|s| s.to_string()).collect(),
            active_faults: vec![],
            decision_trace: vec![],
            reserve_mode: soc <= 0.2,
        }
    }

    fn loads() -> Vec<Load> {
        vec![
            Load::new("Fridge", 100.0, Priority::Critical).unwrap(),
            Load::new("Pump", 300.0, Priority::Deferrable).unwrap(),
        ]
    }

    #[test]
    fn energy_totals_use_timestep() {
        let records = vec![
            record(0.5, 400.0, 400.0, &["Fridge", "Pump"], &[]),
            record(0.4, 0.0, 400.0, &["Fridge", "Pump"], &[]),
        ];
        // 30 minute ticks
        let s = RunSummary::from_records(&records, 1800.0, &loads());
        assert_eq!(s.ticks, 2);
        assert_eq!(s.duration_hours, 1.0);
        assert_eq!(s.solar_generated_wh, 200.0);
        assert_eq!(s.battery_discharged_wh, 200.0);
        assert_eq!(s.demand_wh, 400.0);
    }

    #[test]
    fn soc_stats_and_shedding() {
        let records = vec![
            record(0.5, 0.0, 400.0, &["Fridge", "Pump"], &[]),
            record(0.2, 0.0, 100.0, &["Fridge"], &["Pump"]),
            record(0.3, 0.0, 0.0, &[], &["Fridge", "Pump"]),
            record(0.6, 0.0, 400.0, &["Fridge", "Pump"], &[]),
        ];
        let s = RunSummary::from_records(&records, 60.0, &loads());
        assert_eq!(s.soc_min, 0.2);
        assert_eq!(s.soc_max, 0.6);
        assert_eq!(s.soc_final, 0.6);
        assert!((s.soc_avg - 0.4).abs() < 1e-12);
        assert_eq!(s.ticks_with_shedding, 2);
        assert_eq!(s.shedding_fraction, 0.5);
        assert_eq!(s.critical_uptime, 0.75);
        assert_eq!(s.reserve_mode_ticks, 1);
    }

    #[test]
    fn empty_history() {
        let s = RunSummary::from_records(&[], 60.0, &loads());
        assert_eq!(s.ticks, 0);
        assert_eq!(s.critical_uptime, 1.0);
        assert_eq!(s.shed_counts.len(), 2);
    }

    #[test]
    fn display_lists_loads() {
        let mut l = loads();
        l[1].deactivate();
        let s = RunSummary::from_records(&[record(0.5, 0.0, 100.0, &["Fridge"], &["Pump"])], 60.0, &l);
        let text = s.to_string();
        assert!(text.contains("Ticks with shedding:   1 (100.0%)"));
        assert!(text.contains("Pump"));
        assert!(text.contains("shed 1 time(s)"));
    }
}
