//! CSV and JSON export for simulation step records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepRecord;

/// Column header for CSV export.
const HEADER: &str = "step,timestamp_s,hour_of_day,irradiance,solar_output_w,\
                      battery_soc,battery_charge_wh,power_from_solar,power_from_battery,\
                      power_to_battery,total_demand,total_available,num_active_loads,\
                      num_shed_loads,active_loads,shed_loads,active_faults,reserve_mode,\
                      decision_trace";

/// Exports step records to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[StepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(records, io::BufWriter::new(file))
}

/// Writes step records as CSV to any writer.
///
/// Name lists and fault descriptions are joined with `;`; the decision
/// trace is rendered as one ` | `-separated field. Output is deterministic
/// for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[StepRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.step.to_string(),
            r.timestamp_s.to_string(),
            format!("{:.4}", r.hour_of_day),
            format!("{:.4}", r.irradiance),
            format!("{:.2}", r.solar_output_w),
            format!("{:.4}", r.battery_soc),
            format!("{:.2}", r.battery_charge_wh),
            format!("{:.2}", r.power_from_solar),
            format!("{:.2}", r.power_from_battery),
            format!("{:.2}", r.power_to_battery),
            format!("{:.2}", r.total_demand),
            format!("{:.2}", r.total_available),
            r.num_active().to_string(),
            r.num_shed().to_string(),
            r.active_load_names.join(";"),
            r.shed_load_names.join(";"),
            r.fault_descriptions().join(";"),
            r.reserve_mode.to_string(),
            r.trace_line(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports step records to a JSON file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation, serialization, or writing fails.
pub fn export_json(records: &[StepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_json(records, io::BufWriter::new(file))
}

/// Writes step records as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an `io::Error` if serialization or writing fails.
pub fn write_json(records: &[StepRecord], mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()
}
