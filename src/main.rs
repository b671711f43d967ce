//! Micro-grid simulator entry point: CLI wiring and scenario-driven runs.

use std::path::Path;
use std::process;

use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::io::export::{export_csv, export_json};
use microgrid_sim::logging;
use tracing::warn;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    hours_override: Option<f64>,
    print_steps: bool,
    csv_out: Option<String>,
    json_out: Option<String>,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
    #[cfg(feature = "tui")]
    tui: bool,
}

fn print_help() {
    eprintln!("microgrid-sim: solar + battery micro-grid simulator with priority load shedding");
    eprintln!();
    eprintln!("Usage: microgrid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from a TOML or JSON file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --hours <f64>            Override simulated duration in hours");
    eprintln!("  --print-steps            Print one line per simulated step");
    eprintln!("  --csv-out <path>         Export step history to CSV");
    eprintln!("  --json-out <path>        Export step history to JSON");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after simulation");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    #[cfg(feature = "tui")]
    eprintln!("  --tui                    Run the scenario in the live terminal UI");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: {}).", logging::DEFAULT_FILTER);
}

/// Returns the value following flag `args[*i]`, exiting if it is missing.
fn next_value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        hours_override: None,
        print_steps: false,
        csv_out: None,
        json_out: None,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
        #[cfg(feature = "tui")]
        tui: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path = Some(next_value(&args, &mut i, "a path argument").to_string());
            }
            "--preset" => {
                cli.preset = Some(next_value(&args, &mut i, "a name argument").to_string());
            }
            "--hours" => {
                let raw = next_value(&args, &mut i, "an f64 argument");
                match raw.parse::<f64>() {
                    Ok(h) => cli.hours_override = Some(h),
                    Err(_) => {
                        eprintln!("error: --hours value \"{raw}\" is not a valid number");
                        process::exit(1);
                    }
                }
            }
            "--print-steps" => {
                cli.print_steps = true;
            }
            "--csv-out" => {
                cli.csv_out = Some(next_value(&args, &mut i, "a path argument").to_string());
            }
            "--json-out" => {
                cli.json_out = Some(next_value(&args, &mut i, "a path argument").to_string());
            }
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                let raw = next_value(&args, &mut i, "a u16 argument");
                if let Ok(p) = raw.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{raw}\" is not a valid u16");
                    process::exit(1);
                }
            }
            #[cfg(feature = "tui")]
            "--tui" => {
                cli.tui = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn load_scenario(cli: &CliArgs) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then baseline
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };

    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    if let Some(hours) = cli.hours_override {
        scenario.simulation.duration_hours = hours;
    }
    scenario
}

fn main() {
    let cli = parse_args();
    let scenario = load_scenario(&cli);

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // The TUI owns the terminal, so no log output while it runs
    #[cfg(feature = "tui")]
    if cli.tui {
        if let Err(e) = microgrid_sim::tui::run(scenario) {
            eprintln!("error: {e}");
            process::exit(1);
        }
        return;
    }

    if let Err(e) = logging::init() {
        eprintln!("warning: logging disabled: {e}");
    }

    let mut engine = scenario.build().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    println!("{}", scenario.info());
    engine.run();

    if cli.print_steps {
        for r in engine.history() {
            println!("{r}");
        }
    }

    let summary = engine.summary();
    println!("\n{summary}");

    if let Some(ref path) = cli.csv_out {
        if let Err(e) = export_csv(engine.history(), Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Step history written to {path}");
    }
    if let Some(ref path) = cli.json_out {
        if let Err(e) = export_json(engine.history(), Path::new(path)) {
            eprintln!("error: failed to write JSON: {e}");
            process::exit(1);
        }
        eprintln!("Step history written to {path}");
    }

    if summary.critical_uptime < 1.0 {
        warn!(
            uptime = summary.critical_uptime,
            "critical loads were shed during the run"
        );
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(microgrid_sim::api::AppState {
            scenario: scenario.info(),
            config: engine.config().clone(),
            summary,
            history: engine.history().to_vec(),
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(microgrid_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
