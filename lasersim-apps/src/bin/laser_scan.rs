use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use lasersim::UpdateOutcome;
use lasersim_apps::{
    utils::{init_tracing, load_sim_config},
    SimConfig, TickReport,
};
use serde_json::json;
use tracing::{info, warn};

/// Runs simulated laser range-finders in a grid world and prints their scans.
#[derive(Parser, Debug)]
#[clap(name = env!("CARGO_BIN_NAME"))]
struct LaserScanArgs {
    /// Path to the simulation config file.
    #[clap(short, long, value_parser)]
    config_path: Option<PathBuf>,
    /// Overrides the number of ticks in the config file.
    #[clap(long)]
    ticks: Option<u64>,
    /// How every published scan is printed.
    #[clap(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Prints the default setting as TOML.
    #[clap(long)]
    show_default_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per scan, ranges in meters.
    Json,
    /// The fixed-size data frame, hex encoded.
    Wire,
    /// Only log a summary.
    Quiet,
}

fn print_report(report: &TickReport<'_>, format: OutputFormat) -> Result<()> {
    for (sensor, result) in report.sensors.iter().zip(&report.results) {
        match result {
            Ok(UpdateOutcome::Published { .. }) => {}
            Ok(_) => continue,
            Err(e) => {
                warn!(name = sensor.name(), tick = report.tick, "{e}");
                continue;
            }
        }
        let Some(scan) = sensor.latest() else {
            continue;
        };
        match format {
            OutputFormat::Json => {
                let ranges: Vec<f64> = scan.samples().iter().map(|s| s.range).collect();
                let reflectant: Vec<bool> =
                    scan.samples().iter().map(|s| s.reflectant).collect();
                let line = json!({
                    "name": sensor.name(),
                    "tick": report.tick,
                    "timestamp": scan.timestamp(),
                    "config": scan.config().to_request(),
                    "ranges": ranges,
                    "reflectant": reflectant,
                });
                println!("{line}");
            }
            OutputFormat::Wire => {
                let frame = scan.encode()?;
                let hex: String = frame.iter().map(|b| format!("{b:02x}")).collect();
                println!("{} {hex}", sensor.name());
            }
            OutputFormat::Quiet => {
                info!(
                    name = sensor.name(),
                    tick = report.tick,
                    samples = scan.len(),
                    "scan published"
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = LaserScanArgs::parse();
    info!("ParsedArgs {:?}", args);

    if args.show_default_config {
        print!("{}", toml::to_string(&SimConfig::default())?);
        return Ok(());
    }

    let mut config = load_sim_config(args.config_path)?;
    if let Some(ticks) = args.ticks {
        config.ticks = ticks;
    }

    let mut output = Ok(());
    config.run(|report| {
        if output.is_ok() {
            output = print_report(&report, args.format);
        }
    })?;
    output
}
