use clap::{Parser, ValueEnum};
use schemars::schema_for;
use tracing::debug;

#[derive(Debug, Parser)]
#[clap(name = env!("CARGO_BIN_NAME"))]
struct Args {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Generate JSON schema for the specified config file.
    Schema {
        /// Kind of config file.
        #[clap(value_enum, ignore_case = true)]
        kind: ConfigKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigKind {
    SimConfig,
    LaserSensorConfig,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    debug!(?args);

    match args.subcommand {
        Subcommand::Schema { kind } => {
            let schema = match kind {
                ConfigKind::SimConfig => schema_for!(lasersim_apps::SimConfig),
                ConfigKind::LaserSensorConfig => schema_for!(lasersim::LaserSensorConfig),
            };
            println!("{}", serde_json::to_string_pretty(&schema).unwrap());
        }
    }
}
