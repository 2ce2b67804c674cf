use std::path::PathBuf;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{Error, SimConfig};

const LASERSIM_CONFIG_ENV_NAME: &str = "LASERSIM_CONFIG_PATH";

/// Get simulation config from input or env LASERSIM_CONFIG_PATH
pub fn get_apps_sim_config(config: Option<PathBuf>) -> Option<PathBuf> {
    if config.is_some() {
        config
    } else {
        std::env::var(LASERSIM_CONFIG_ENV_NAME)
            .map(|s| {
                warn!("### ENV VAR {s} is used ###");
                PathBuf::from(s)
            })
            .ok()
    }
}

/// Loads the simulation config named by `config` or the environment, or the
/// default config if neither names one.
pub fn load_sim_config(config: Option<PathBuf>) -> Result<SimConfig, Error> {
    match get_apps_sim_config(config) {
        Some(path) => SimConfig::try_new(path),
        None => Ok(SimConfig::default()),
    }
}

/// Installs the global subscriber. Verbosity is taken from `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
