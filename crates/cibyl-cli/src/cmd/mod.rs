pub mod config;
pub mod query;

use anyhow::Context;
use cibyl_core::config::Config;
use tracing::debug;

/// Load the configuration from `--config` or the default locations.
pub fn load_config(location: Option<&str>) -> anyhow::Result<Config> {
    let (config, source) = Config::discover(location).context("failed to load configuration")?;
    debug!("configuration read from {source}");
    Ok(config)
}
