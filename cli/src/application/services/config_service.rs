//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{CliConfig, VALID_CONFIG_KEYS};

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the stored file exists but cannot be parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<CliConfig> {
    store.load()
}

/// Set one key and persist the result. Returns the updated configuration.
///
/// # Errors
///
/// Returns an error if the key or value is invalid, or the file cannot be
/// written. Nothing is written on validation failure.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<CliConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}

/// Every known key with its current value, in display order.
#[must_use]
pub fn entries(config: &CliConfig) -> Vec<(&'static str, String)> {
    VALID_CONFIG_KEYS
        .iter()
        .filter_map(|key| config.get(key).map(|v| (*key, v)))
        .collect()
}
