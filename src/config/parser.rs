use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable that overrides `discovery.api-key`
pub const PLACES_KEY_ENV: &str = "PROSPECTOR_PLACES_API_KEY";

/// Environment variable that overrides `profiling.api-key`
pub const PAGESPEED_KEY_ENV: &str = "PROSPECTOR_PAGESPEED_API_KEY";

/// Loads and parses a configuration file from the given path
///
/// API keys found in the environment replace the ones in the file. This is
/// the only place the process environment is consulted.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_overrides(&mut config, |name| std::env::var(name).ok());

    validate(&config)?;

    Ok(config)
}

/// Replaces secrets in `config` with values produced by `lookup`
fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(PLACES_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        config.discovery.api_key = key;
    }

    if let Some(key) = lookup(PAGESPEED_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        config.profiling.api_key = Some(key);
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a campaign can be traced back to the configuration
/// that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
