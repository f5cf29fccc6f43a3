use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration.
///
/// Rejects settings the transfer manager cannot run with: a zero port,
/// a missing Premiumize key, a zero poll interval or download cap, empty
/// directories, a scratch root overlapping the library target (it is
/// cleared on startup), and duplicate *arr names.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.premiumize.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "premiumize.api_key cannot be empty".to_string(),
        ));
    }

    let transfers = &config.transfers;
    if transfers.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "transfers.poll_interval_ms must be greater than 0".to_string(),
        ));
    }
    if transfers.simultaneous_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "transfers.simultaneous_downloads must be at least 1".to_string(),
        ));
    }
    if transfers.downloads_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "transfers.downloads_dir cannot be empty".to_string(),
        ));
    }
    if transfers.unzip_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "transfers.unzip_dir cannot be empty".to_string(),
        ));
    }
    if transfers.scratch_overlaps_library() {
        return Err(ConfigError::ValidationError(
            "transfers.unzip_dir and transfers.downloads_dir must not contain each other"
                .to_string(),
        ));
    }

    let mut names = HashSet::new();
    for arr in &config.arrs {
        if !names.insert(arr.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate arr name: {}",
                arr.name
            )));
        }
    }

    Ok(())
}
