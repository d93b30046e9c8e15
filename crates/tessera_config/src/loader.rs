//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::GeneratorConfig;
use std::path::Path;

/// The file name looked up by [`load_config`] inside a project directory.
pub const CONFIG_FILE_NAME: &str = "tessera.toml";

/// Loads and validates a `tessera.toml` configuration.
///
/// `path` may name the file itself or a directory containing
/// `tessera.toml`.
pub fn load_config(path: &Path) -> Result<GeneratorConfig, ConfigError> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `tessera.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<GeneratorConfig, ConfigError> {
    let config: GeneratorConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks the fields that must be present before parameters can be resolved.
fn validate_config(config: &GeneratorConfig) -> Result<(), ConfigError> {
    if config.multiplier.wx == 0 {
        return Err(ConfigError::ValidationError(
            "multiplier.wx must be positive".to_string(),
        ));
    }
    if config.multiplier.wy == 0 {
        return Err(ConfigError::ValidationError(
            "multiplier.wy must be positive".to_string(),
        ));
    }
    if config.target.family.is_empty() {
        return Err(ConfigError::ValidationError(
            "target.family must not be empty".to_string(),
        ));
    }
    Ok(())
}
