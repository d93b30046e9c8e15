//! Error types for configuration loading and validation.

use tessera_common::TesseraError;

/// Errors that can occur when loading or validating a generator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A value names something that does not exist (a method, a family).
    #[error("unknown {kind} '{value}'")]
    Unknown {
        /// What kind of value was looked up.
        kind: &'static str,
        /// The unrecognized value.
        value: String,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for TesseraError {
    fn from(err: ConfigError) -> Self {
        TesseraError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown() {
        let err = ConfigError::Unknown {
            kind: "tiling method",
            value: "magic".into(),
        };
        assert_eq!(format!("{err}"), "unknown tiling method 'magic'");
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("wx must be in 1..=60".to_string());
        assert_eq!(format!("{err}"), "validation error: wx must be in 1..=60");
    }

    #[test]
    fn converts_to_configuration_error() {
        let err: TesseraError = ConfigError::ParseError("line 3".into()).into();
        assert!(matches!(err, TesseraError::Configuration { .. }));
        assert!(format!("{err}").contains("line 3"));
    }
}
