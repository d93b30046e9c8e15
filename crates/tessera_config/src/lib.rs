//! Parsing and validation of `tessera.toml` generator configuration files.
//!
//! This crate reads the configuration file (or accepts a programmatically
//! built [`GeneratorConfig`]) and resolves it into validated
//! [`MultiplierParams`]: operand and output widths, target selection, tile
//! family flags, tiling method, ILP and compression settings.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{
    resolve_params, CompressionOptions, IlpOptions, MultiplierParams, TargetSpec, TileFamilies,
    TilingOptions, MAX_OPERAND_WIDTH,
};
pub use types::*;
