//! Shared foundational types used across the tessera multiplier generator.
//!
//! This crate provides the error taxonomy every engine stage reports through,
//! clock frequency values, content hashing for deterministic operator naming,
//! and the opaque ID newtypes used by the bit heap and the tiling engine.

#![warn(missing_docs)]

pub mod error;
pub mod frequency;
pub mod hash;
pub mod ids;

pub use error::{TesseraError, TesseraResult};
pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::ContentHash;
pub use ids::{BitId, CompressorId, PlacementId};
