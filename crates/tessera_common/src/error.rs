//! The error taxonomy of the multiplier generator.
//!
//! Every fatal condition aborts the whole multiplier construction call. The
//! messages carry the operand widths, the tiling method and the failing
//! invariant so that a failing run can be reproduced from the message alone.
//! Advisory conditions (an underutilized DSP block, an ILP timeout that still
//! produced an incumbent) are never errors; they go to the diagnostic sink.

/// The standard result type for fallible generator operations.
pub type TesseraResult<T> = Result<T, TesseraError>;

/// A fatal error raised while constructing a multiplier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TesseraError {
    /// The requested parameters cannot describe a valid multiplier
    /// (non-positive widths, output wider than the product, unknown method).
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// Every tile family was disabled for a non-empty product grid.
    #[error("no tiles available for a {wx}x{wy} multiplier: every tile family is disabled")]
    NoTilesAvailable {
        /// Width of the X operand.
        wx: u32,
        /// Width of the Y operand.
        wy: u32,
    },

    /// The ILP tiling stayed infeasible after every allowed relaxation.
    #[error(
        "tiling infeasible: method {method} for {wx}x{wy} -> {w_out} bits found no solution after {attempts} attempt(s)"
    )]
    TilingInfeasible {
        /// Name of the tiling method that failed.
        method: String,
        /// Width of the X operand.
        wx: u32,
        /// Width of the Y operand.
        wy: u32,
        /// Requested output width.
        w_out: u32,
        /// Number of solve attempts, including relaxations.
        attempts: u32,
    },

    /// The realized tiling omits more partial-product weight than the error
    /// budget allows, so the result would not be faithfully rounded.
    #[error(
        "truncation budget exceeded for {wx}x{wy} -> {w_out} bits: omitted weight {omitted} > budget {budget}"
    )]
    TruncationBudgetExceeded {
        /// Total weight of the omitted partial products.
        omitted: u128,
        /// Error budget plus centering constant.
        budget: u128,
        /// Width of the X operand.
        wx: u32,
        /// Width of the Y operand.
        wy: u32,
        /// Requested output width.
        w_out: u32,
    },

    /// No compressor in the catalog can reduce a column that is still
    /// taller than the final adder accepts.
    #[error(
        "compressor catalog incomplete: stage {stage}, column {column} is stuck at height {height} (final adder takes {arity})"
    )]
    CompressorCatalogIncomplete {
        /// The compression stage that made no progress.
        stage: u32,
        /// The offending column weight.
        column: u32,
        /// The column height that could not be reduced.
        height: u32,
        /// The arity of the configured final adder.
        arity: u32,
    },

    /// An internal inconsistency (a bug in the generator, not a user error).
    #[error("internal generator error: {message}")]
    Internal {
        /// Description of the inconsistency.
        message: String,
    },
}

impl TesseraError {
    /// Creates a configuration error with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an internal error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for errors a caller may recover from by relaxing
    /// parameters and solving again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TilingInfeasible { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display() {
        let err = TesseraError::config("wx must be positive");
        assert_eq!(format!("{err}"), "configuration error: wx must be positive");
    }

    #[test]
    fn no_tiles_names_widths() {
        let err = TesseraError::NoTilesAvailable { wx: 8, wy: 12 };
        assert!(format!("{err}").contains("8x12"));
    }

    #[test]
    fn infeasible_is_recoverable() {
        let err = TesseraError::TilingInfeasible {
            method: "optimal-ilp".into(),
            wx: 16,
            wy: 16,
            w_out: 16,
            attempts: 3,
        };
        assert!(err.is_recoverable());
        let msg = format!("{err}");
        assert!(msg.contains("optimal-ilp"));
        assert!(msg.contains("3 attempt"));
    }

    #[test]
    fn budget_exceeded_is_fatal() {
        let err = TesseraError::TruncationBudgetExceeded {
            omitted: 300,
            budget: 224,
            wx: 8,
            wy: 8,
            w_out: 8,
        };
        assert!(!err.is_recoverable());
        assert!(format!("{err}").contains("omitted weight 300 > budget 224"));
    }

    #[test]
    fn catalog_incomplete_display() {
        let err = TesseraError::CompressorCatalogIncomplete {
            stage: 2,
            column: 7,
            height: 4,
            arity: 2,
        };
        assert_eq!(
            format!("{err}"),
            "compressor catalog incomplete: stage 2, column 7 is stuck at height 4 (final adder takes 2)"
        );
    }
}
