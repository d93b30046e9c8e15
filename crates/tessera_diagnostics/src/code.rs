//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Fatal generator errors, prefixed with `E`.
    Error,
    /// Advisory cost-model warnings, prefixed with `W`.
    Warning,
    /// Informational progress notes, prefixed with `N`.
    Note,
    /// Pipeline scheduling diagnostics, prefixed with `T`.
    Timing,
    /// ILP solver diagnostics, prefixed with `S`.
    Solver,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Note => 'N',
            Category::Timing => 'T',
            Category::Solver => 'S',
        }
    }
}

/// A category prefix plus a numeric identifier, displayed as e.g. `W201`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// A fatal error aborted multiplier construction.
    pub const FATAL: Self = Self::new(Category::Error, 100);
    /// A DSP tile covers less of the grid than its area warrants.
    pub const DSP_UNDERUTILIZED: Self = Self::new(Category::Warning, 201);
    /// The compressor catalog lacked a flip-flop compressor and was repaired.
    pub const CATALOG_REPAIRED: Self = Self::new(Category::Warning, 202);
    /// Summary of the selected tiling.
    pub const TILING_SUMMARY: Self = Self::new(Category::Note, 301);
    /// Summary of one compression stage.
    pub const COMPRESSION_STAGE: Self = Self::new(Category::Note, 302);
    /// Truncation parameters derived from the error budget.
    pub const TRUNCATION_PARAMS: Self = Self::new(Category::Note, 303);
    /// The bit heap LSB was raised by the pruning pass.
    pub const LSB_PRUNED: Self = Self::new(Category::Note, 304);
    /// A register stage was inserted by the pipeline scheduler.
    pub const STAGE_ADVANCE: Self = Self::new(Category::Timing, 401);
    /// The ILP solver timed out and returned its incumbent.
    pub const ILP_TIMEOUT: Self = Self::new(Category::Solver, 501);
    /// The ILP was infeasible and is being re-solved with relaxed parameters.
    pub const ILP_RELAXED: Self = Self::new(Category::Solver, 502);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
