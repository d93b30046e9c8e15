//! Tile placement over the partial-product grid of a multiplier.
//!
//! A [`TilingProblem`] holds the [`ProductGrid`] (with the cells a
//! truncated multiplier may omit), the [`TileCollection`] usable on the
//! target, and the legality and cost rules. A [`TilingStrategy`] chosen by
//! [`create_strategy`] turns it into a [`Solution`]: placements whose
//! [`TileProjection`]s feed the bit heap.
//!
//! # Usage
//!
//! ```
//! use tessera_arch::load_target_for;
//! use tessera_config::{resolve_params, GeneratorConfig};
//! use tessera_diagnostics::DiagnosticSink;
//! use tessera_tiling::{create_strategy, TilingProblem};
//!
//! let params = resolve_params(&GeneratorConfig::for_widths(8, 8, 0, false)).unwrap();
//! let target = load_target_for(&params).unwrap();
//! let sink = DiagnosticSink::new();
//! let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
//! let mut strategy = create_strategy(&problem).unwrap();
//! strategy.solve().unwrap();
//! assert!(strategy.solution().is_some());
//! ```

#![warn(missing_docs)]

pub mod collection;
pub mod export;
pub mod grid;
pub mod problem;
pub mod shape;
pub mod solution;
pub mod strategy;

pub use collection::TileCollection;
pub use grid::ProductGrid;
pub use problem::{Candidate, TilingProblem};
pub use shape::{Parametrization, Signedness, TileShape};
pub use solution::{Placement, Solution, TileProjection};
pub use strategy::{
    create_strategy, BeamSearchTiling, JointIlpTiling, OptimalIlpTiling, ScanTiling, SolveState,
    TilingStrategy,
};
