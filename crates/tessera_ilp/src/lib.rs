//! Integer linear programming for the tiling and compression optimizers.
//!
//! Optimizers build an [`IlpModel`] (bounded integer variables, linear
//! constraints with integer coefficients, a minimized linear objective) and
//! hand it to an [`IlpBackend`]. The backend is an optional capability of the
//! target: when a run has no backend, only heuristic strategies are usable.
//!
//! The built-in [`BranchAndBound`] backend is a depth-first search with
//! bound propagation, specialized branching on set-partition rows, and a
//! wall-clock timeout after which it returns its best incumbent.
//! [`MicroLp`] runs the `microlp` solver through `good_lp` and falls back to
//! branch-and-bound for models it cannot take exactly.

#![warn(missing_docs)]

pub mod backend;
pub mod branch_bound;
pub mod microlp;
pub mod model;

pub use backend::{IlpBackend, IlpSolution, SolveStatus};
pub use branch_bound::BranchAndBound;
pub use microlp::MicroLp;
pub use model::{Constraint, IlpModel, Sense, VarId, VarKind, Variable};
