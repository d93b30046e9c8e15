//! The solver back end interface.

use crate::model::{IlpModel, VarId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a solve call.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SolveStatus {
    /// The search completed; the solution is optimal.
    Optimal,
    /// The timeout fired; the solution is the best incumbent found.
    Feasible,
    /// The search completed without finding any feasible assignment.
    Infeasible,
    /// The timeout fired before any feasible assignment was found.
    TimedOut,
}

impl SolveStatus {
    /// Returns `true` if the solve produced a usable assignment.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// The result of a solve call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IlpSolution {
    /// How the search ended.
    pub status: SolveStatus,
    /// Variable values, indexed by [`VarId`]; empty without a solution.
    pub values: Vec<i64>,
    /// Objective value of `values`.
    pub objective: f64,
    /// Number of search nodes explored.
    pub nodes: u64,
}

impl IlpSolution {
    /// A result carrying no assignment.
    pub fn without_solution(status: SolveStatus, nodes: u64) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: f64::INFINITY,
            nodes,
        }
    }

    /// Value of a variable, 0 when the solve produced no assignment.
    pub fn value(&self, var: VarId) -> i64 {
        self.values.get(var.index()).copied().unwrap_or(0)
    }
}

/// A mixed-integer solver.
///
/// A solve call blocks until optimality, infeasibility or the timeout. On
/// timeout the back end returns its best incumbent, if it has one. A
/// feasible `warm_start` assignment seeds the incumbent, so the returned
/// objective is never worse than the warm start's.
pub trait IlpBackend: std::fmt::Debug {
    /// Short name of the back end, for diagnostics.
    fn name(&self) -> &str;

    /// Minimizes the model's objective.
    fn solve(&self, model: &IlpModel, timeout: Duration, warm_start: Option<&[i64]>)
        -> IlpSolution;
}
