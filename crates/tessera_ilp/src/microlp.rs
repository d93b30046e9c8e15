//! A back end on the `microlp` simplex solver, driven through `good_lp`.
//!
//! The integer model is translated to `good_lp` variables and rows and
//! solved on a worker thread, so the caller's timeout holds even though
//! `microlp` has no time limit of its own. The rounded assignment is checked
//! against the exact integer rows before it is returned.
//!
//! Models `microlp` cannot represent exactly (coefficients beyond the `f64`
//! mantissa), solver failures and assignments that fail the check go to the
//! [`BranchAndBound`] fallback with whatever time is left.

use crate::backend::{IlpBackend, IlpSolution, SolveStatus};
use crate::branch_bound::BranchAndBound;
use crate::model::{IlpModel, Sense, VarKind};
use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Largest magnitude an `f64` holds exactly.
const EXACT_F64: i128 = 1 << 53;

/// What the worker thread reports.
enum Outcome {
    Solved(Vec<i64>),
    Infeasible,
    Failed,
}

/// The `microlp` back end.
#[derive(Debug, Clone, Default)]
pub struct MicroLp {
    fallback: BranchAndBound,
}

impl MicroLp {
    /// Creates the back end with an unbounded branch-and-bound fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the fallback solver.
    pub fn with_fallback(mut self, fallback: BranchAndBound) -> Self {
        self.fallback = fallback;
        self
    }

    fn fall_back(
        &self,
        model: &IlpModel,
        start: Instant,
        timeout: Duration,
        warm_start: Option<&[i64]>,
    ) -> IlpSolution {
        let left = timeout.saturating_sub(start.elapsed());
        self.fallback.solve(model, left, warm_start)
    }
}

/// Returns `true` if every coefficient and bound converts to `f64` exactly.
fn is_exact_in_f64(model: &IlpModel) -> bool {
    let rows = model.constraints().iter().all(|row| {
        row.rhs.abs() <= EXACT_F64 && row.terms.iter().all(|&(_, a)| a.abs() <= EXACT_F64)
    });
    let bounds = model
        .variables()
        .iter()
        .all(|v| i128::from(v.kind.upper()) <= EXACT_F64);
    rows && bounds
}

fn run(model: &IlpModel) -> Outcome {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = model
        .variables()
        .iter()
        .map(|v| match v.kind {
            VarKind::Binary => vars.add(variable().binary()),
            VarKind::Integer { upper } => {
                vars.add(variable().integer().min(0).max(upper as f64))
            }
        })
        .collect();

    let mut objective = Expression::with_capacity(handles.len());
    for (v, &h) in model.variables().iter().zip(&handles) {
        objective += v.cost * h;
    }

    let mut problem = vars.minimise(objective).using(microlp);
    for row in model.constraints() {
        let mut lhs = Expression::with_capacity(row.terms.len());
        for &(v, a) in &row.terms {
            lhs += (a as f64) * handles[v.index()];
        }
        let rhs = row.rhs as f64;
        problem = problem.with(match row.sense {
            Sense::Le => constraint::leq(lhs, rhs),
            Sense::Eq => constraint::eq(lhs, rhs),
            Sense::Ge => constraint::geq(lhs, rhs),
        });
    }

    match problem.solve() {
        Ok(solution) => Outcome::Solved(
            handles
                .iter()
                .map(|&h| solution.value(h).round() as i64)
                .collect(),
        ),
        Err(ResolutionError::Infeasible) => Outcome::Infeasible,
        Err(_) => Outcome::Failed,
    }
}

impl IlpBackend for MicroLp {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(
        &self,
        model: &IlpModel,
        timeout: Duration,
        warm_start: Option<&[i64]>,
    ) -> IlpSolution {
        let start = Instant::now();
        if model.num_vars() == 0 || !is_exact_in_f64(model) {
            return self.fall_back(model, start, timeout, warm_start);
        }

        let (tx, rx) = mpsc::channel();
        let owned = model.clone();
        let spawned = thread::Builder::new()
            .name("tessera-microlp".into())
            .spawn(move || {
                let _ = tx.send(run(&owned));
            });
        if spawned.is_err() {
            return self.fall_back(model, start, timeout, warm_start);
        }

        match rx.recv_timeout(timeout) {
            Ok(Outcome::Solved(values)) if model.is_feasible(&values) => IlpSolution {
                status: SolveStatus::Optimal,
                objective: model.objective(&values),
                values,
                nodes: 0,
            },
            Ok(Outcome::Infeasible) => IlpSolution::without_solution(SolveStatus::Infeasible, 0),
            Ok(Outcome::Solved(_) | Outcome::Failed)
            | Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.fall_back(model, start, timeout, warm_start)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => match warm_start {
                Some(values) if model.is_feasible(values) => IlpSolution {
                    status: SolveStatus::Feasible,
                    objective: model.objective(values),
                    values: values.to_vec(),
                    nodes: 0,
                },
                _ => IlpSolution::without_solution(SolveStatus::TimedOut, 0),
            },
        }
    }
}
