//! Exact tiling as a 0/1 program.
//!
//! One binary per legal placement, deduplicated by covered cells.
//! Every cell that must be computed is covered exactly once and every
//! omittable cell at most once. The weight of the omittable cells left
//! uncovered stays within the error budget, and the DSP blocks used stay
//! within their limit. The objective is the total LUT-equivalent cost. The
//! best constructive cover seeds the search, so the result is never worse
//! than any heuristic. A solve that times out without any cover is retried
//! with twice the time, up to `ilp.max_relaxations` times.

use super::cover::Cover;
use super::{best_heuristic_cover, finish, SolveState, TilingStrategy};
use crate::problem::{Candidate, TilingProblem};
use crate::solution::Solution;
use std::collections::HashMap;
use std::time::Duration;
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::TilingMethod;
use tessera_diagnostics::{Diagnostic, DiagnosticCode};
use tessera_ilp::{IlpBackend, IlpModel, IlpSolution, Sense, SolveStatus, VarId};

/// Smallest timeout a retry gets.
const MIN_RETRY_TIMEOUT: Duration = Duration::from_millis(100);

/// The covering rows and one variable per candidate.
#[derive(Debug)]
pub(crate) struct CoverModel {
    pub model: IlpModel,
    pub candidates: Vec<Candidate>,
    pub vars: Vec<VarId>,
    by_cells: HashMap<(u32, Vec<(u32, u32)>), usize>,
}

impl CoverModel {
    pub fn build(problem: &TilingProblem<'_>) -> Self {
        let candidates = problem.all_candidates();
        let mut model = IlpModel::new();
        let grid = &problem.grid;
        let vars: Vec<VarId> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| model.add_binary(format!("tile_{i}"), c.cost))
            .collect();

        let mut covering: Vec<Vec<(VarId, i128)>> = vec![Vec::new(); grid.cell_count()];
        for (c, &var) in candidates.iter().zip(&vars) {
            for &(x, y) in &c.projection.cells {
                covering[grid.index(x, y)].push((var, 1));
            }
        }
        for (x, y) in grid.cells() {
            let terms = std::mem::take(&mut covering[grid.index(x, y)]);
            if !grid.is_omittable(x, y) {
                model.add_constraint(format!("cover_{x}_{y}"), terms, Sense::Eq, 1);
            } else if !terms.is_empty() {
                model.add_constraint(format!("cover_{x}_{y}"), terms, Sense::Le, 1);
            }
        }

        // Uncovered weight within budget, i.e. covered omittable weight at
        // least `omittable - budget`, counted in units of `2^shift`.
        let budget = grid.truncation().budget();
        let omittable = grid.omittable_weight();
        if omittable > budget {
            let shift = budget_shift(omittable);
            let terms = candidates.iter().zip(&vars).map(|(c, &var)| {
                let covered: u128 = c
                    .projection
                    .cells
                    .iter()
                    .filter(|&&(x, y)| grid.is_omittable(x, y))
                    .map(|&(x, y)| (1u128 << (x + y)) >> shift)
                    .sum();
                (var, covered as i128)
            });
            let needed = (omittable - budget).div_ceil(1u128 << shift) as i128;
            model.add_constraint("error_budget", terms, Sense::Ge, needed);
        }

        if let Some(max_dsp) = problem.options.max_dsp {
            let terms: Vec<(VarId, i128)> = candidates
                .iter()
                .zip(&vars)
                .filter(|(c, _)| c.dsp_units > 0)
                .map(|(c, &v)| (v, i128::from(c.dsp_units)))
                .collect();
            if !terms.is_empty() {
                model.add_constraint("max_dsp", terms, Sense::Le, i128::from(max_dsp));
            }
        }

        let by_cells = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| ((c.dsp_units, c.projection.cells.clone()), i))
            .collect();
        Self {
            model,
            candidates,
            vars,
            by_cells,
        }
    }

    /// Sets the tile variables of `cover`; `false` if a placement has no
    /// variable.
    pub fn fill_warm_start(
        &self,
        problem: &TilingProblem<'_>,
        cover: &Cover,
        values: &mut [i64],
    ) -> bool {
        for &(param, x, y) in cover.placements() {
            let Some(cand) = problem.evaluate(param, x, y) else {
                return false;
            };
            match self.by_cells.get(&(cand.dsp_units, cand.projection.cells)) {
                Some(&i) => values[self.vars[i].index()] = 1,
                None => return false,
            }
        }
        true
    }

    /// The cover a solution selects.
    pub fn cover(&self, problem: &TilingProblem<'_>, solution: &IlpSolution) -> Cover {
        let mut cover = Cover::new(problem);
        for (c, &var) in self.candidates.iter().zip(&self.vars) {
            if solution.value(var) == 1 {
                cover.apply(problem, c);
            }
        }
        cover
    }
}

/// Scale of the error-budget row, keeping its coefficients within an `f64`
/// mantissa. Covered weight is rounded down and the demand up, so a scaled
/// solution always meets the exact budget.
fn budget_shift(total: u128) -> u32 {
    (128 - total.leading_zeros()).saturating_sub(52)
}

/// Reports a timed-out solve that still produced a solution.
pub(crate) fn report_timeout(
    problem: &TilingProblem<'_>,
    what: &str,
    timeout: Duration,
    solution: &IlpSolution,
) {
    problem.emit(
        Diagnostic::warning(
            DiagnosticCode::ILP_TIMEOUT,
            format!(
                "{what} ILP timed out after {} ms; using the best solution found",
                timeout.as_millis()
            ),
        )
        .with_note(format!(
            "{} nodes explored, objective {:.1}",
            solution.nodes, solution.objective
        )),
    );
}

/// Exact covering ILP.
#[derive(Debug)]
pub struct OptimalIlpTiling<'p, 'a> {
    problem: &'p TilingProblem<'a>,
    solver: Box<dyn IlpBackend>,
    timeout: Duration,
    state: SolveState,
    solution: Option<Solution>,
    cost: Option<f64>,
}

impl<'p, 'a> OptimalIlpTiling<'p, 'a> {
    /// Creates the strategy around a solver.
    pub fn new(problem: &'p TilingProblem<'a>, solver: Box<dyn IlpBackend>) -> Self {
        Self {
            problem,
            timeout: problem.target.ilp_timeout(),
            solver,
            state: SolveState::Constructed,
            solution: None,
            cost: None,
        }
    }

    fn run(&self) -> TesseraResult<Cover> {
        let problem = self.problem;
        let warm_cover = best_heuristic_cover(problem)?;
        let cover_model = CoverModel::build(problem);
        let mut values = vec![0i64; cover_model.model.num_vars()];
        let warm = cover_model
            .fill_warm_start(problem, &warm_cover, &mut values)
            .then_some(values);

        let mut timeout = self.timeout;
        let mut attempts = 0;
        while attempts <= problem.ilp.max_relaxations {
            attempts += 1;
            let solution = self.solver.solve(&cover_model.model, timeout, warm.as_deref());
            match solution.status {
                SolveStatus::Optimal => return Ok(cover_model.cover(problem, &solution)),
                SolveStatus::Feasible => {
                    report_timeout(problem, "tiling", timeout, &solution);
                    return Ok(cover_model.cover(problem, &solution));
                }
                SolveStatus::TimedOut => {
                    let longer = timeout.saturating_mul(2).max(MIN_RETRY_TIMEOUT);
                    problem.emit(Diagnostic::note(
                        DiagnosticCode::ILP_RELAXED,
                        format!(
                            "tiling ILP found no cover within {} ms; retrying with {} ms",
                            timeout.as_millis(),
                            longer.as_millis()
                        ),
                    ));
                    timeout = longer;
                }
                SolveStatus::Infeasible => break,
            }
        }
        Err(TesseraError::TilingInfeasible {
            method: TilingMethod::OptimalIlp.name().to_string(),
            wx: problem.grid.wx(),
            wy: problem.grid.wy(),
            w_out: problem.grid.w_out(),
            attempts,
        })
    }
}

impl TilingStrategy for OptimalIlpTiling<'_, '_> {
    fn name(&self) -> &str {
        TilingMethod::OptimalIlp.name()
    }

    fn solve(&mut self) -> TesseraResult<()> {
        self.state = SolveState::Solving;
        match self.run().and_then(|c| finish(self.problem, self.name(), &c)) {
            Ok((solution, cost)) => {
                self.solution = Some(solution);
                self.cost = Some(cost);
                self.state = SolveState::Solved;
                Ok(())
            }
            Err(e) => {
                self.state = SolveState::Infeasible;
                Err(e)
            }
        }
    }

    fn state(&self) -> SolveState {
        self.state
    }

    fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    fn cost(&self) -> Option<f64> {
        self.cost
    }
}
