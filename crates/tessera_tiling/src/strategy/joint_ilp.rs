//! Tiling and compression solved as one program.
//!
//! The covering rows of the exact tiling ILP are combined with the
//! compression rows; the stage 0 height of each column is linear in the
//! tile variables, so the solver trades tile cost against compressor area.
//! The stage count starts one below what the heuristic compressor needs
//! for the best constructive tiling and is relaxed after each infeasible
//! or fruitless solve.

use super::cover::Cover;
use super::optimal_ilp::{report_timeout, CoverModel};
use super::{best_heuristic_cover, finish, SolveState, TilingStrategy};
use crate::problem::TilingProblem;
use crate::solution::Solution;
use std::time::Duration;
use tessera_bitheap::compression::{add_compression_model, simulate, InitialColumn, MAX_STAGES};
use tessera_bitheap::{CompressorCatalog, StagePlan};
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::TilingMethod;
use tessera_diagnostics::{Diagnostic, DiagnosticCode};
use tessera_ilp::{IlpBackend, SolveStatus};

/// Joint tiling and compression ILP.
#[derive(Debug)]
pub struct JointIlpTiling<'p, 'a> {
    problem: &'p TilingProblem<'a>,
    solver: Box<dyn IlpBackend>,
    timeout: Duration,
    state: SolveState,
    solution: Option<Solution>,
    cost: Option<f64>,
    plans: Option<Vec<StagePlan>>,
}

impl<'p, 'a> JointIlpTiling<'p, 'a> {
    /// Creates the strategy around a solver.
    pub fn new(problem: &'p TilingProblem<'a>, solver: Box<dyn IlpBackend>) -> Self {
        Self {
            problem,
            timeout: problem.target.ilp_timeout(),
            solver,
            state: SolveState::Constructed,
            solution: None,
            cost: None,
            plans: None,
        }
    }

    /// Bits always present per column besides the tile outputs.
    ///
    /// Unsigned heaps hold exactly the rounding constant. Signed heaps also
    /// absorb the tile biases, which depend on the tiling, so one bit per
    /// column is reserved.
    fn constant_bits(&self) -> Vec<u32> {
        let grid = &self.problem.grid;
        let width = grid.heap_width();
        if grid.signed() {
            return vec![1; width as usize];
        }
        let k = grid.truncation().heap_constant();
        (0..width).map(|c| ((k >> c) & 1) as u32).collect()
    }

    fn run(&self) -> TesseraResult<(Cover, Vec<StagePlan>)> {
        let problem = self.problem;
        let grid = &problem.grid;
        let width = grid.heap_width() as usize;
        let mut catalog = CompressorCatalog::standard(problem.target);
        catalog.ensure_flip_flop(problem.sink);

        let warm_cover = best_heuristic_cover(problem)?;
        let base = CoverModel::build(problem);
        let constants = self.constant_bits();

        // Column heights as a function of the tile choice.
        let mut initial: Vec<InitialColumn> = constants
            .iter()
            .map(|&k| InitialColumn::fixed(k))
            .collect();
        for (cand, &var) in base.candidates.iter().zip(&base.vars) {
            let lo = cand.projection.base as usize;
            let hi = (lo + cand.projection.out_bits as usize).min(width);
            for column in &mut initial[lo.min(hi)..hi] {
                column.terms.push((var, 1));
            }
        }
        let mut warm_heights = constants.clone();
        for &(param, x, y) in warm_cover.placements() {
            if let Some(c) = problem.evaluate(param, x, y) {
                let lo = c.projection.base as usize;
                let hi = (lo + c.projection.out_bits as usize).min(width);
                for h in &mut warm_heights[lo.min(hi)..hi] {
                    *h += 1;
                }
            }
        }
        let heuristic = simulate(&warm_heights, &catalog, problem.arity, MAX_STAGES).ok_or_else(|| {
            TesseraError::CompressorCatalogIncomplete {
                stage: 0,
                column: 0,
                height: warm_heights.iter().copied().max().unwrap_or(0),
                arity: problem.arity,
            }
        })?;
        let heuristic_stages = heuristic.len() as u32;
        let cells = grid.cell_count() as u32;
        let upper = initial
            .iter()
            .map(|col| (col.terms.len() as u32).min(cells) + col.constant as u32)
            .sum::<u32>()
            .max(1);

        let mut stages = heuristic_stages.saturating_sub(1);
        let mut attempts = 0;
        while attempts <= problem.ilp.max_relaxations {
            attempts += 1;
            let mut model = base.model.clone();
            let vars =
                add_compression_model(&mut model, &initial, upper, stages, &catalog, problem.arity);
            let warm = (stages == heuristic_stages)
                .then(|| {
                    let mut values = vec![0i64; model.num_vars()];
                    base.fill_warm_start(problem, &warm_cover, &mut values)
                        .then(|| {
                            vars.fill_warm_start(&mut values, &warm_heights, &heuristic, &catalog);
                            values
                        })
                })
                .flatten();
            let solution = self.solver.solve(&model, self.timeout, warm.as_deref());
            match solution.status {
                SolveStatus::Optimal | SolveStatus::Feasible => {
                    if solution.status == SolveStatus::Feasible {
                        report_timeout(problem, "joint tiling", self.timeout, &solution);
                    }
                    return Ok((base.cover(problem, &solution), vars.plans(&solution)));
                }
                SolveStatus::Infeasible | SolveStatus::TimedOut => {
                    problem.emit(Diagnostic::note(
                        DiagnosticCode::ILP_RELAXED,
                        format!(
                            "no joint tiling with {stages} compression stage(s) ({:?}); trying {}",
                            solution.status,
                            stages + 1
                        ),
                    ));
                    stages += 1;
                }
            }
        }
        Err(TesseraError::TilingInfeasible {
            method: TilingMethod::JointIlp.name().to_string(),
            wx: grid.wx(),
            wy: grid.wy(),
            w_out: grid.w_out(),
            attempts,
        })
    }
}

impl TilingStrategy for JointIlpTiling<'_, '_> {
    fn name(&self) -> &str {
        TilingMethod::JointIlp.name()
    }

    fn solve(&mut self) -> TesseraResult<()> {
        self.state = SolveState::Solving;
        let result = self.run().and_then(|(cover, plans)| {
            finish(self.problem, self.name(), &cover).map(|(s, c)| (s, c, plans))
        });
        match result {
            Ok((solution, cost, plans)) => {
                self.solution = Some(solution);
                self.cost = Some(cost);
                self.plans = Some(plans);
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

    fn compression_plans(&self) -> Option<&[StagePlan]> {
        self.plans.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::problem_for;
    use tessera_diagnostics::DiagnosticSink;
    use tessera_ilp::BranchAndBound;

    #[test]
    fn joint_model_returns_tiles_and_plans() {
        let (params, target) = problem_for(3, 3, 0, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let solver = BranchAndBound::new().with_node_limit(20_000);
        let mut s = JointIlpTiling::new(&problem, Box::new(solver));
        s.timeout = Duration::from_secs(2);
        s.solve().unwrap();
        assert_eq!(s.state(), SolveState::Solved);
        s.solution()
            .unwrap()
            .check_coverage(&problem.collection, &problem.grid)
            .unwrap();
        assert!(s.compression_plans().is_some());
    }

    #[test]
    fn unsigned_constants_are_the_rounding_constant() {
        let (params, target) = problem_for(8, 8, 8, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let s = JointIlpTiling::new(&problem, Box::new(BranchAndBound::new()));
        let bits = s.constant_bits();
        let k = problem.grid.truncation().heap_constant();
        let value: u128 = bits
            .iter()
            .enumerate()
            .map(|(c, &b)| u128::from(b) << c)
            .sum();
        assert_eq!(value, k);
    }

    #[test]
    fn signed_constants_reserve_a_bit_per_column() {
        let (params, target) = problem_for(4, 4, 0, true, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let s = JointIlpTiling::new(&problem, Box::new(BranchAndBound::new()));
        assert_eq!(s.constant_bits(), vec![1; 8]);
    }
}
