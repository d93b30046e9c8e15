//! Beam search over greedy expansions.
//!
//! Each round expands every open partial cover at its next uncovered cell
//! with its best few candidates, then keeps the `beam_width` covers with
//! the lowest estimated total cost (cost so far plus the remaining
//! required cells at the cheapest per-cell cost).

use super::cover::{candidates_at, unit_at, Cover, Scan};
use super::{finish, SolveState, TilingStrategy};
use crate::problem::TilingProblem;
use crate::solution::Solution;
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::TilingMethod;

/// Beam search tiling.
#[derive(Debug)]
pub struct BeamSearchTiling<'p, 'a> {
    problem: &'p TilingProblem<'a>,
    state: SolveState,
    solution: Option<Solution>,
    cost: Option<f64>,
}

impl<'p, 'a> BeamSearchTiling<'p, 'a> {
    /// Creates the strategy; the width comes from the tiling options.
    pub fn new(problem: &'p TilingProblem<'a>) -> Self {
        Self {
            problem,
            state: SolveState::Constructed,
            solution: None,
            cost: None,
        }
    }
}

fn estimate(problem: &TilingProblem<'_>, cover: &Cover) -> f64 {
    cover.cost() + cover.remaining() as f64 * problem.cell_estimate()
}

pub(crate) fn run(problem: &TilingProblem<'_>) -> TesseraResult<Cover> {
    let width = problem.options.beam_width.max(1);
    let scan = Scan::GREEDY;
    let mut beam = vec![Cover::new(problem)];

    while beam.iter().any(|c| !c.is_complete()) {
        let mut next = Vec::with_capacity(beam.len() * width);
        for cover in beam {
            let Some(target) = cover.next_target(problem, scan.order) else {
                next.push(cover);
                continue;
            };
            let mut candidates = candidates_at(problem, &cover, target, scan);
            candidates.sort_by(|a, b| scan.compare(a, b));
            candidates.truncate(width);
            if candidates.is_empty() {
                let unit = unit_at(problem, target).ok_or_else(|| {
                    TesseraError::internal(format!(
                        "no tile fits cell ({}, {}), not even the 1x1 tile",
                        target.0, target.1
                    ))
                })?;
                candidates.push(unit);
            }
            for cand in &candidates {
                let mut child = cover.clone();
                child.apply(problem, cand);
                next.push(child);
            }
        }
        next.sort_by(|a, b| estimate(problem, a).total_cmp(&estimate(problem, b)));
        next.truncate(width);
        beam = next;
    }

    beam.into_iter()
        .min_by(|a, b| a.cost().total_cmp(&b.cost()))
        .ok_or_else(|| TesseraError::internal("beam search ended with an empty beam"))
}

impl TilingStrategy for BeamSearchTiling<'_, '_> {
    fn name(&self) -> &str {
        TilingMethod::BeamSearch.name()
    }

    fn solve(&mut self) -> TesseraResult<()> {
        self.state = SolveState::Solving;
        match run(self.problem).and_then(|c| finish(self.problem, self.name(), &c)) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::greedy;
    use crate::strategy::tests::problem_for;
    use tessera_diagnostics::DiagnosticSink;

    #[test]
    fn width_one_matches_greedy() {
        let (mut params, target) = problem_for(9, 7, 0, false, false);
        params.tiling.beam_width = 1;
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let beam = run(&problem).unwrap();
        let greedy = greedy::run(&problem, Scan::GREEDY).unwrap();
        assert_eq!(beam.placements(), greedy.placements());
    }

    #[test]
    fn wider_beam_covers_everything() {
        let (mut params, target) = problem_for(10, 10, 12, false, true);
        params.tiling.beam_width = 3;
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut s = BeamSearchTiling::new(&problem);
        s.solve().unwrap();
        assert_eq!(s.state(), SolveState::Solved);
        s.solution()
            .unwrap()
            .check_coverage(&problem.collection, &problem.grid)
            .unwrap();
        assert!(s.cost().unwrap() > 0.0);
    }
}
