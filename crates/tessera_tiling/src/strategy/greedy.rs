//! Raster, greedy and extended greedy tiling.
//!
//! All three repeatedly take the first uncovered required cell in scan
//! order and place the best legal tile covering it. They differ in the
//! corner they start from, whether DSP candidates get a discount, and
//! whether anchors are shifted around the aligned position.

use super::cover::{complete, Cover, Scan};
use super::{finish, SolveState, TilingStrategy};
use crate::problem::TilingProblem;
use crate::solution::Solution;
use tessera_common::TesseraResult;
use tessera_config::TilingMethod;

/// A constructive scan strategy.
#[derive(Debug)]
pub struct ScanTiling<'p, 'a> {
    problem: &'p TilingProblem<'a>,
    method: TilingMethod,
    scan: Scan,
    state: SolveState,
    solution: Option<Solution>,
    cost: Option<f64>,
}

impl<'p, 'a> ScanTiling<'p, 'a> {
    fn with_scan(problem: &'p TilingProblem<'a>, method: TilingMethod, scan: Scan) -> Self {
        Self {
            problem,
            method,
            scan,
            state: SolveState::Constructed,
            solution: None,
            cost: None,
        }
    }

    /// Scans from cell `(0, 0)` and takes the cheapest tile per covered
    /// cell.
    pub fn raster(problem: &'p TilingProblem<'a>) -> Self {
        Self::with_scan(problem, TilingMethod::BasicRaster, Scan::RASTER)
    }

    /// Scans from the most significant corner and prefers DSP tiles.
    pub fn greedy(problem: &'p TilingProblem<'a>) -> Self {
        Self::with_scan(problem, TilingMethod::Greedy, Scan::GREEDY)
    }

    /// Greedy, also trying DSP anchors shifted toward the most significant
    /// corner.
    pub fn xgreedy(problem: &'p TilingProblem<'a>) -> Self {
        Self::with_scan(problem, TilingMethod::XGreedy, Scan::XGREEDY)
    }
}

pub(crate) fn run(problem: &TilingProblem<'_>, scan: Scan) -> TesseraResult<Cover> {
    complete(problem, Cover::new(problem), scan)
}

impl TilingStrategy for ScanTiling<'_, '_> {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn solve(&mut self) -> TesseraResult<()> {
        self.state = SolveState::Solving;
        let result = run(self.problem, self.scan)
            .and_then(|cover| finish(self.problem, self.method.name(), &cover));
        match result {
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
    use crate::shape::TileShape;
    use crate::strategy::tests::problem_for;
    use tessera_diagnostics::DiagnosticSink;

    #[test]
    fn raster_covers_a_full_grid() {
        let (params, target) = problem_for(7, 5, 0, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut s = ScanTiling::raster(&problem);
        s.solve().unwrap();
        let solution = s.solution().unwrap();
        solution.check_coverage(&problem.collection, &problem.grid).unwrap();
        assert!(solution.len() < 35);
        assert_eq!(s.name(), "basic-raster");
    }

    #[test]
    fn greedy_uses_a_dsp_on_a_large_grid() {
        let (params, target) = problem_for(24, 17, 0, false, true);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut s = ScanTiling::greedy(&problem);
        s.solve().unwrap();
        let solution = s.solution().unwrap();
        assert_eq!(solution.len(), 1);
        let tile = problem.collection.get(solution.placements()[0].param).unwrap();
        assert_eq!(tile.shape, TileShape::Dsp);
    }

    #[test]
    fn truncated_greedy_leaves_optional_cells() {
        let (params, target) = problem_for(8, 8, 8, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut s = ScanTiling::greedy(&problem);
        s.solve().unwrap();
        let coverage = s
            .solution()
            .unwrap()
            .coverage(&problem.collection, &problem.grid)
            .unwrap();
        let omitted: u128 = problem
            .grid
            .cells()
            .filter(|&(x, y)| coverage[problem.grid.index(x, y)] == 0)
            .map(|(x, y)| 1u128 << (x + y))
            .sum();
        assert!(omitted > 0);
        assert!(omitted <= problem.grid.truncation().budget());
    }

    #[test]
    fn greedy_variants_place_signed_dsps() {
        let (params, target) = problem_for(20, 20, 0, true, true);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut g = ScanTiling::greedy(&problem);
        let mut x = ScanTiling::xgreedy(&problem);
        g.solve().unwrap();
        x.solve().unwrap();
        for s in [&g, &x] {
            s.solution()
                .unwrap()
                .check_coverage(&problem.collection, &problem.grid)
                .unwrap();
        }
        assert!(x.solution().unwrap().dsp_count(&problem.collection) >= 1);
    }
}
