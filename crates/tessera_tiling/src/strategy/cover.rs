//! Partial coverings and the candidate scan shared by the constructive
//! strategies.

use crate::problem::{Candidate, TilingProblem};
use crate::solution::Solution;
use std::cmp::Ordering;
use tessera_common::{TesseraError, TesseraResult};

/// Weight applied to the per-cell cost of hard multiplier candidates when
/// a strategy prefers DSP blocks.
pub const DSP_PREFERENCE: f64 = 0.5;

/// Anchor shifts tried by the extended greedy search.
const SHIFTS: [i64; 6] = [0, 1, 2, 4, 8, 16];

/// Direction of the scan for the next uncovered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanOrder {
    /// Row by row from cell `(0, 0)`; tiles are aligned on their first cell.
    LsbFirst,
    /// Row by row from the top corner; tiles are aligned on their last cell.
    MsbFirst,
}

/// How a constructive strategy scans and ranks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scan {
    pub order: ScanOrder,
    pub shifted_anchors: bool,
    pub prefer_dsp: bool,
}

impl Scan {
    pub const RASTER: Scan = Scan {
        order: ScanOrder::LsbFirst,
        shifted_anchors: false,
        prefer_dsp: false,
    };
    pub const GREEDY: Scan = Scan {
        order: ScanOrder::MsbFirst,
        shifted_anchors: false,
        prefer_dsp: true,
    };
    pub const XGREEDY: Scan = Scan {
        order: ScanOrder::MsbFirst,
        shifted_anchors: true,
        prefer_dsp: true,
    };

    fn score(&self, c: &Candidate) -> f64 {
        let per_cell = c.cost_per_cell();
        if self.prefer_dsp && c.dsp_units > 0 {
            per_cell * DSP_PREFERENCE
        } else {
            per_cell
        }
    }

    /// Orders candidates best first.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        self.score(a)
            .total_cmp(&self.score(b))
            .then_with(|| b.projection.cells.len().cmp(&a.projection.cells.len()))
            .then_with(|| a.param.cmp(&b.param))
            .then_with(|| (a.anchor_y, a.anchor_x).cmp(&(b.anchor_y, b.anchor_x)))
    }
}

/// A partial covering of the grid.
#[derive(Debug, Clone)]
pub(crate) struct Cover {
    covered: Vec<bool>,
    placements: Vec<(usize, i64, i64)>,
    cost: f64,
    dsp: u32,
    remaining: usize,
}

impl Cover {
    pub fn new(problem: &TilingProblem<'_>) -> Self {
        Self {
            covered: vec![false; problem.grid.cell_count()],
            placements: Vec::new(),
            cost: 0.0,
            dsp: 0,
            remaining: problem.grid.required_count(),
        }
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// The first uncovered required cell in scan order.
    pub fn next_target(&self, problem: &TilingProblem<'_>, order: ScanOrder) -> Option<(u32, u32)> {
        let grid = &problem.grid;
        let open = |&(x, y): &(u32, u32)| grid.is_required(x, y) && !self.covered[grid.index(x, y)];
        match order {
            ScanOrder::LsbFirst => grid.cells().find(open),
            ScanOrder::MsbFirst => {
                let cells: Vec<(u32, u32)> = grid.cells().collect();
                cells.into_iter().rev().find(open)
            }
        }
    }

    /// Whether `cand` fits next to the tiles already placed.
    pub fn admits(&self, problem: &TilingProblem<'_>, cand: &Candidate) -> bool {
        self.dsp.saturating_add(cand.dsp_units) <= problem.dsp_budget()
            && cand
                .projection
                .cells
                .iter()
                .all(|&(x, y)| !self.covered[problem.grid.index(x, y)])
    }

    pub fn apply(&mut self, problem: &TilingProblem<'_>, cand: &Candidate) {
        for &(x, y) in &cand.projection.cells {
            self.covered[problem.grid.index(x, y)] = true;
        }
        self.remaining -= cand.required;
        self.cost += cand.cost;
        self.dsp += cand.dsp_units;
        self.placements.push((cand.param, cand.anchor_x, cand.anchor_y));
    }

    pub fn placements(&self) -> &[(usize, i64, i64)] {
        &self.placements
    }

    pub fn to_solution(&self) -> Solution {
        let mut solution = Solution::new();
        for &(param, x, y) in &self.placements {
            solution.push(param, x, y);
        }
        solution
    }
}

/// Legal candidates that cover `target` and fit the cover.
pub(crate) fn candidates_at(
    problem: &TilingProblem<'_>,
    cover: &Cover,
    target: (u32, u32),
    scan: Scan,
) -> Vec<Candidate> {
    let (tx, ty) = (i64::from(target.0), i64::from(target.1));
    let mut out = Vec::new();
    for (idx, p) in problem.collection.params().iter().enumerate() {
        let (lx, ly) = match scan.order {
            ScanOrder::LsbFirst => p.first_cell(),
            ScanOrder::MsbFirst => p.last_cell(),
        };
        let base = (tx - i64::from(lx), ty - i64::from(ly));
        let mut anchors = vec![base];
        if scan.shifted_anchors && p.shape.uses_dsp() {
            for dy in SHIFTS {
                for dx in SHIFTS {
                    if (dx, dy) == (0, 0) {
                        continue;
                    }
                    let (ux, uy) = (i64::from(lx) - dx, i64::from(ly) - dy);
                    if ux >= 0 && uy >= 0 && p.valid(ux as u32, uy as u32) {
                        anchors.push((base.0 + dx, base.1 + dy));
                    }
                }
            }
        }
        for (ax, ay) in anchors {
            if let Some(c) = problem.evaluate(idx, ax, ay) {
                if cover.admits(problem, &c) {
                    out.push(c);
                }
            }
        }
    }
    out
}

/// Fills `cover` one tile at a time, always taking the best candidate at
/// the next uncovered cell.
pub(crate) fn complete(
    problem: &TilingProblem<'_>,
    mut cover: Cover,
    scan: Scan,
) -> TesseraResult<Cover> {
    while let Some(target) = cover.next_target(problem, scan.order) {
        let candidates = candidates_at(problem, &cover, target, scan);
        let best = candidates
            .into_iter()
            .min_by(|a, b| scan.compare(a, b))
            .or_else(|| unit_at(problem, target));
        let Some(best) = best else {
            return Err(TesseraError::internal(format!(
                "no tile fits cell ({}, {}), not even the 1x1 tile",
                target.0, target.1
            )));
        };
        cover.apply(problem, &best);
    }
    Ok(cover)
}

/// The 1x1 tile on `target`.
pub(crate) fn unit_at(problem: &TilingProblem<'_>, target: (u32, u32)) -> Option<Candidate> {
    problem.evaluate(
        problem.collection.unit(),
        i64::from(target.0),
        i64::from(target.1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::problem_for;
    use tessera_diagnostics::DiagnosticSink;

    #[test]
    fn scans_start_at_opposite_corners() {
        let (params, target) = problem_for(4, 4, 0, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let cover = Cover::new(&problem);
        assert_eq!(cover.next_target(&problem, ScanOrder::LsbFirst), Some((0, 0)));
        assert_eq!(cover.next_target(&problem, ScanOrder::MsbFirst), Some((3, 3)));
    }

    #[test]
    fn applied_cells_are_not_admitted_again() {
        let (params, target) = problem_for(4, 4, 0, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let mut cover = Cover::new(&problem);
        let unit = unit_at(&problem, (0, 0)).unwrap();
        assert!(cover.admits(&problem, &unit));
        cover.apply(&problem, &unit);
        assert!(!cover.admits(&problem, &unit));
        assert_eq!(cover.remaining(), 15);
        assert_eq!(cover.next_target(&problem, ScanOrder::LsbFirst), Some((1, 0)));
    }

    #[test]
    fn dsp_budget_limits_candidates() {
        let (mut params, target) = problem_for(16, 16, 0, false, true);
        params.tiling.max_dsp = Some(0);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let cover = Cover::new(&problem);
        let cands = candidates_at(&problem, &cover, (15, 15), Scan::GREEDY);
        assert!(!cands.is_empty());
        assert!(cands.iter().all(|c| c.dsp_units == 0));
    }

    #[test]
    fn shifted_anchors_add_candidates() {
        let (params, target) = problem_for(20, 20, 0, false, true);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        let cover = Cover::new(&problem);
        let plain = candidates_at(&problem, &cover, (19, 19), Scan::GREEDY);
        let shifted = candidates_at(&problem, &cover, (19, 19), Scan::XGREEDY);
        assert!(shifted.len() > plain.len());
        assert!(shifted
            .iter()
            .all(|c| c.projection.cells.contains(&(19, 19))));
    }

    #[test]
    fn every_cell_gets_covered() {
        let (params, target) = problem_for(5, 3, 0, false, false);
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&params, target.as_ref(), &sink).unwrap();
        for scan in [Scan::RASTER, Scan::GREEDY, Scan::XGREEDY] {
            let cover = complete(&problem, Cover::new(&problem), scan).unwrap();
            assert!(cover.is_complete());
            cover
                .to_solution()
                .check_coverage(&problem.collection, &problem.grid)
                .unwrap();
        }
    }
}
