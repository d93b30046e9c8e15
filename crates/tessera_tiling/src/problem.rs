//! One tiling problem: the grid, the usable tiles and the legality and
//! cost rules every strategy shares.

use crate::collection::TileCollection;
use crate::grid::ProductGrid;
use crate::solution::{signedness_matches, TileProjection};
use std::collections::HashMap;
use tessera_arch::Target;
use tessera_common::TesseraResult;
use tessera_config::{IlpOptions, MultiplierParams, TilingOptions};
use tessera_diagnostics::{Diagnostic, DiagnosticSink};

/// Occupation below which a DSP placement draws a warning.
pub const DSP_UNDERUSE_WARNING: f64 = 0.5;

/// A legal placement together with its projection and cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Index into the tile collection.
    pub param: usize,
    /// Grid X of the tile origin.
    pub anchor_x: i64,
    /// Grid Y of the tile origin.
    pub anchor_y: i64,
    /// What the tile computes at this anchor.
    pub projection: TileProjection,
    /// LUT-equivalent cost.
    pub cost: f64,
    /// Hard multiplier blocks used.
    pub dsp_units: u32,
    /// Required cells covered.
    pub required: usize,
}

impl Candidate {
    /// Cost per required cell covered.
    pub fn cost_per_cell(&self) -> f64 {
        self.cost / self.required.max(1) as f64
    }
}

/// Everything a tiling strategy works on.
#[derive(Debug)]
pub struct TilingProblem<'a> {
    /// The product grid and its required region.
    pub grid: ProductGrid,
    /// Usable tiles.
    pub collection: TileCollection,
    /// Cost model.
    pub target: &'a dyn Target,
    /// Tiling options.
    pub options: TilingOptions,
    /// ILP back end options.
    pub ilp: IlpOptions,
    /// Rows accepted by the final adder.
    pub arity: u32,
    /// Where notes and warnings go.
    pub sink: &'a DiagnosticSink,
    /// Operator name attached to diagnostics.
    pub operator: String,
    cell_estimate: f64,
}

impl<'a> TilingProblem<'a> {
    /// Builds the grid and the tile collection for a multiplier.
    ///
    /// # Errors
    ///
    /// Fails when no tile family is enabled.
    pub fn new(
        params: &MultiplierParams,
        target: &'a dyn Target,
        sink: &'a DiagnosticSink,
    ) -> TesseraResult<Self> {
        let grid = ProductGrid::new(
            params.wx,
            params.wy,
            params.w_out,
            params.signed,
            params.tiling.opti_trunc,
        );
        let collection = TileCollection::build(
            params.wx,
            params.wy,
            params.signed,
            &params.tiling.families,
            target,
        )?;
        let cell_estimate = cheapest_cell_cost(&collection, target);
        Ok(Self {
            grid,
            collection,
            target,
            options: params.tiling.clone(),
            ilp: params.ilp.clone(),
            arity: params.compression.final_adder.arity(),
            sink,
            operator: params.operator_name(),
            cell_estimate,
        })
    }

    /// Evaluates tile `param` at `(ax, ay)`.
    ///
    /// Returns `None` if the placement is illegal: it covers no required
    /// cell, a LUT tile leaves the grid, a DSP tile falls under the
    /// occupation threshold, or the hard multiplier's port signedness does
    /// not match the operand bits it reads.
    pub fn evaluate(&self, param: usize, ax: i64, ay: i64) -> Option<Candidate> {
        self.place(param, ax, ay, |x, y| self.grid.is_required(x, y))
    }

    fn place(
        &self,
        param: usize,
        ax: i64,
        ay: i64,
        useful: impl Fn(u32, u32) -> bool,
    ) -> Option<Candidate> {
        let p = self.collection.get(param)?;
        let projection = TileProjection::of(p, ax, ay, &self.grid)?;
        if p.shape.uses_dsp() {
            if projection.occupation(p) < self.options.dsp_occupation_threshold {
                return None;
            }
        } else if projection.cells.len() != p.area() as usize {
            return None;
        }
        if !signedness_matches(p, &projection) {
            return None;
        }
        if !projection.cells.iter().any(|&(x, y)| useful(x, y)) {
            return None;
        }
        let required = projection
            .cells
            .iter()
            .filter(|&&(x, y)| self.grid.is_required(x, y))
            .count();
        Some(Candidate {
            param,
            anchor_x: ax,
            anchor_y: ay,
            cost: projection.cost(p, self.target),
            dsp_units: p.dsp_units,
            required,
            projection,
        })
    }

    /// Every legal placement, keeping only the cheapest of those that
    /// cover the same cells with the same number of DSP blocks.
    ///
    /// Placements over omittable cells alone are included: an exact
    /// search may cover them in place of required ones.
    pub fn all_candidates(&self) -> Vec<Candidate> {
        let grid = &self.grid;
        let wx = i64::from(grid.wx());
        let wy = i64::from(grid.wy());
        let mut out: Vec<Candidate> = Vec::new();
        let mut seen: HashMap<(u32, Vec<(u32, u32)>), usize> = HashMap::new();
        for (idx, p) in self.collection.params().iter().enumerate() {
            let (w, h) = (i64::from(p.width), i64::from(p.height));
            let (xs, ys) = if p.shape.uses_dsp() {
                ((1 - w)..wx, (1 - h)..wy)
            } else {
                (0..(wx - w + 1).max(0), 0..(wy - h + 1).max(0))
            };
            for ay in ys {
                for ax in xs.clone() {
                    let useful = |x, y| grid.is_required(x, y) || grid.is_omittable(x, y);
                    let Some(cand) = self.place(idx, ax, ay, useful) else {
                        continue;
                    };
                    let key = (cand.dsp_units, cand.projection.cells.clone());
                    match seen.get(&key) {
                        Some(&i) if out[i].cost <= cand.cost => {}
                        Some(&i) => out[i] = cand,
                        None => {
                            seen.insert(key, out.len());
                            out.push(cand);
                        }
                    }
                }
            }
        }
        out
    }

    /// Lowest cost per cell any tile achieves when fully used.
    pub fn cell_estimate(&self) -> f64 {
        self.cell_estimate
    }

    /// The DSP budget, unbounded if none was set.
    pub fn dsp_budget(&self) -> u32 {
        self.options.max_dsp.unwrap_or(u32::MAX)
    }

    pub(crate) fn emit(&self, diag: Diagnostic) {
        self.sink.emit(diag.with_context(self.operator.clone()));
    }
}

fn cheapest_cell_cost(collection: &TileCollection, target: &dyn Target) -> f64 {
    collection
        .params()
        .iter()
        .filter_map(|p| {
            let grid = ProductGrid::new(p.width, p.height, 0, false, false);
            let proj = TileProjection::of(p, 0, 0, &grid)?;
            Some(proj.cost(p, target) / f64::from(p.area().max(1)))
        })
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::TileShape;
    use tessera_arch::load_target_for;
    use tessera_config::{resolve_params, GeneratorConfig};

    fn params(wx: u32, wy: u32, w_out: u32, signed: bool, dsp: bool) -> MultiplierParams {
        let mut config = GeneratorConfig::for_widths(wx, wy, w_out, signed);
        config.tiling.use_dsp = dsp;
        resolve_params(&config).unwrap()
    }

    #[test]
    fn lut_tiles_stay_on_the_grid() {
        let p = params(4, 4, 0, false, false);
        let target = load_target_for(&p).unwrap();
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&p, target.as_ref(), &sink).unwrap();
        let square = problem
            .collection
            .params()
            .iter()
            .position(|t| t.shape == TileShape::LutSquare && t.width == 3)
            .unwrap();
        assert!(problem.evaluate(square, 1, 1).is_some());
        assert!(problem.evaluate(square, 2, 1).is_none());
        assert!(problem.evaluate(square, -1, 0).is_none());
    }

    #[test]
    fn dsp_occupation_threshold() {
        let mut p = params(8, 8, 0, false, true);
        p.tiling.dsp_occupation_threshold = 0.0;
        let target = load_target_for(&p).unwrap();
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&p, target.as_ref(), &sink).unwrap();
        let dsp = problem
            .collection
            .params()
            .iter()
            .position(|t| t.shape == TileShape::Dsp)
            .unwrap();
        let c = problem.evaluate(dsp, -16, -9).unwrap();
        assert_eq!(c.projection.cells.len(), 64);
        assert_eq!(c.dsp_units, 1);

        p.tiling.dsp_occupation_threshold = 0.5;
        let strict = TilingProblem::new(&p, target.as_ref(), &sink).unwrap();
        assert!(strict.evaluate(dsp, -16, -9).is_none());
    }

    #[test]
    fn signed_ports_must_match_sign_bits() {
        let mut p = params(20, 20, 0, true, true);
        p.tiling.dsp_occupation_threshold = 0.0;
        let target = load_target_for(&p).unwrap();
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&p, target.as_ref(), &sink).unwrap();
        let find = |sx: bool, sy: bool| {
            problem
                .collection
                .params()
                .iter()
                .position(|t| {
                    t.shape == TileShape::Dsp
                        && !t.flipped
                        && t.signedness == crate::shape::Signedness::Fixed { x: sx, y: sy }
                })
                .unwrap()
        };
        // Covers both sign bits.
        assert!(problem.evaluate(find(true, true), 0, 2).is_some());
        assert!(problem.evaluate(find(false, false), 0, 2).is_none());
        // Covers neither.
        assert!(problem.evaluate(find(false, false), -20, -15).is_some());
        assert!(problem.evaluate(find(true, true), -20, -15).is_none());
    }

    #[test]
    fn candidates_are_deduplicated() {
        let mut p = params(6, 6, 0, false, true);
        p.tiling.dsp_occupation_threshold = 0.0;
        let target = load_target_for(&p).unwrap();
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&p, target.as_ref(), &sink).unwrap();
        let all = problem.all_candidates();
        let mut sets: Vec<_> = all.iter().map(|c| c.projection.cells.clone()).collect();
        let n = sets.len();
        sets.sort();
        sets.dedup();
        assert_eq!(sets.len(), n);
        assert!(all.iter().any(|c| c.projection.cells.len() == 36 && c.dsp_units == 1));
        assert!(problem.cell_estimate() > 0.0);
    }

    #[test]
    fn optional_only_placements_are_illegal() {
        let p = params(8, 8, 8, false, false);
        let target = load_target_for(&p).unwrap();
        let sink = DiagnosticSink::new();
        let problem = TilingProblem::new(&p, target.as_ref(), &sink).unwrap();
        assert!(!problem.grid.is_required(0, 0));
        assert!(problem.evaluate(problem.collection.unit(), 0, 0).is_none());
        assert!(problem.evaluate(problem.collection.unit(), 7, 7).is_some());
        let all = problem.all_candidates();
        assert!(all
            .iter()
            .any(|c| c.projection.cells == [(0, 0)] && c.required == 0));
    }
}
