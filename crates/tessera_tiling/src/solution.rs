//! Placements, their projection onto the bit heap, and tiling solutions.

use crate::collection::TileCollection;
use crate::grid::ProductGrid;
use crate::shape::{Parametrization, Signedness};
use serde::{Deserialize, Serialize};
use tessera_arch::Target;
use tessera_common::{PlacementId, TesseraError, TesseraResult};

/// A tile anchored on the grid. The anchor is the grid position of the
/// tile's local origin and may lie off the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Placement ID, in solution order.
    pub id: PlacementId,
    /// Index into the tile collection.
    pub param: usize,
    /// Grid X of the tile origin.
    pub anchor_x: i64,
    /// Grid Y of the tile origin.
    pub anchor_y: i64,
}

/// What a placed tile computes and where its result lands.
///
/// The tile value `V` is the signed sum of its covered cells' products,
/// scaled so its lowest weight is `base`. The tile outputs the unsigned
/// `V + offset` on `out_bits` wires; the constant `-offset * 2^base` goes to
/// the bit heap separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileProjection {
    /// Covered on-grid cells.
    pub cells: Vec<(u32, u32)>,
    /// Grid weight of output bit 0.
    pub base: u32,
    /// Output width.
    pub out_bits: u32,
    /// Bias making the output non-negative.
    pub offset: u128,
    /// Distinct X operand bits read.
    pub in_x: u32,
    /// Distinct Y operand bits read.
    pub in_y: u32,
    /// Lowest X operand bit read.
    pub x_lo: u32,
    /// Lowest Y operand bit read.
    pub y_lo: u32,
    /// Whether the tile reads the X sign bit.
    pub signed_x: bool,
    /// Whether the tile reads the Y sign bit.
    pub signed_y: bool,
}

impl TileProjection {
    /// Projects `param` anchored at `(ax, ay)`; `None` if it covers no
    /// on-grid cell.
    pub fn of(param: &Parametrization, ax: i64, ay: i64, grid: &ProductGrid) -> Option<Self> {
        let cells: Vec<(u32, u32)> = param
            .cells()
            .map(|(lx, ly)| (ax + i64::from(lx), ay + i64::from(ly)))
            .filter(|&(x, y)| grid.contains(x, y))
            .map(|(x, y)| (x as u32, y as u32))
            .collect();
        let base = cells.iter().map(|&(x, y)| x + y).min()?;
        let (mut positive, mut negative) = (0u128, 0u128);
        for &(x, y) in &cells {
            let w = 1u128 << (x + y - base);
            if grid.is_negative(x, y) {
                negative += w;
            } else {
                positive += w;
            }
        }
        let range = positive + negative;
        let out_bits = (128 - range.leading_zeros()).max(1);
        let mut xs: Vec<u32> = cells.iter().map(|c| c.0).collect();
        let mut ys: Vec<u32> = cells.iter().map(|c| c.1).collect();
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();
        Some(Self {
            base,
            out_bits,
            offset: negative,
            in_x: xs.len() as u32,
            in_y: ys.len() as u32,
            x_lo: xs[0],
            y_lo: ys[0],
            signed_x: grid.signed() && xs.last() == Some(&(grid.wx() - 1)),
            signed_y: grid.signed() && ys.last() == Some(&(grid.wy() - 1)),
            cells,
        })
    }

    /// The tile output for raw operand bit patterns `x` and `y`.
    pub fn value(&self, grid: &ProductGrid, x: u64, y: u64) -> u128 {
        let mut v = self.offset as i128;
        for &(cx, cy) in &self.cells {
            if (x >> cx) & 1 == 1 && (y >> cy) & 1 == 1 {
                let w = 1i128 << (cx + cy - self.base);
                if grid.is_negative(cx, cy) {
                    v -= w;
                } else {
                    v += w;
                }
            }
        }
        v as u128
    }

    /// LUT-equivalent cost of the placed tile.
    pub fn cost(&self, param: &Parametrization, target: &dyn Target) -> f64 {
        if param.dsp_units > 0 {
            target.tile_dsp_cost(param.dsp_units)
                + target.tile_lut_cost(param.extra_luts, self.out_bits)
        } else {
            let luts = target.lut_multiplier_luts(self.in_x, self.in_y, self.out_bits);
            target.tile_lut_cost(luts, self.out_bits)
        }
    }

    /// Fraction of the tile's cells that lie on the grid.
    pub fn occupation(&self, param: &Parametrization) -> f64 {
        f64::from(self.cells.len() as u32) / f64::from(param.area().max(1))
    }
}

/// Whether a hard multiplier's port signedness matches the operand bits
/// it reads at this anchor.
pub fn signedness_matches(param: &Parametrization, proj: &TileProjection) -> bool {
    match param.signedness {
        Signedness::Any => true,
        Signedness::Fixed { x, y } => x == proj.signed_x && y == proj.signed_y,
    }
}

/// An ordered list of placements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    placements: Vec<Placement>,
}

impl Solution {
    /// An empty solution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a placement and returns its ID.
    pub fn push(&mut self, param: usize, anchor_x: i64, anchor_y: i64) -> PlacementId {
        let id = PlacementId::from_raw(self.placements.len() as u32);
        self.placements.push(Placement {
            id,
            param,
            anchor_x,
            anchor_y,
        });
        id
    }

    /// Placements in order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Number of placements.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Returns `true` if nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Projections of every placement, in order.
    ///
    /// # Errors
    ///
    /// Fails if a placement names an unknown tile or covers no grid cell.
    pub fn projections(
        &self,
        collection: &TileCollection,
        grid: &ProductGrid,
    ) -> TesseraResult<Vec<TileProjection>> {
        self.placements
            .iter()
            .map(|p| {
                let param = collection.get(p.param).ok_or_else(|| {
                    TesseraError::internal(format!(
                        "placement {} names unknown tile {}",
                        p.id.as_raw(),
                        p.param
                    ))
                })?;
                TileProjection::of(param, p.anchor_x, p.anchor_y, grid).ok_or_else(|| {
                    TesseraError::internal(format!(
                        "placement {} of {} at ({}, {}) covers no grid cell",
                        p.id.as_raw(),
                        param.name,
                        p.anchor_x,
                        p.anchor_y
                    ))
                })
            })
            .collect()
    }

    /// How many placements cover each cell, row-major.
    pub fn coverage(
        &self,
        collection: &TileCollection,
        grid: &ProductGrid,
    ) -> TesseraResult<Vec<u32>> {
        let mut counts = vec![0u32; grid.cell_count()];
        for proj in self.projections(collection, grid)? {
            for (x, y) in proj.cells {
                counts[grid.index(x, y)] += 1;
            }
        }
        Ok(counts)
    }

    /// Checks that no cell is covered twice, every cell that may not be
    /// omitted is covered, and the uncovered weight fits the truncation
    /// budget.
    ///
    /// # Errors
    ///
    /// Returns an internal error naming the first offending cell, or
    /// [`TesseraError::TruncationBudgetExceeded`] for too much uncovered
    /// weight.
    pub fn check_coverage(
        &self,
        collection: &TileCollection,
        grid: &ProductGrid,
    ) -> TesseraResult<()> {
        let counts = self.coverage(collection, grid)?;
        let mut omitted = 0u128;
        for (x, y) in grid.cells() {
            let n = counts[grid.index(x, y)];
            if n > 1 {
                return Err(TesseraError::internal(format!(
                    "cell ({x}, {y}) of the {}x{} grid is covered {n} times",
                    grid.wx(),
                    grid.wy()
                )));
            }
            if n == 0 && !grid.is_omittable(x, y) {
                return Err(TesseraError::internal(format!(
                    "required cell ({x}, {y}) of the {}x{} grid is not covered",
                    grid.wx(),
                    grid.wy()
                )));
            }
            if n == 0 {
                omitted += 1u128 << (x + y);
            }
        }
        let budget = grid.truncation().budget();
        if omitted > budget {
            return Err(TesseraError::TruncationBudgetExceeded {
                omitted,
                budget,
                wx: grid.wx(),
                wy: grid.wy(),
                w_out: grid.w_out(),
            });
        }
        Ok(())
    }

    /// Total LUT-equivalent cost.
    pub fn cost(
        &self,
        collection: &TileCollection,
        grid: &ProductGrid,
        target: &dyn Target,
    ) -> TesseraResult<f64> {
        let projections = self.projections(collection, grid)?;
        Ok(self
            .placements
            .iter()
            .zip(&projections)
            .filter_map(|(p, proj)| collection.get(p.param).map(|param| proj.cost(param, target)))
            .sum())
    }

    /// Hard multiplier blocks used.
    pub fn dsp_count(&self, collection: &TileCollection) -> u32 {
        self.placements
            .iter()
            .filter_map(|p| collection.get(p.param))
            .map(|param| param.dsp_units)
            .sum()
    }
}
