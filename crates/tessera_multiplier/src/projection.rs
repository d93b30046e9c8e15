//! Branching a tiling onto the bit heap.
//!
//! Output bit `i` of a placed tile lands in column `base + i`. The biases
//! that keep signed tile outputs non-negative and the rounding constant of
//! a truncated product are folded into one constant, so the heap sums to
//! `X * Y + K` modulo `2^width`. A truncated heap is one column wider than
//! the product: `X * Y + K` may reach `2^wFull`, and that carry is what
//! the output saturates on.

use serde::{Deserialize, Serialize};
use tessera_arch::Target;
use tessera_bitheap::{BitHeap, BitSource, BitTiming, PipelineSchedule};
use tessera_common::{BitId, TesseraError, TesseraResult};
use tessera_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use tessera_tiling::{Placement, ProductGrid, Solution, TileCollection, TileProjection};

/// A placed tile and the heap bits it drives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedTile {
    /// The placement.
    pub placement: Placement,
    /// Name of the tile parametrization.
    pub tile: String,
    /// Hard multiplier blocks the tile uses.
    pub dsp_units: u32,
    /// LUT-equivalent cost, hard blocks included.
    pub cost: f64,
    /// Cost of the LUTs alone.
    pub lut_cost: f64,
    /// What the tile computes.
    pub projection: TileProjection,
    /// When the tile output is available.
    pub timing: BitTiming,
    /// Heap bit of each output bit; `None` above the heap width.
    pub bits: Vec<Option<BitId>>,
}

impl ProjectedTile {
    /// Returns `true` if the tile is a hard multiplier.
    pub fn is_dsp(&self) -> bool {
        self.dsp_units > 0
    }
}

/// Builds the heap for a solution: one signal per tile output bit plus the
/// merged constant.
///
/// # Errors
///
/// Fails if a placement does not project onto the grid.
pub fn project_solution(
    grid: &ProductGrid,
    collection: &TileCollection,
    solution: &Solution,
    target: &dyn Target,
    schedule: &PipelineSchedule,
) -> TesseraResult<(BitHeap, Vec<ProjectedTile>)> {
    let width = grid.heap_width();
    let mask = if width >= 128 { u128::MAX } else { (1u128 << width) - 1 };
    let mut heap = BitHeap::new(width);
    let mut tiles = Vec::with_capacity(solution.len());
    let mut bias = 0u128;

    for (index, (placement, projection)) in solution
        .placements()
        .iter()
        .zip(solution.projections(collection, grid)?)
        .enumerate()
    {
        let param = collection
            .get(placement.param)
            .ok_or_else(|| TesseraError::internal(format!("unknown tile {}", placement.param)))?;
        let delay = target
            .tile_delay(param.dsp_units, projection.in_x, projection.in_y, projection.out_bits)
            .max_ns;
        let timing = schedule.after(BitTiming::START, delay);
        let cost = projection.cost(param, target);
        let lut_cost = if param.dsp_units > 0 {
            target.tile_lut_cost(param.extra_luts, projection.out_bits)
        } else {
            cost
        };
        let bits = (0..projection.out_bits)
            .map(|i| {
                heap.add_signal(
                    format!("t{index}_o{i}"),
                    projection.base + i,
                    timing,
                    BitSource::External {
                        producer: index as u32,
                        bit: i,
                    },
                )
            })
            .collect();
        bias = bias.wrapping_add(projection.offset.wrapping_shl(projection.base)) & mask;
        tiles.push(ProjectedTile {
            placement: *placement,
            tile: param.name.clone(),
            dsp_units: param.dsp_units,
            cost,
            lut_cost,
            projection,
            timing,
            bits,
        });
    }

    let constant = grid.truncation().heap_constant().wrapping_sub(bias) & mask;
    heap.add_constant(constant);
    Ok((heap, tiles))
}

/// Raises the heap LSB as far as the error budget allows once
/// `omitted` weight is already spent on uncovered cells. Returns the
/// maximal value dropped.
///
/// Only columns below the first output bit are candidates.
///
/// # Errors
///
/// Fails if compression has already started.
pub fn prune_lsb(
    heap: &mut BitHeap,
    grid: &ProductGrid,
    omitted: u128,
    sink: &DiagnosticSink,
    operator: &str,
) -> TesseraResult<u128> {
    let truncation = grid.truncation();
    if truncation.is_exact() {
        return Ok(0);
    }
    let budget = truncation.budget();
    let Some(lsb) = (1..=truncation.truncated_bits)
        .rev()
        .find(|&l| omitted.saturating_add(heap.weight_below(l)) <= budget)
    else {
        return Ok(0);
    };
    let dropped: u32 = (0..lsb).map(|w| heap.column_height(w)).sum();
    let removed = heap.prune_lsb(lsb)?;
    sink.emit(
        Diagnostic::note(
            DiagnosticCode::LSB_PRUNED,
            format!("bit heap LSB raised to column {lsb}, dropping {dropped} bit(s)"),
        )
        .with_context(operator)
        .with_note(format!(
            "omitted weight {} of budget {budget}",
            omitted + removed
        )),
    );
    Ok(removed)
}
