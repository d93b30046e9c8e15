//! Greedy efficiency-ranked compression.
//!
//! Columns are planned from the LSB upward. A column keeps receiving
//! compressors while the bits left in it plus the outputs landing in it
//! exceed the adder arity; the leftover bits are forwarded through
//! flip-flop entries.

use super::{CompressionContext, CompressionStrategy, StagePlan};
use crate::compressor::{CompressorCatalog, CompressorShape};
use serde::{Deserialize, Serialize};
use tessera_common::TesseraResult;

/// How the planner picks among applicable compressors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanningMode {
    /// Most efficient compressor first; zero-gain compressors only when
    /// they finish the column.
    Heuristic,
    /// Any compressor, the one swallowing the most bits of the current
    /// column first.
    Wallace,
}

/// Plans one stage over bare column heights.
///
/// Returns the plan and the heights the next stage will see.
pub fn plan_stage(
    heights: &[u32],
    catalog: &CompressorCatalog,
    arity: u32,
    mode: PlanningMode,
) -> (StagePlan, Vec<u32>) {
    let n = heights.len();
    let mut remaining = heights.to_vec();
    let mut landing = vec![0u32; n];
    let mut plan = StagePlan::default();
    let flip_flop = catalog.flip_flop();

    for c in 0..n {
        while remaining[c] + landing[c] > arity {
            let Some(index) = pick_shape(c, &remaining, &landing, catalog, arity, mode) else {
                break;
            };
            let shape = &catalog.shapes()[index];
            for j in 0..shape.span() {
                if c + j < n {
                    remaining[c + j] -= shape.inputs_at(j);
                }
            }
            for i in 0..shape.outputs as usize {
                if c + i < n {
                    landing[c + i] += 1;
                }
            }
            plan.add(c as u32, index, 1);
        }
        if remaining[c] > 0 {
            if let Some(ff) = flip_flop {
                plan.add(c as u32, ff, remaining[c]);
            }
            landing[c] += remaining[c];
            remaining[c] = 0;
        }
    }
    (plan, landing)
}

fn applicable(shape: &CompressorShape, c: usize, remaining: &[u32]) -> bool {
    if shape.is_flip_flop() || shape.inputs_at(0) < 2 {
        return false;
    }
    shape.inputs.iter().enumerate().all(|(j, &need)| {
        let have = remaining.get(c + j).copied().unwrap_or(0);
        need <= have
    })
}

fn neighbor_relief(shape: &CompressorShape, c: usize, remaining: &[u32]) -> u64 {
    shape
        .inputs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(j, &n)| u64::from(n) * u64::from(remaining.get(c + j).copied().unwrap_or(0)))
        .sum()
}

fn pick_shape(
    c: usize,
    remaining: &[u32],
    landing: &[u32],
    catalog: &CompressorCatalog,
    arity: u32,
    mode: PlanningMode,
) -> Option<usize> {
    let candidates = catalog
        .shapes()
        .iter()
        .enumerate()
        .filter(|(_, s)| applicable(s, c, remaining));
    match mode {
        PlanningMode::Heuristic => candidates
            .filter(|(_, s)| {
                s.efficiency() > 0.0
                    || remaining[c] - s.inputs_at(0) + landing[c] + 1 <= arity
            })
            .min_by(|(ia, a), (ib, b)| {
                b.efficiency()
                    .total_cmp(&a.efficiency())
                    .then_with(|| {
                        neighbor_relief(b, c, remaining).cmp(&neighbor_relief(a, c, remaining))
                    })
                    .then_with(|| b.inputs_at(0).cmp(&a.inputs_at(0)))
                    .then_with(|| ia.cmp(ib))
            })
            .map(|(i, _)| i),
        PlanningMode::Wallace => candidates
            .min_by(|(ia, a), (ib, b)| {
                b.inputs_at(0)
                    .cmp(&a.inputs_at(0))
                    .then_with(|| b.efficiency().total_cmp(&a.efficiency()))
                    .then_with(|| ia.cmp(ib))
            })
            .map(|(i, _)| i),
    }
}

/// Plans stages until the heights fit `arity`, without touching a heap.
///
/// Returns one plan per stage, or `None` if some stage cannot make
/// progress.
pub fn simulate(
    heights: &[u32],
    catalog: &CompressorCatalog,
    arity: u32,
    max_stages: u32,
) -> Option<Vec<StagePlan>> {
    let mut heights = heights.to_vec();
    let mut plans = Vec::new();
    while heights.iter().any(|&h| h > arity) {
        if plans.len() as u32 >= max_stages {
            return None;
        }
        let (plan, next) = plan_with_fallback(&heights, catalog, arity)?;
        plans.push(plan);
        heights = next;
    }
    Some(plans)
}

fn plan_with_fallback(
    heights: &[u32],
    catalog: &CompressorCatalog,
    arity: u32,
) -> Option<(StagePlan, Vec<u32>)> {
    let (plan, next) = plan_stage(heights, catalog, arity, PlanningMode::Heuristic);
    if plan.compresses(catalog) {
        return Some((plan, next));
    }
    let (plan, next) = plan_stage(heights, catalog, arity, PlanningMode::Wallace);
    plan.compresses(catalog).then_some((plan, next))
}

/// The default strategy: efficiency-ranked planning with a Wallace-style
/// retry when a stage would stall.
#[derive(Debug, Clone, Default)]
pub struct HeuristicCompression;

impl CompressionStrategy for HeuristicCompression {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn next_stage(
        &mut self,
        stage: u32,
        heights: &[u32],
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<StagePlan> {
        plan_with_fallback(heights, &ctx.catalog, ctx.arity)
            .map(|(plan, _)| plan)
            .ok_or_else(|| ctx.stuck_error(stage, heights))
    }
}
