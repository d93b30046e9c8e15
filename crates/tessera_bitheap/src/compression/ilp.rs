//! Compression as an integer program.
//!
//! Integer `N[s][c]` counts the bits in column `c` at the start of stage
//! `s`; integer `k[s][c][t]` counts instances of shape `t` placed at column
//! `c` in stage `s`. Every bit must be consumed (by a compressor or a
//! flip-flop), every output lands in the next stage and after the last
//! stage each column fits the final adder. The objective is total area.
//!
//! The same rows are appended to the joint tiling model, where the stage 0
//! heights are linear in the tile variables.

use super::heuristic::simulate;
use super::{CompressionContext, CompressionStrategy, HeuristicCompression, StagePlan, MAX_STAGES};
use crate::compressor::CompressorCatalog;
use std::time::Duration;
use tessera_common::{TesseraError, TesseraResult};
use tessera_diagnostics::{Diagnostic, DiagnosticCode};
use tessera_ilp::{IlpBackend, IlpModel, IlpSolution, Sense, SolveStatus, VarId};

/// Stage 0 height of one column: `constant + sum(coef * var)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialColumn {
    /// Tile variables contributing bits, with their bit counts.
    pub terms: Vec<(VarId, i128)>,
    /// Bits present regardless of the tile choice.
    pub constant: i128,
}

impl InitialColumn {
    /// A column of known height.
    pub fn fixed(height: u32) -> Self {
        Self {
            terms: Vec::new(),
            constant: i128::from(height),
        }
    }
}

/// Variables created by [`add_compression_model`].
#[derive(Debug, Clone)]
pub struct CompressionVars {
    /// Number of stages modelled.
    pub stages: u32,
    /// `heights[s][c]`, for `s` in `0..=stages`.
    pub heights: Vec<Vec<VarId>>,
    /// `counts[s][c][t]`.
    pub counts: Vec<Vec<Vec<VarId>>>,
}

/// Appends the compression rows for `stages` stages to `model`.
///
/// `upper` bounds every count variable; the total number of bits that can
/// enter the heap is a safe choice.
pub fn add_compression_model(
    model: &mut IlpModel,
    initial: &[InitialColumn],
    upper: u32,
    stages: u32,
    catalog: &CompressorCatalog,
    arity: u32,
) -> CompressionVars {
    let width = initial.len();
    let upper = i64::from(upper.max(1));
    let shapes = catalog.shapes();

    let heights: Vec<Vec<VarId>> = (0..=stages)
        .map(|s| {
            (0..width)
                .map(|c| model.add_integer(format!("N_{s}_{c}"), upper, 0.0))
                .collect()
        })
        .collect();
    let counts: Vec<Vec<Vec<VarId>>> = (0..stages)
        .map(|s| {
            (0..width)
                .map(|c| {
                    shapes
                        .iter()
                        .enumerate()
                        .map(|(t, shape)| {
                            model.add_integer(format!("k_{s}_{c}_{t}"), upper, shape.area)
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    for (c, column) in initial.iter().enumerate() {
        let terms = std::iter::once((heights[0][c], 1))
            .chain(column.terms.iter().map(|&(v, a)| (v, -a)));
        model.add_constraint(format!("init_{c}"), terms, Sense::Eq, column.constant);
    }

    for s in 0..stages as usize {
        for c in 0..width {
            let mut consumed = vec![(heights[s][c], -1i128)];
            let mut produced = vec![(heights[s + 1][c], 1i128)];
            for (t, shape) in shapes.iter().enumerate() {
                for j in 0..shape.span().min(c + 1) {
                    let n = shape.inputs_at(j);
                    if n > 0 {
                        consumed.push((counts[s][c - j][t], i128::from(n)));
                    }
                }
                for i in 0..(shape.outputs as usize).min(c + 1) {
                    produced.push((counts[s][c - i][t], -1));
                }
            }
            model.add_constraint(format!("consume_{s}_{c}"), consumed, Sense::Ge, 0);
            model.add_constraint(format!("produce_{s}_{c}"), produced, Sense::Eq, 0);
        }
    }

    for c in 0..width {
        model.add_constraint(
            format!("final_{c}"),
            [(heights[stages as usize][c], 1)],
            Sense::Le,
            i128::from(arity),
        );
    }

    CompressionVars {
        stages,
        heights,
        counts,
    }
}

impl CompressionVars {
    /// Reads the stage plans out of a solution.
    pub fn plans(&self, solution: &IlpSolution) -> Vec<StagePlan> {
        self.counts
            .iter()
            .map(|stage| {
                let mut plan = StagePlan::default();
                for (c, shapes) in stage.iter().enumerate() {
                    for (t, &var) in shapes.iter().enumerate() {
                        let count = solution.value(var).max(0) as u32;
                        plan.add(c as u32, t, count);
                    }
                }
                plan
            })
            .collect()
    }

    /// Writes a simulated heuristic run into `values` as a starting point.
    ///
    /// `plans` must hold exactly [`stages`](Self::stages) stages.
    pub fn fill_warm_start(
        &self,
        values: &mut [i64],
        initial: &[u32],
        plans: &[StagePlan],
        catalog: &CompressorCatalog,
    ) {
        let mut current = initial.to_vec();
        for (c, &h) in current.iter().enumerate() {
            values[self.heights[0][c].index()] = i64::from(h);
        }
        for (s, plan) in plans.iter().enumerate().take(self.stages as usize) {
            let mut next = vec![0u32; current.len()];
            for p in &plan.compressors {
                values[self.counts[s][p.column as usize][p.shape].index()] += i64::from(p.count);
                if let Some(shape) = catalog.shape(p.shape) {
                    for i in 0..shape.outputs as usize {
                        if let Some(slot) = next.get_mut(p.column as usize + i) {
                            *slot += p.count;
                        }
                    }
                }
            }
            for (c, &h) in next.iter().enumerate() {
                values[self.heights[s + 1][c].index()] = i64::from(h);
            }
            current = next;
        }
    }
}

/// Solves the whole compression as one integer program on the first stage
/// and replays the result.
#[derive(Debug)]
pub struct IlpCompression {
    solver: Box<dyn IlpBackend>,
    timeout: Duration,
    max_relaxations: u32,
    operands: (u32, u32, u32),
    plans: Option<Vec<StagePlan>>,
    fallback: HeuristicCompression,
}

impl IlpCompression {
    /// Creates the strategy around a solver.
    pub fn new(solver: Box<dyn IlpBackend>, timeout: Duration, max_relaxations: u32) -> Self {
        Self {
            solver,
            timeout,
            max_relaxations,
            operands: (0, 0, 0),
            plans: None,
            fallback: HeuristicCompression,
        }
    }

    /// Records the multiplier dimensions reported when every attempt fails.
    pub fn for_operator(mut self, wx: u32, wy: u32, w_out: u32) -> Self {
        self.operands = (wx, wy, w_out);
        self
    }

    fn solve(
        &self,
        heights: &[u32],
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<Vec<StagePlan>> {
        let catalog = &ctx.catalog;
        let heuristic =
            simulate(heights, catalog, ctx.arity, MAX_STAGES)
                .ok_or_else(|| ctx.stuck_error(0, heights))?;
        let heuristic_stages = heuristic.len() as u32;
        let mut stages = heuristic_stages.saturating_sub(1).max(1);
        let upper: u32 = heights.iter().sum();
        let initial: Vec<InitialColumn> =
            heights.iter().map(|&h| InitialColumn::fixed(h)).collect();

        let mut attempts = 0;
        while attempts <= self.max_relaxations {
            attempts += 1;
            let mut model = IlpModel::new();
            let vars =
                add_compression_model(&mut model, &initial, upper, stages, catalog, ctx.arity);
            let warm = (stages == heuristic_stages).then(|| {
                let mut values = vec![0i64; model.num_vars()];
                vars.fill_warm_start(&mut values, heights, &heuristic, catalog);
                values
            });
            let solution = self.solver.solve(&model, self.timeout, warm.as_deref());
            match solution.status {
                SolveStatus::Optimal => return Ok(vars.plans(&solution)),
                SolveStatus::Feasible => {
                    ctx.emit(
                        Diagnostic::warning(
                            DiagnosticCode::ILP_TIMEOUT,
                            format!(
                                "compression ILP timed out after {} ms; using the best solution found",
                                self.timeout.as_millis()
                            ),
                        )
                        .with_note(format!("{} nodes explored", solution.nodes)),
                    );
                    return Ok(vars.plans(&solution));
                }
                SolveStatus::Infeasible | SolveStatus::TimedOut => {
                    ctx.emit(Diagnostic::note(
                        DiagnosticCode::ILP_RELAXED,
                        format!(
                            "no compression in {stages} stage(s) ({:?}); trying {}",
                            solution.status,
                            stages + 1
                        ),
                    ));
                    stages += 1;
                }
            }
        }
        let (wx, wy, w_out) = self.operands;
        Err(TesseraError::TilingInfeasible {
            method: "ilp-compression".to_string(),
            wx,
            wy,
            w_out,
            attempts,
        })
    }
}

impl CompressionStrategy for IlpCompression {
    fn name(&self) -> &str {
        "ilp"
    }

    fn next_stage(
        &mut self,
        stage: u32,
        heights: &[u32],
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<StagePlan> {
        if self.plans.is_none() {
            self.plans = Some(self.solve(heights, ctx)?);
        }
        match self.plans.as_ref().and_then(|p| p.get(stage as usize)) {
            Some(plan) if plan.compresses(&ctx.catalog) => Ok(plan.clone()),
            _ => self.fallback.next_stage(stage, heights, ctx),
        }
    }
}
