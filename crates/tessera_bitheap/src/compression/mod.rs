//! Stage-by-stage compression of a bit heap.
//!
//! A [`CompressionStrategy`] decides, from the column heights alone, which
//! compressors a stage uses ([`StagePlan`]); the executor in this module
//! then wires concrete bits into them. The driver
//! [`BitHeap::start_compression`] repeats this until every column fits the
//! final adder.

pub mod heuristic;
pub mod ilp;

use crate::compressor::{CompressorCatalog, CompressorInstance};
use crate::final_adder::FinalAdder;
use crate::heap::{BitHeap, BitSource};
use crate::schedule::{BitTiming, PipelineSchedule};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_arch::Target;
use tessera_common::{BitId, CompressorId, TesseraError, TesseraResult};
use tessera_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

pub use heuristic::{plan_stage, simulate, PlanningMode, HeuristicCompression};
pub use ilp::{add_compression_model, CompressionVars, IlpCompression, InitialColumn};

/// Hard cap on compression stages; a strategy that needs more is looping.
pub const MAX_STAGES: u32 = 64;

/// `count` instances of catalog shape `shape` with their lowest input in
/// `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCompressor {
    /// Weight of the lowest input column.
    pub column: u32,
    /// Catalog index.
    pub shape: usize,
    /// Number of instances.
    pub count: u32,
}

/// The compressors one stage applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePlan {
    /// Planned compressors; flip-flop entries only document pass-through.
    pub compressors: Vec<PlannedCompressor>,
}

impl StagePlan {
    /// Adds `count` instances, merging with an existing entry.
    pub fn add(&mut self, column: u32, shape: usize, count: u32) {
        if count == 0 {
            return;
        }
        match self
            .compressors
            .iter_mut()
            .find(|p| p.column == column && p.shape == shape)
        {
            Some(p) => p.count += count,
            None => self.compressors.push(PlannedCompressor {
                column,
                shape,
                count,
            }),
        }
    }

    /// Returns `true` if the plan applies at least one real compressor.
    pub fn compresses(&self, catalog: &CompressorCatalog) -> bool {
        self.compressors.iter().any(|p| {
            p.count > 0
                && catalog
                    .shape(p.shape)
                    .is_some_and(|s| !s.is_flip_flop())
        })
    }
}

/// Everything a strategy and the executor need besides the heap.
pub struct CompressionContext<'a> {
    /// Target the compressors are costed for.
    pub target: &'a dyn Target,
    /// Available compressors; always contains a flip-flop.
    pub catalog: CompressorCatalog,
    /// Rows the final adder accepts.
    pub arity: u32,
    /// Cycle bookkeeping.
    pub schedule: PipelineSchedule,
    /// Where notes and warnings go.
    pub sink: &'a DiagnosticSink,
    /// Operator name attached to diagnostics.
    pub operator: String,
}

impl<'a> CompressionContext<'a> {
    /// Builds a context, repairing a catalog without flip-flop.
    pub fn new(
        target: &'a dyn Target,
        mut catalog: CompressorCatalog,
        arity: u32,
        sink: &'a DiagnosticSink,
        operator: impl Into<String>,
    ) -> Self {
        let operator = operator.into();
        catalog.ensure_flip_flop(sink);
        Self {
            target,
            catalog,
            arity: arity.clamp(2, 3),
            schedule: PipelineSchedule::for_target(target),
            sink,
            operator,
        }
    }

    pub(crate) fn emit(&self, diag: Diagnostic) {
        self.sink.emit(diag.with_context(self.operator.clone()));
    }

    /// The catalog-incomplete error for the first column still above the
    /// adder arity.
    pub fn stuck_error(&self, stage: u32, heights: &[u32]) -> TesseraError {
        let (column, height) = heights
            .iter()
            .enumerate()
            .find(|(_, &h)| h > self.arity)
            .map(|(c, &h)| (c as u32, h))
            .unwrap_or((0, 0));
        TesseraError::CompressorCatalogIncomplete {
            stage,
            column,
            height,
            arity: self.arity,
        }
    }
}

impl fmt::Debug for CompressionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionContext")
            .field("target", &self.target.family_name())
            .field("arity", &self.arity)
            .field("shapes", &self.catalog.shapes().len())
            .finish()
    }
}

/// Chooses the compressors of each stage.
pub trait CompressionStrategy: fmt::Debug {
    /// Short name used in reports.
    fn name(&self) -> &str;

    /// Plans stage `stage` for the given column heights (indexed by weight).
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::CompressorCatalogIncomplete`] when no
    /// compressor can make progress.
    fn next_stage(
        &mut self,
        stage: u32,
        heights: &[u32],
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<StagePlan>;
}

/// Replays precomputed stage plans, then falls back to the heuristic.
#[derive(Debug, Clone, Default)]
pub struct PlannedCompression {
    plans: Vec<StagePlan>,
    fallback: HeuristicCompression,
}

impl PlannedCompression {
    /// Wraps a list of plans, one per stage.
    pub fn new(plans: Vec<StagePlan>) -> Self {
        Self {
            plans,
            fallback: HeuristicCompression::default(),
        }
    }
}

impl CompressionStrategy for PlannedCompression {
    fn name(&self) -> &str {
        "planned"
    }

    fn next_stage(
        &mut self,
        stage: u32,
        heights: &[u32],
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<StagePlan> {
        match self.plans.get(stage as usize) {
            Some(plan) if plan.compresses(&ctx.catalog) => Ok(plan.clone()),
            _ => self.fallback.next_stage(stage, heights, ctx),
        }
    }
}

/// Outcome of a compression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionSummary {
    /// Strategy that planned the stages.
    pub strategy: String,
    /// Stages run.
    pub stages: u32,
    /// Compressor instances created.
    pub compressors: usize,
    /// Total compressor area, final adder included.
    pub area: f64,
    /// Pipeline cycle of the result.
    pub output_cycle: u32,
}

impl BitHeap {
    /// Compresses the heap until every column fits the final adder, then
    /// builds the adder.
    ///
    /// Pending constants are materialized first. Each stage emits a note;
    /// a stage that moves bits into a later pipeline cycle emits a timing
    /// note as well.
    ///
    /// # Errors
    ///
    /// Propagates strategy failures and returns an internal error if the
    /// stage cap is hit.
    pub fn start_compression(
        &mut self,
        strategy: &mut dyn CompressionStrategy,
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<CompressionSummary> {
        if self.final_adder.is_some() {
            return Err(TesseraError::internal("bit heap compressed twice"));
        }
        self.materialize_constants();
        let mut stage = 0u32;
        while self.max_height() > ctx.arity {
            if stage >= MAX_STAGES {
                return Err(TesseraError::internal(format!(
                    "compression did not converge within {MAX_STAGES} stages"
                )));
            }
            let heights = self.heights();
            let plan = strategy.next_stage(stage, &heights, ctx)?;
            if !plan.compresses(&ctx.catalog) {
                return Err(ctx.stuck_error(stage, &heights));
            }
            let before = self.latest_cycle();
            let created = self.execute_stage(stage, &plan, ctx)?;
            if created == 0 {
                return Err(ctx.stuck_error(stage, &heights));
            }
            ctx.emit(Diagnostic::note(
                DiagnosticCode::COMPRESSION_STAGE,
                format!(
                    "stage {stage}: {created} compressor(s), max height {} -> {}",
                    heights.iter().max().copied().unwrap_or(0),
                    self.max_height()
                ),
            ));
            let after = self.latest_cycle();
            if after > before {
                ctx.emit(Diagnostic::note(
                    DiagnosticCode::STAGE_ADVANCE,
                    format!("stage {stage} advances the pipeline to cycle {after}"),
                ));
            }
            stage += 1;
        }
        self.stages = stage;
        let adder = FinalAdder::build(self, ctx.arity, ctx.target, &ctx.schedule)?;
        let area = self.compressors.iter().map(|c| c.area).sum::<f64>() + adder.area;
        let output_cycle = adder.output_cycle();
        self.final_adder = Some(adder);
        Ok(CompressionSummary {
            strategy: strategy.name().to_string(),
            stages: stage,
            compressors: self.compressors.len(),
            area,
            output_cycle,
        })
    }

    fn latest_cycle(&self) -> u32 {
        (self.lsb()..self.width())
            .flat_map(|w| self.column(w).iter())
            .map(|&id| self.bit(id).timing.cycle)
            .max()
            .unwrap_or(0)
    }

    /// Wires one stage plan into concrete bits. Returns the number of
    /// compressor instances created.
    ///
    /// Only bits present when the stage starts are consumed, earliest
    /// first. An instance gathers at most `inputs[j]` bits per column; a
    /// shortfall is tied to zero and an instance that finds no bit at all is
    /// skipped. Flip-flop entries are not materialized.
    fn execute_stage(
        &mut self,
        stage: u32,
        plan: &StagePlan,
        ctx: &CompressionContext<'_>,
    ) -> TesseraResult<usize> {
        let width = self.width();
        let mut available: Vec<Vec<BitId>> = (0..width)
            .map(|w| {
                let mut ids = self.column(w).to_vec();
                ids.sort_by(|a, b| self.bit(*a).timing.cmp_time(&self.bit(*b).timing));
                ids.reverse();
                ids
            })
            .collect();
        let delay = ctx.target.compressor_delay().max_ns;
        let mut created = 0;

        for planned in &plan.compressors {
            let shape = ctx.catalog.shape(planned.shape).ok_or_else(|| {
                TesseraError::internal(format!("stage plan names unknown shape {}", planned.shape))
            })?;
            if shape.is_flip_flop() {
                continue;
            }
            for _ in 0..planned.count {
                let mut inputs: Vec<Vec<BitId>> = Vec::with_capacity(shape.span());
                for j in 0..shape.span() {
                    let weight = planned.column as usize + j;
                    let mut taken = Vec::new();
                    if let Some(column) = available.get_mut(weight) {
                        for _ in 0..shape.inputs_at(j) {
                            match column.pop() {
                                Some(id) => taken.push(id),
                                None => break,
                            }
                        }
                    }
                    inputs.push(taken);
                }
                if inputs.iter().all(Vec::is_empty) {
                    continue;
                }
                let start = PipelineSchedule::latest_of(
                    inputs.iter().flatten().map(|&id| self.bit(id).timing),
                );
                let timing: BitTiming = ctx.schedule.after(start, delay);
                for (j, taken) in inputs.iter().enumerate() {
                    let weight = planned.column + j as u32;
                    self.column_mut(weight).retain(|id| !taken.contains(id));
                }

                let instance = self.compressors.len() as u32;
                let mut outputs = Vec::with_capacity(shape.outputs as usize);
                for i in 0..shape.outputs {
                    let weight = planned.column + i;
                    if weight >= width {
                        break;
                    }
                    outputs.push(self.push_bit(
                        format!("cmp{instance}_s{stage}_o{i}"),
                        weight,
                        stage + 1,
                        timing,
                        BitSource::Compressor {
                            instance,
                            output: i,
                        },
                    ));
                }
                self.compressors.push(CompressorInstance {
                    id: CompressorId::from_raw(instance),
                    shape: planned.shape,
                    name: shape.name.clone(),
                    stage,
                    column: planned.column,
                    inputs,
                    outputs,
                    timing,
                    area: shape.area,
                });
                created += 1;
            }
        }
        Ok(created)
    }
}
