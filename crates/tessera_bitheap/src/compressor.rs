//! Compressor shapes, the catalog the strategies choose from, and the
//! instances placed in a heap.

use crate::schedule::BitTiming;
use serde::{Deserialize, Serialize};
use tessera_arch::Target;
use tessera_common::{BitId, CompressorId};
use tessera_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

/// A generalized parallel counter.
///
/// `inputs[j]` bits are consumed from column `c + j` (LSB first) and the
/// binary sum of their weighted values is produced as `outputs` bits in
/// columns `c .. c + outputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorShape {
    /// Conventional name, heights listed MSB first (e.g. "(1,5;3)").
    pub name: String,
    /// Input bits per column, LSB first.
    pub inputs: Vec<u32>,
    /// Number of output bits.
    pub outputs: u32,
    /// LUT-equivalent area.
    pub area: f64,
}

impl CompressorShape {
    /// Builds a shape for the given target; the output count is derived
    /// from the maximal input value.
    pub fn new(inputs: Vec<u32>, target: &dyn Target) -> Self {
        let max: u64 = inputs
            .iter()
            .enumerate()
            .map(|(j, &n)| u64::from(n) << j)
            .sum();
        let outputs = (64 - max.leading_zeros()).max(1);
        let heights: Vec<String> = inputs.iter().rev().map(u32::to_string).collect();
        let total: u32 = inputs.iter().sum();
        Self {
            name: format!("({};{outputs})", heights.join(",")),
            area: target.compressor_area(total, outputs),
            inputs,
            outputs,
        }
    }

    /// Total input bits over all columns.
    pub fn total_inputs(&self) -> u32 {
        self.inputs.iter().sum()
    }

    /// Returns `true` for the 1-in/1-out register stage.
    pub fn is_flip_flop(&self) -> bool {
        self.inputs == [1] && self.outputs == 1
    }

    /// Bits removed from the heap per unit area.
    pub fn efficiency(&self) -> f64 {
        let gain = f64::from(self.total_inputs()) - f64::from(self.outputs);
        if self.area <= 0.0 || gain <= 0.0 {
            0.0
        } else {
            gain / self.area
        }
    }

    /// Input bits taken from relative column `j`.
    pub fn inputs_at(&self, j: usize) -> u32 {
        self.inputs.get(j).copied().unwrap_or(0)
    }

    /// Number of input columns.
    pub fn span(&self) -> usize {
        self.inputs.len()
    }
}

/// The compressors available to a compression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorCatalog {
    shapes: Vec<CompressorShape>,
}

impl CompressorCatalog {
    /// The standard catalog: flip-flop, half adder, full adder, (6;3),
    /// (1,5;3) and (2,3;3).
    pub fn standard(target: &dyn Target) -> Self {
        let shapes = [
            vec![1],
            vec![2],
            vec![3],
            vec![6],
            vec![5, 1],
            vec![3, 2],
        ]
        .into_iter()
        .map(|inputs| CompressorShape::new(inputs, target))
        .collect();
        Self { shapes }
    }

    /// A catalog of explicitly chosen shapes.
    pub fn from_shapes(shapes: Vec<CompressorShape>) -> Self {
        Self { shapes }
    }

    /// All shapes in catalog order.
    pub fn shapes(&self) -> &[CompressorShape] {
        &self.shapes
    }

    /// The shape at `index`.
    pub fn shape(&self, index: usize) -> Option<&CompressorShape> {
        self.shapes.get(index)
    }

    /// Index of the flip-flop shape, if present.
    pub fn flip_flop(&self) -> Option<usize> {
        self.shapes.iter().position(CompressorShape::is_flip_flop)
    }

    /// Adds the trivial 1-in/1-out compressor if the catalog lacks it.
    ///
    /// Returns `true` if a repair was made; a warning is emitted then.
    pub fn ensure_flip_flop(&mut self, sink: &DiagnosticSink) -> bool {
        if self.flip_flop().is_some() {
            return false;
        }
        self.shapes.push(CompressorShape {
            name: "(1;1)".to_string(),
            inputs: vec![1],
            outputs: 1,
            area: 0.0,
        });
        sink.emit(
            Diagnostic::warning(
                DiagnosticCode::CATALOG_REPAIRED,
                "compressor catalog has no flip-flop; added a (1;1) compressor",
            )
            .with_note("uncompressed bits are forwarded to the next stage through it"),
        );
        true
    }
}

/// A compressor placed in the heap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorInstance {
    /// Instance ID, in creation order.
    pub id: CompressorId,
    /// Index of the shape in the run's catalog.
    pub shape: usize,
    /// Shape name, kept for reporting.
    pub name: String,
    /// Compression stage the instance belongs to.
    pub stage: u32,
    /// Weight of the lowest input column.
    pub column: u32,
    /// Consumed bits per relative column; may hold fewer bits than the
    /// shape accepts, the missing inputs are tied to zero.
    pub inputs: Vec<Vec<BitId>>,
    /// Produced bits, LSB first; outputs at or above the heap width are
    /// not materialized.
    pub outputs: Vec<BitId>,
    /// When the outputs are available.
    pub timing: BitTiming,
    /// LUT-equivalent area.
    pub area: f64,
}
