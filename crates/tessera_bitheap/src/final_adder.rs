//! The carry-propagate adder that sums the rows left after compression.

use crate::heap::{modulus_mask, BitHeap};
use crate::schedule::{BitTiming, PipelineSchedule};
use serde::{Deserialize, Serialize};
use tessera_arch::Target;
use tessera_common::{BitId, TesseraError, TesseraResult};

/// A two- or three-input adder over the remaining heap bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAdder {
    /// Number of operand rows.
    pub arity: u32,
    /// Adder width; the sum is taken modulo `2^width`.
    pub width: u32,
    /// Lowest weight summed.
    pub lsb: u32,
    /// Operand rows, each indexed by weight; `None` is a constant zero.
    pub rows: Vec<Vec<Option<BitId>>>,
    /// When the sum is available.
    pub timing: BitTiming,
    /// LUT-equivalent area.
    pub area: f64,
}

impl FinalAdder {
    /// Collects the bits still waiting in `heap` into `arity` rows.
    ///
    /// # Errors
    ///
    /// Fails if some column holds more than `arity` bits.
    pub fn build(
        heap: &BitHeap,
        arity: u32,
        target: &dyn Target,
        schedule: &PipelineSchedule,
    ) -> TesseraResult<Self> {
        let width = heap.width();
        let lsb = heap.lsb();
        let mut rows = vec![vec![None; width as usize]; arity as usize];
        let mut latest = BitTiming::START;
        for weight in lsb..width {
            let column = heap.column(weight);
            if column.len() > arity as usize {
                return Err(TesseraError::internal(format!(
                    "final adder built over column {weight} of height {} (arity {arity})",
                    column.len()
                )));
            }
            for (row, &id) in column.iter().enumerate() {
                rows[row][weight as usize] = Some(id);
                latest = latest.latest(heap.bit(id).timing);
            }
        }
        let span = width.saturating_sub(lsb);
        let delay = target.adder_delay(span).max_ns;
        let area = if arity == 3 {
            2.0 * f64::from(span)
        } else {
            f64::from(span)
        };
        Ok(Self {
            arity,
            width,
            lsb,
            rows,
            timing: schedule.after(latest, delay),
            area,
        })
    }

    /// Pipeline cycle in which the result is available.
    pub fn output_cycle(&self) -> u32 {
        self.timing.cycle
    }

    /// Sums the rows under a valuation of every heap bit.
    pub fn evaluate(&self, values: &[bool]) -> u128 {
        let mask = modulus_mask(self.width);
        let mut sum = 0u128;
        for row in &self.rows {
            let mut value = 0u128;
            for (weight, bit) in row.iter().enumerate() {
                if let Some(id) = bit {
                    if values[id.index()] {
                        value |= 1u128 << weight;
                    }
                }
            }
            sum = sum.wrapping_add(value) & mask;
        }
        sum
    }
}
