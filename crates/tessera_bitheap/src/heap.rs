//! The bit heap: a column-indexed multiset of bit-producing signals.

use crate::compressor::CompressorInstance;
use crate::final_adder::FinalAdder;
use crate::schedule::BitTiming;
use serde::{Deserialize, Serialize};
use tessera_common::{BitId, TesseraError, TesseraResult};

/// Where a heap bit comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitSource {
    /// Output bit `bit` of an external producer (a tile placement).
    External {
        /// Producer index, assigned by the caller.
        producer: u32,
        /// Bit index within the producer's output.
        bit: u32,
    },
    /// A constant one.
    Constant,
    /// Output bit `output` of a compressor instance.
    Compressor {
        /// Index of the instance in [`BitHeap::compressors`].
        instance: u32,
        /// Output bit index.
        output: u32,
    },
}

/// One signal in the heap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapBit {
    /// Arena ID.
    pub id: BitId,
    /// Signal name handed to the emitter.
    pub name: String,
    /// Column (absolute weight).
    pub weight: u32,
    /// Compression stage that produced the bit (0 for tile outputs).
    pub stage: u32,
    /// When the bit is available.
    pub timing: BitTiming,
    /// Producer of the bit.
    pub source: BitSource,
}

/// A weighted accumulator of partial-product bits.
///
/// Columns span weights `0 .. width`; bits added at or above `width` wrap
/// away (the sum is taken modulo `2^width`). Every bit ever created stays in
/// the arena so the structure can be evaluated and emitted; the columns
/// only list bits that are still waiting to be compressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitHeap {
    width: u32,
    lsb: u32,
    bits: Vec<HeapBit>,
    columns: Vec<Vec<BitId>>,
    pending_constants: Vec<u32>,
    pub(crate) compressors: Vec<CompressorInstance>,
    pub(crate) final_adder: Option<FinalAdder>,
    pub(crate) stages: u32,
}

impl BitHeap {
    /// Creates an empty heap with `width` columns.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            lsb: 0,
            bits: Vec::new(),
            columns: vec![Vec::new(); width as usize],
            pending_constants: vec![0; width as usize],
            compressors: Vec::new(),
            final_adder: None,
            stages: 0,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Lowest tracked weight.
    pub fn lsb(&self) -> u32 {
        self.lsb
    }

    /// Registers a bit-producing signal at `weight`.
    ///
    /// Returns `None` (and adds nothing) when the weight is outside the
    /// tracked columns.
    pub fn add_signal(
        &mut self,
        name: impl Into<String>,
        weight: u32,
        timing: BitTiming,
        source: BitSource,
    ) -> Option<BitId> {
        if weight < self.lsb || weight >= self.width {
            return None;
        }
        Some(self.push_bit(name.into(), weight, 0, timing, source))
    }

    pub(crate) fn push_bit(
        &mut self,
        name: String,
        weight: u32,
        stage: u32,
        timing: BitTiming,
        source: BitSource,
    ) -> BitId {
        let id = BitId::from_raw(self.bits.len() as u32);
        self.bits.push(HeapBit {
            id,
            name,
            weight,
            stage,
            timing,
            source,
        });
        self.columns[weight as usize].push(id);
        id
    }

    /// Adds a constant one at `weight`. Constants are merged into a single
    /// binary constant when compression starts.
    pub fn add_constant_one_bit(&mut self, weight: u32) {
        if weight < self.width {
            self.pending_constants[weight as usize] += 1;
        }
    }

    /// Adds every set bit of `value` as a constant.
    pub fn add_constant(&mut self, value: u128) {
        for weight in 0..self.width.min(128) {
            if (value >> weight) & 1 == 1 {
                self.add_constant_one_bit(weight);
            }
        }
    }

    /// Sum of the pending constants modulo `2^width`.
    pub fn pending_constant_value(&self) -> u128 {
        let mask = modulus_mask(self.width);
        self.pending_constants
            .iter()
            .enumerate()
            .fold(0u128, |acc, (w, &n)| {
                acc.wrapping_add(u128::from(n).wrapping_shl(w as u32)) & mask
            })
    }

    /// Replaces the pending constant counts by one constant bit per set
    /// bit of their sum.
    pub fn materialize_constants(&mut self) {
        let value = self.pending_constant_value();
        self.pending_constants.iter_mut().for_each(|n| *n = 0);
        for weight in self.lsb..self.width {
            if (value >> weight) & 1 == 1 {
                self.push_bit(
                    format!("const_w{weight}"),
                    weight,
                    0,
                    BitTiming::START,
                    BitSource::Constant,
                );
            }
        }
    }

    /// Current occupancy of a column: waiting signals plus pending
    /// constant ones.
    pub fn column_height(&self, weight: u32) -> u32 {
        if weight >= self.width {
            return 0;
        }
        self.columns[weight as usize].len() as u32 + self.pending_constants[weight as usize]
    }

    /// Heights of all columns, indexed by weight.
    pub fn heights(&self) -> Vec<u32> {
        (0..self.width).map(|w| self.column_height(w)).collect()
    }

    /// Height of the tallest column.
    pub fn max_height(&self) -> u32 {
        (0..self.width)
            .map(|w| self.column_height(w))
            .max()
            .unwrap_or(0)
    }

    /// IDs of the bits waiting in a column.
    pub fn column(&self, weight: u32) -> &[BitId] {
        self.columns
            .get(weight as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn column_mut(&mut self, weight: u32) -> &mut Vec<BitId> {
        &mut self.columns[weight as usize]
    }

    /// Every bit ever added, in creation order.
    pub fn bits(&self) -> &[HeapBit] {
        &self.bits
    }

    /// The bit with the given ID.
    pub fn bit(&self, id: BitId) -> &HeapBit {
        &self.bits[id.index()]
    }

    /// Compressor instances in creation order.
    pub fn compressors(&self) -> &[CompressorInstance] {
        &self.compressors
    }

    /// The final adder, once compression has finished.
    pub fn final_adder(&self) -> Option<&FinalAdder> {
        self.final_adder.as_ref()
    }

    /// Number of compression stages run.
    pub fn stage_count(&self) -> u32 {
        self.stages
    }

    /// Maximal value of the waiting signal bits and pending constants
    /// strictly below `weight`.
    pub fn weight_below(&self, weight: u32) -> u128 {
        (self.lsb..weight.min(self.width))
            .map(|w| u128::from(self.column_height(w)) << w)
            .sum()
    }

    /// Raises the LSB to `new_lsb`, dropping every waiting bit and pending
    /// constant below it. Returns the maximal value removed.
    ///
    /// # Errors
    ///
    /// Fails once compression has started.
    pub fn prune_lsb(&mut self, new_lsb: u32) -> TesseraResult<u128> {
        if !self.compressors.is_empty() || self.final_adder.is_some() {
            return Err(TesseraError::internal(
                "bit heap LSB cannot move after compression started",
            ));
        }
        let new_lsb = new_lsb.min(self.width);
        let removed = self.weight_below(new_lsb);
        for w in self.lsb..new_lsb {
            self.columns[w as usize].clear();
            self.pending_constants[w as usize] = 0;
        }
        self.lsb = self.lsb.max(new_lsb);
        Ok(removed)
    }

    /// Sum of the waiting bits before compression, for a given valuation of
    /// the external bits; constants count as ones.
    pub fn value_of_columns(&self, external: &dyn Fn(&HeapBit) -> bool) -> u128 {
        let mask = modulus_mask(self.width);
        let mut sum = self.pending_constant_value();
        for w in self.lsb..self.width {
            for &id in &self.columns[w as usize] {
                let bit = &self.bits[id.index()];
                let one = match bit.source {
                    BitSource::Constant => true,
                    BitSource::External { .. } => external(bit),
                    BitSource::Compressor { .. } => false,
                };
                if one {
                    sum = sum.wrapping_add(1u128 << w) & mask;
                }
            }
        }
        sum
    }

    /// Sum of every tile and constant bit that entered the heap above the
    /// LSB, whether or not it has been compressed since.
    pub fn initial_value(&self, external: &dyn Fn(&HeapBit) -> bool) -> u128 {
        let mask = modulus_mask(self.width);
        let mut sum = self.pending_constant_value();
        for bit in self.bits.iter().filter(|b| b.weight >= self.lsb) {
            let one = match bit.source {
                BitSource::Constant => true,
                BitSource::External { .. } => external(bit),
                BitSource::Compressor { .. } => false,
            };
            if one {
                sum = sum.wrapping_add(1u128 << bit.weight) & mask;
            }
        }
        sum
    }

    /// Evaluates the compressed structure bit-accurately.
    ///
    /// External bits take their value from `external`; compressor outputs
    /// are computed from their inputs and the final adder sums the
    /// remaining rows. Returns the heap sum modulo `2^width`.
    ///
    /// # Errors
    ///
    /// Fails if compression has not produced a final adder yet.
    pub fn evaluate(&self, external: &dyn Fn(&HeapBit) -> bool) -> TesseraResult<u128> {
        let adder = self
            .final_adder
            .as_ref()
            .ok_or_else(|| TesseraError::internal("bit heap evaluated before compression"))?;
        let mut values = vec![false; self.bits.len()];
        for bit in &self.bits {
            values[bit.id.index()] = match bit.source {
                BitSource::Constant => true,
                BitSource::External { .. } => external(bit),
                BitSource::Compressor { .. } => false,
            };
        }
        for inst in &self.compressors {
            let sum: u64 = inst
                .inputs
                .iter()
                .enumerate()
                .map(|(j, col)| {
                    let ones = col.iter().filter(|id| values[id.index()]).count() as u64;
                    ones << j
                })
                .sum();
            for (i, out) in inst.outputs.iter().enumerate() {
                values[out.index()] = (sum >> i) & 1 == 1;
            }
        }
        Ok(adder.evaluate(&values))
    }
}

/// `2^width - 1`, saturating at 128 bits.
pub(crate) fn modulus_mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}
