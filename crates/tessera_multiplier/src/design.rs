//! A generated multiplier and its bit-accurate model.

use crate::projection::ProjectedTile;
use crate::report::ResourceReport;
use crate::vectors::{operand_mask, operand_value, Expected, TestVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessera_bitheap::{BitHeap, BitSource, CompressionSummary, CompressorCatalog, HeapBit};
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::MultiplierParams;
use tessera_tiling::{ProductGrid, Solution, TileCollection};

/// The complete structure of one multiplier: tiling, heap, compressors and
/// final adder.
#[derive(Debug, Clone)]
pub struct MultiplierDesign {
    pub(crate) params: MultiplierParams,
    pub(crate) target: String,
    pub(crate) grid: ProductGrid,
    pub(crate) collection: TileCollection,
    pub(crate) solution: Solution,
    pub(crate) tiling_method: String,
    pub(crate) tiling_cost: f64,
    pub(crate) tiles: Vec<ProjectedTile>,
    pub(crate) heap: BitHeap,
    pub(crate) catalog: CompressorCatalog,
    pub(crate) compression: CompressionSummary,
    pub(crate) omitted_weight: u128,
}

impl MultiplierDesign {
    /// The parameters the design was generated from.
    pub fn params(&self) -> &MultiplierParams {
        &self.params
    }

    /// Operator name, e.g. `IntMultiplier_8x8_16_u`.
    pub fn operator_name(&self) -> String {
        self.params.operator_name()
    }

    /// Target description, `family/device`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The product grid.
    pub fn grid(&self) -> &ProductGrid {
        &self.grid
    }

    /// Tiles the strategy could choose from.
    pub fn collection(&self) -> &TileCollection {
        &self.collection
    }

    /// The chosen tiling.
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// Name of the tiling method that produced the solution.
    pub fn tiling_method(&self) -> &str {
        &self.tiling_method
    }

    /// LUT-equivalent cost of the tiling.
    pub fn tiling_cost(&self) -> f64 {
        self.tiling_cost
    }

    /// Placed tiles with their heap bits.
    pub fn tiles(&self) -> &[ProjectedTile] {
        &self.tiles
    }

    /// The compressed bit heap.
    pub fn heap(&self) -> &BitHeap {
        &self.heap
    }

    /// Compressor shapes referenced by the heap's instances.
    pub fn catalog(&self) -> &CompressorCatalog {
        &self.catalog
    }

    /// Outcome of the compression.
    pub fn compression(&self) -> &CompressionSummary {
        &self.compression
    }

    /// Weight of the partial products left out: uncovered cells plus
    /// pruned heap columns.
    pub fn omitted_weight(&self) -> u128 {
        self.omitted_weight
    }

    /// Pipeline depth in cycles.
    pub fn latency(&self) -> u32 {
        self.compression.output_cycle
    }

    /// Resource summary.
    pub fn report(&self) -> ResourceReport {
        ResourceReport::of(self)
    }

    fn check_operands(&self, x: u64, y: u64) -> TesseraResult<()> {
        for (name, value, width) in [("X", x, self.params.wx), ("Y", y, self.params.wy)] {
            if value & !operand_mask(width) != 0 {
                return Err(TesseraError::config(format!(
                    "operand {name} = {value} does not fit in {width} bits"
                )));
            }
        }
        Ok(())
    }

    /// Computes the output the generated structure produces for raw
    /// operand bits `x` and `y`, by evaluating every tile, compressor and
    /// the final adder.
    ///
    /// # Errors
    ///
    /// Fails if an operand does not fit its width.
    pub fn evaluate(&self, x: u64, y: u64) -> TesseraResult<u128> {
        self.check_operands(x, y)?;
        let outputs: Vec<u128> = self
            .tiles
            .iter()
            .map(|t| t.projection.value(&self.grid, x, y))
            .collect();
        let external = |b: &HeapBit| match b.source {
            BitSource::External { producer, bit } => outputs
                .get(producer as usize)
                .is_some_and(|v| (v >> bit) & 1 == 1),
            _ => false,
        };
        let sum = self.heap.evaluate(&external)?;
        Ok(self.output_of(sum))
    }

    /// The output bits of a heap sum. A truncated sum holds `wOut + 1`
    /// bits above the discarded ones; a value outside the output range
    /// saturates.
    fn output_of(&self, sum: u128) -> u128 {
        let p = &self.params;
        let w = self.grid.truncation().truncated_bits;
        let mask = output_mask(p.w_out);
        if w == 0 {
            return sum & mask;
        }
        let wide = (sum >> w) & output_mask(p.w_out + 1);
        let value = if p.signed && (wide >> p.w_out) & 1 == 1 {
            wide as i128 - (1i128 << (p.w_out + 1))
        } else {
            wide as i128
        };
        let (min, max) = output_range(p.w_out, p.signed);
        value.clamp(min, max) as u128 & mask
    }

    /// The reference result for `x` and `y`: the exact product at full
    /// precision, otherwise the two faithful roundings.
    ///
    /// # Errors
    ///
    /// Fails if an operand does not fit its width.
    pub fn emulate(&self, x: u64, y: u64) -> TesseraResult<Expected> {
        self.check_operands(x, y)?;
        let p = &self.params;
        let product = operand_value(x, p.wx, p.signed) * operand_value(y, p.wy, p.signed);
        let mask = output_mask(p.w_out);
        let w = self.grid.truncation().truncated_bits;
        if w == 0 {
            return Ok(Expected::Exact {
                value: product as u128 & mask,
            });
        }
        let floor = product >> w;
        let exact = product & ((1i128 << w) - 1) == 0;
        let (_, max) = output_range(p.w_out, p.signed);
        let ceil = if exact { floor } else { (floor + 1).min(max) };
        Ok(Expected::Faithful {
            floor: floor as u128 & mask,
            ceil: ceil as u128 & mask,
        })
    }

    /// `n` operand pairs with their admissible outputs. The corners
    /// (zero, all ones, and the most negative values when signed) come
    /// first, the rest is drawn from a generator seeded with `seed`.
    ///
    /// # Errors
    ///
    /// Never fails for generated operands; the result type follows
    /// [`emulate`](Self::emulate).
    pub fn generate_test_vectors(&self, n: usize, seed: u64) -> TesseraResult<Vec<TestVector>> {
        let p = &self.params;
        let (mx, my) = (operand_mask(p.wx), operand_mask(p.wy));
        let mut corners = vec![(0, 0), (mx, my), (mx, 0), (1, my)];
        if p.signed {
            let (nx, ny) = (1u64 << (p.wx - 1), 1u64 << (p.wy - 1));
            corners.extend([(nx, ny), (nx, my), (nx - 1, ny)]);
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut vectors = Vec::with_capacity(n);
        for i in 0..n {
            let (x, y) = match corners.get(i) {
                Some(&pair) => pair,
                None => (rng.gen_range(0..=mx), rng.gen_range(0..=my)),
            };
            vectors.push(TestVector {
                x,
                y,
                expected: self.emulate(x, y)?,
            });
        }
        Ok(vectors)
    }
}

/// Smallest and largest value a `width`-bit output represents.
fn output_range(width: u32, signed: bool) -> (i128, i128) {
    if signed {
        let half = 1i128 << (width - 1);
        (-half, half - 1)
    } else {
        (0, (1i128 << width) - 1)
    }
}

fn output_mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}
