//! Error budgeting for faithfully rounded truncated products.
//!
//! Dropping the `w = wFull - wOut` low bits of a product leaves a rounding
//! error; leaving partial products out of the bit heap adds to it. The
//! budget computed here bounds the total weight that may be omitted while
//! keeping the result within one unit of the last retained place, given
//! that the heap also receives the round bit `2^(w-1)` and the centering
//! constant `C`.

use serde::{Deserialize, Serialize};
use tessera_common::{TesseraError, TesseraResult};

/// Parameters derived from the error budget of a truncated product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TruncationParams {
    /// Number of product bits discarded, `wFull - wOut`.
    pub truncated_bits: u32,
    /// Guard bits kept below the output LSB.
    pub guard_bits: u32,
    /// Bits that must stay in the boundary column.
    pub keep_bits: u32,
    /// Maximal rounding error, `2^(w-1)`.
    pub error_budget: u128,
    /// Centering constant.
    pub center_constant: u128,
}

impl TruncationParams {
    /// Total omitted weight allowed, `errorBudget + centerConstant`.
    pub fn budget(&self) -> u128 {
        self.error_budget + self.center_constant
    }

    /// Weight of the boundary column: every cell above it is required and
    /// `keep_bits` cells in it are required.
    pub fn boundary_column(&self) -> u32 {
        self.truncated_bits - self.guard_bits
    }

    /// Constant added to the heap: the round bit plus the centering
    /// constant. Equal to [`budget`](Self::budget).
    pub fn heap_constant(&self) -> u128 {
        self.budget()
    }

    /// Returns `true` when nothing is truncated.
    pub fn is_exact(&self) -> bool {
        self.truncated_bits == 0
    }
}

/// Computes guard bits, keep bits, error budget and centering constant for
/// an `w_full`-bit product truncated to `w_out` bits.
///
/// Walking columns upward from weight 0, the weight of every partial
/// product bit is accumulated until it reaches `2^(w-1) + C` (with `C`
/// tracking the column reached). The boundary column is then walked back
/// one bit at a time, counting the bits that must be kept to get under the
/// budget again.
///
/// `w_out == w_full` and `w_out == 0` (full precision) return all zeros.
pub fn compute_truncation_params(w_full: u32, w_out: u32) -> TruncationParams {
    if w_out == 0 || w_out >= w_full {
        return TruncationParams::default();
    }
    let w = w_full - w_out;
    let error_budget = 1u128 << (w - 1);

    let mut sum: u128 = 0;
    let mut center = 0u128;
    let mut col = 1u32;
    while col <= w {
        let height = u128::from(col.min(w_full - col));
        sum += height << (col - 1);
        center = (1u128 << (w - 1)) - (1u128 << (col - 1));
        if sum >= error_budget + center {
            break;
        }
        col += 1;
    }
    let col = col.min(w);
    let guard_bits = w - (col - 1);

    let mut keep_bits = 0;
    while sum >= error_budget + center {
        sum -= 1u128 << (col - 1);
        keep_bits += 1;
    }

    TruncationParams {
        truncated_bits: w,
        guard_bits,
        keep_bits,
        error_budget,
        center_constant: center,
    }
}

/// Verifies that the partial products left out of the heap stay within the
/// budget.
///
/// Sums `2^(x+y)` over every grid cell `covered` reports as uncovered, adds
/// `pruned_weight` (heap bits dropped by LSB pruning), and compares the
/// total with `errorBudget + centerConstant`. Returns the omitted weight.
///
/// # Errors
///
/// Returns [`TesseraError::TruncationBudgetExceeded`] if the omitted weight
/// exceeds the budget; the generated circuit would not be faithful.
pub fn check_truncation_error(
    wx: u32,
    wy: u32,
    w_out: u32,
    params: &TruncationParams,
    covered: impl Fn(u32, u32) -> bool,
    pruned_weight: u128,
) -> TesseraResult<u128> {
    let mut omitted = pruned_weight;
    for y in 0..wy {
        for x in 0..wx {
            if !covered(x, y) {
                omitted += 1u128 << (x + y);
            }
        }
    }
    if omitted > params.budget() {
        return Err(TesseraError::TruncationBudgetExceeded {
            omitted,
            budget: params.budget(),
            wx,
            wy,
            w_out,
        });
    }
    Ok(omitted)
}
