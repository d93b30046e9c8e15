//! The `wx x wy` partial-product grid and the cells a tiling must cover.
//!
//! Cell `(x, y)` stands for `a_x * b_y * 2^(x+y)`. In a truncated
//! multiplier the low-weight cells are optional: they may be left out as
//! long as their total weight stays within the error budget.
//!
//! The required region is one fixed choice of omitted cells, the one the
//! constructive strategies work with. The covering ILP instead treats every
//! omittable cell as free and bounds the omitted weight directly.

use serde::{Deserialize, Serialize};
use tessera_bitheap::{compute_truncation_params, TruncationParams};

/// The product grid of one multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGrid {
    wx: u32,
    wy: u32,
    w_out: u32,
    signed: bool,
    truncation: TruncationParams,
    omission: bool,
    required: Vec<bool>,
}

impl ProductGrid {
    /// Builds the grid and its required region.
    ///
    /// Without truncation (or with `allow_omission` off) every cell is
    /// required. Otherwise the cells above the boundary column are
    /// required, `keep_bits` cells in it, and every sign cell. If the
    /// remaining optional cells still outweigh the budget, the heaviest
    /// of them become required until they fit.
    pub fn new(wx: u32, wy: u32, w_out: u32, signed: bool, allow_omission: bool) -> Self {
        let w_full = wx + wy;
        let w_out = if w_out == 0 { w_full } else { w_out.min(w_full) };
        let truncation = compute_truncation_params(w_full, w_out);
        let mut grid = Self {
            wx,
            wy,
            w_out,
            signed,
            truncation,
            omission: allow_omission && !truncation.is_exact(),
            required: vec![true; (wx * wy) as usize],
        };
        if truncation.is_exact() || !allow_omission {
            return grid;
        }

        let boundary = truncation.boundary_column();
        let mut kept_in_boundary = 0;
        for y in 0..wy {
            for x in 0..wx {
                let weight = x + y;
                let required = if grid.is_sign_cell(x, y) || weight > boundary {
                    true
                } else if weight == boundary && kept_in_boundary < truncation.keep_bits {
                    kept_in_boundary += 1;
                    true
                } else {
                    false
                };
                grid.required[(y * wx + x) as usize] = required;
            }
        }

        let mut optional: Vec<(u32, u32)> = grid.optional_cells().collect();
        optional.sort_by_key(|&(x, y)| std::cmp::Reverse((x + y, y)));
        let mut omitted = grid.optional_weight();
        for (x, y) in optional {
            if omitted <= truncation.budget() {
                break;
            }
            grid.required[(y * wx + x) as usize] = true;
            omitted -= 1u128 << (x + y);
        }
        grid
    }

    /// Width of the X operand.
    pub fn wx(&self) -> u32 {
        self.wx
    }

    /// Width of the Y operand.
    pub fn wy(&self) -> u32 {
        self.wy
    }

    /// Width of the exact product.
    pub fn w_full(&self) -> u32 {
        self.wx + self.wy
    }

    /// Requested output width.
    pub fn w_out(&self) -> u32 {
        self.w_out
    }

    /// Whether the operands are two's complement.
    pub fn signed(&self) -> bool {
        self.signed
    }

    /// Columns of the bit heap. A truncated product gets one column above
    /// the product for the carry of the rounding constant.
    pub fn heap_width(&self) -> u32 {
        if self.truncation.is_exact() {
            self.w_full()
        } else {
            self.w_full() + 1
        }
    }

    /// Error-budget parameters of the product.
    pub fn truncation(&self) -> &TruncationParams {
        &self.truncation
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.required.len()
    }

    /// Whether `(x, y)` lies on the grid.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.wx) && y < i64::from(self.wy)
    }

    /// Row-major index of an on-grid cell.
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y * self.wx + x) as usize
    }

    /// Whether the cell must be covered.
    pub fn is_required(&self, x: u32, y: u32) -> bool {
        self.required[self.index(x, y)]
    }

    /// Whether the cell involves a sign bit of a signed operand.
    pub fn is_sign_cell(&self, x: u32, y: u32) -> bool {
        self.signed && (x + 1 == self.wx || y + 1 == self.wy)
    }

    /// Sign of the cell's weight: negative when exactly one factor is a
    /// sign bit.
    pub fn is_negative(&self, x: u32, y: u32) -> bool {
        self.signed && ((x + 1 == self.wx) != (y + 1 == self.wy))
    }

    /// All cells, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.wy).flat_map(move |y| (0..self.wx).map(move |x| (x, y)))
    }

    /// Cells that may be left uncovered.
    pub fn optional_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.cells().filter(move |&(x, y)| !self.is_required(x, y))
    }

    /// Number of required cells.
    pub fn required_count(&self) -> usize {
        self.required.iter().filter(|&&r| r).count()
    }

    /// Whether the cell may be left out at all: a non-sign cell whose
    /// weight alone fits the budget, in a grid that allows omission.
    pub fn is_omittable(&self, x: u32, y: u32) -> bool {
        self.omission
            && !self.is_sign_cell(x, y)
            && (1u128 << (x + y)) <= self.truncation.budget()
    }

    /// Total weight of the omittable cells.
    pub fn omittable_weight(&self) -> u128 {
        self.cells()
            .filter(|&(x, y)| self.is_omittable(x, y))
            .map(|(x, y)| 1u128 << (x + y))
            .sum()
    }

    /// Total weight of the optional cells.
    pub fn optional_weight(&self) -> u128 {
        self.optional_cells().map(|(x, y)| 1u128 << (x + y)).sum()
    }
}
