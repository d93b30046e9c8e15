//! Tile shapes and their concrete parametrizations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A family of primitive multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileShape {
    /// Small square LUT multiplier (1x1, 2x2, 3x3).
    LutSquare,
    /// Single-row AND array (Kx1).
    LutRow,
    /// Two-row LUT multiplier on the carry chain (2xk).
    LutTwoByK,
    /// LUT multiplier over a non-rectangular cell set.
    LutIrregular,
    /// One hard multiplier block.
    Dsp,
    /// Two hard multiplier blocks chained through the cascade path.
    SuperTile,
    /// A square product from three hard multiplier blocks and pre-adders.
    Karatsuba,
}

impl TileShape {
    /// All shapes, in report order.
    pub const ALL: [TileShape; 7] = [
        TileShape::LutSquare,
        TileShape::LutRow,
        TileShape::LutTwoByK,
        TileShape::LutIrregular,
        TileShape::Dsp,
        TileShape::SuperTile,
        TileShape::Karatsuba,
    ];

    /// Short family name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            TileShape::LutSquare => "lut",
            TileShape::LutRow => "lut-row",
            TileShape::LutTwoByK => "lut-2xk",
            TileShape::LutIrregular => "lut-irregular",
            TileShape::Dsp => "dsp",
            TileShape::SuperTile => "super-tile",
            TileShape::Karatsuba => "karatsuba",
        }
    }

    /// Returns `true` for families built from hard multiplier blocks.
    pub fn uses_dsp(self) -> bool {
        matches!(
            self,
            TileShape::Dsp | TileShape::SuperTile | TileShape::Karatsuba
        )
    }
}

impl fmt::Display for TileShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operand signedness a tile's ports impose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    /// LUT tables take either; resolved when placed.
    Any,
    /// Hard multiplier ports with fixed signedness. A signed port must
    /// receive the operand's sign bit; an unsigned one must not.
    Fixed {
        /// Signedness of the port fed by the X operand.
        x: bool,
        /// Signedness of the port fed by the Y operand.
        y: bool,
    },
}

/// A concrete tile: a shape with resolved word sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parametrization {
    /// Display name, e.g. `dsp_25x18_ss`.
    pub name: String,
    /// Family.
    pub shape: TileShape,
    /// Extent along X.
    pub width: u32,
    /// Extent along Y.
    pub height: u32,
    /// Valid cells, row-major; `None` is the full rectangle.
    pub mask: Option<Vec<bool>>,
    /// Hard multiplier blocks used.
    pub dsp_units: u32,
    /// LUTs needed besides the multiplier itself (pre-adders, subtractors).
    pub extra_luts: f64,
    /// Port signedness.
    pub signedness: Signedness,
    /// `true` if the operands are swapped onto the hard multiplier ports.
    pub flipped: bool,
}

impl Parametrization {
    /// A full rectangle.
    pub fn rect(shape: TileShape, width: u32, height: u32) -> Self {
        Self {
            name: format!("{}_{width}x{height}", shape.name()),
            shape,
            width,
            height,
            mask: None,
            dsp_units: 0,
            extra_luts: 0.0,
            signedness: Signedness::Any,
            flipped: false,
        }
    }

    /// A shape over the cells `valid` accepts within a `width x height` box.
    pub fn masked(
        shape: TileShape,
        name: impl Into<String>,
        width: u32,
        height: u32,
        valid: impl Fn(u32, u32) -> bool,
    ) -> Self {
        let mask = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| valid(x, y))
            .collect();
        Self {
            name: name.into(),
            shape,
            width,
            height,
            mask: Some(mask),
            dsp_units: 0,
            extra_luts: 0.0,
            signedness: Signedness::Any,
            flipped: false,
        }
    }

    /// Whether tile-local cell `(x, y)` belongs to the tile.
    pub fn valid(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        match &self.mask {
            None => true,
            Some(mask) => mask[(y * self.width + x) as usize],
        }
    }

    /// Valid tile-local cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.valid(x, y))
    }

    /// Number of valid cells.
    pub fn area(&self) -> u32 {
        self.cells().count() as u32
    }

    /// First valid cell in row-major order.
    pub fn first_cell(&self) -> (u32, u32) {
        self.cells().next().unwrap_or((0, 0))
    }

    /// Last valid cell in row-major order.
    pub fn last_cell(&self) -> (u32, u32) {
        self.cells().last().unwrap_or((0, 0))
    }

    /// Returns `true` for the single-cell tile.
    pub fn is_unit(&self) -> bool {
        self.width == 1 && self.height == 1
    }
}
