//! Reference results and random test vectors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a correct multiplier may output for one operand pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expected {
    /// Full precision: exactly this bit pattern.
    Exact {
        /// The product, modulo `2^wOut`.
        value: u128,
    },
    /// Faithful rounding: either neighbor of the exact quotient. Both are
    /// equal when the product is representable.
    Faithful {
        /// `floor(X * Y / 2^w)` as a `wOut`-bit pattern.
        floor: u128,
        /// The value above `floor`, or `floor` itself when that is the
        /// largest output.
        ceil: u128,
    },
}

impl Expected {
    /// Returns `true` if `result` is an acceptable output.
    pub fn accepts(&self, result: u128) -> bool {
        match *self {
            Self::Exact { value } => result == value,
            Self::Faithful { floor, ceil } => result == floor || result == ceil,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Exact { value } => write!(f, "{value}"),
            Self::Faithful { floor, ceil } if floor == ceil => write!(f, "{floor}"),
            Self::Faithful { floor, ceil } => write!(f, "{floor} {ceil}"),
        }
    }
}

/// One operand pair with its admissible outputs. Operands are raw bit
/// patterns; signed operands are in two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVector {
    /// X operand bits.
    pub x: u64,
    /// Y operand bits.
    pub y: u64,
    /// Acceptable outputs.
    pub expected: Expected,
}

impl fmt::Display for TestVector {
    /// `X Y R` or, for a faithful pair, `X Y R0 R1`, in decimal.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.expected)
    }
}

/// `2^width - 1` for operand widths below 64.
pub(crate) fn operand_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Value of a `width`-bit pattern, read as two's complement when `signed`.
pub(crate) fn operand_value(bits: u64, width: u32, signed: bool) -> i128 {
    let raw = i128::from(bits & operand_mask(width));
    if signed && width > 0 && (bits >> (width - 1)) & 1 == 1 {
        raw - (1i128 << width)
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faithful_accepts_both_neighbors() {
        let e = Expected::Faithful { floor: 4, ceil: 5 };
        assert!(e.accepts(4));
        assert!(e.accepts(5));
        assert!(!e.accepts(6));
        assert_eq!(e.to_string(), "4 5");
    }

    #[test]
    fn exact_pair_prints_once() {
        let e = Expected::Faithful { floor: 7, ceil: 7 };
        assert_eq!(e.to_string(), "7");
        let v = TestVector {
            x: 3,
            y: 5,
            expected: Expected::Exact { value: 15 },
        };
        assert_eq!(v.to_string(), "3 5 15");
    }

    #[test]
    fn twos_complement_operands() {
        assert_eq!(operand_value(0b1111, 4, true), -1);
        assert_eq!(operand_value(0b1000, 4, true), -8);
        assert_eq!(operand_value(0b0111, 4, true), 7);
        assert_eq!(operand_value(0b1111, 4, false), 15);
    }

    #[test]
    fn vectors_serialize_with_a_kind_tag() {
        let v = TestVector {
            x: 1,
            y: 2,
            expected: Expected::Faithful { floor: 0, ceil: 1 },
        };
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json["expected"]["kind"], "faithful");
    }
}
