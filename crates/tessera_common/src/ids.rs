//! Opaque ID newtypes for generator entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, `Ord`, and
//! `Serialize`/`Deserialize`. IDs index the arenas of bits, compressor
//! instances and tile placements owned by a single multiplier construction.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`, for arena lookups.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque ID of a single bit-producing signal in the bit heap.
    BitId
);

define_id!(
    /// Opaque ID of a compressor instance created during compression.
    CompressorId
);

define_id!(
    /// Opaque ID of a tile placement within a tiling solution.
    PlacementId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn id_roundtrip() {
        let id = BitId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn ids_order_by_index() {
        let set: BTreeSet<_> = [3, 1, 2, 1].into_iter().map(CompressorId::from_raw).collect();
        let raw: Vec<u32> = set.into_iter().map(CompressorId::as_raw).collect();
        assert_eq!(raw, vec![1, 2, 3]);
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = PlacementId::from_raw(7);
        let json = serde_json::to_string(&id).unwrap();
        let back: PlacementId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
