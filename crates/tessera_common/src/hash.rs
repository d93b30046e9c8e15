//! Content hashing for deterministic operator naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit XXH3 hash of the parameters that define a generated operator.
///
/// Two multipliers generated from the same parameters get the same hash, so
/// emitted entity names are stable across runs and distinct across
/// configurations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a content hash from the `Display` form of a value.
    pub fn of_display(value: &impl fmt::Display) -> Self {
        Self::from_bytes(value.to_string().as_bytes())
    }

    /// Returns the first 8 hex digits, used as an entity name suffix.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}..)", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"8x8->16 unsigned");
        let b = ContentHash::from_bytes(b"8x8->16 unsigned");
        assert_eq!(a, b);
    }

    #[test]
    fn different_params_differ() {
        let a = ContentHash::from_bytes(b"8x8->16");
        let b = ContentHash::from_bytes(b"8x8->8");
        assert_ne!(a, b);
    }

    #[test]
    fn short_is_eight_hex_digits() {
        let h = ContentHash::of_display(&"17x24");
        let s = h.short();
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(format!("{h}").starts_with(&s));
    }
}
