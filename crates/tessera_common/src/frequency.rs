//! Clock frequency values with unit parsing, used to derive the pipeline
//! clock period.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A clock frequency stored in Hertz.
///
/// Parses strings like "300MHz", "1GHz", "250000KHz" and bare numbers
/// (interpreted as Hz).
#[derive(Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Frequency(f64);

impl Frequency {
    /// Creates a frequency from a value in Hertz.
    pub fn new(hz: f64) -> Self {
        Self(hz)
    }

    /// Creates a frequency from a value in megahertz.
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> f64 {
        self.0
    }

    /// Returns the frequency in megahertz.
    pub fn mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }

    /// Returns the clock period in nanoseconds, or `None` for a zero or
    /// negative frequency (a combinational design).
    pub fn period_ns(&self) -> Option<f64> {
        if self.0 > 0.0 {
            Some(1_000_000_000.0 / self.0)
        } else {
            None
        }
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000_000.0 {
            write!(f, "{}GHz", hz / 1_000_000_000.0)
        } else if hz >= 1_000_000.0 {
            write!(f, "{}MHz", hz / 1_000_000.0)
        } else if hz >= 1_000.0 {
            write!(f, "{}KHz", hz / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error type for parsing frequency strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (num, scale) = if let Some(num) = lower.strip_suffix("ghz") {
            (num, 1_000_000_000.0)
        } else if let Some(num) = lower.strip_suffix("mhz") {
            (num, 1_000_000.0)
        } else if let Some(num) = lower.strip_suffix("khz") {
            (num, 1_000.0)
        } else if let Some(num) = lower.strip_suffix("hz") {
            (num, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let val: f64 = num.trim().parse().map_err(|_| err())?;
        if !val.is_finite() || val < 0.0 {
            return Err(err());
        }
        Ok(Frequency(val * scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mhz() {
        let f: Frequency = "300MHz".parse().unwrap();
        assert_eq!(f.mhz(), 300.0);
    }

    #[test]
    fn parse_ghz_case_insensitive() {
        let f: Frequency = "1ghz".parse().unwrap();
        assert_eq!(f.hz(), 1_000_000_000.0);
    }

    #[test]
    fn parse_bare_number() {
        let f: Frequency = "48000".parse().unwrap();
        assert_eq!(f.hz(), 48_000.0);
    }

    #[test]
    fn parse_rejects_garbage_and_negatives() {
        assert!("fast".parse::<Frequency>().is_err());
        assert!("-5MHz".parse::<Frequency>().is_err());
    }

    #[test]
    fn period_of_250mhz_is_4ns() {
        let f = Frequency::from_mhz(250.0);
        let period = f.period_ns().unwrap();
        assert!((period - 4.0).abs() < 1e-9);
    }

    #[test]
    fn zero_frequency_has_no_period() {
        assert_eq!(Frequency::new(0.0).period_ns(), None);
    }

    #[test]
    fn display_picks_unit() {
        assert_eq!(format!("{}", Frequency::from_mhz(400.0)), "400MHz");
        assert_eq!(format!("{}", Frequency::new(12.0)), "12Hz");
    }
}
