//! Intel Cyclone IV E target model.
//!
//! Cyclone IV E logic elements hold one 4-input LUT and one flip-flop, so
//! LUT multipliers and compressors cost noticeably more than on 6-input
//! fabrics. Hard multiplication uses 18x18 embedded multipliers.

use crate::types::{Delay, DspShape, TargetOptions};
use crate::Target;

/// Device parameters for a specific Cyclone IV E part number.
struct CycloneIvDevice {
    /// Part number string (e.g., "EP4CE22F17C6N").
    name: &'static str,
    /// Number of logic elements (each LE = 1 LUT4 + 1 FF).
    les: u32,
    /// Number of embedded 18x18 multipliers.
    multipliers: u32,
}

/// Known Cyclone IV E device variants.
const CYCLONE_IV_DEVICES: &[CycloneIvDevice] = &[
    CycloneIvDevice {
        name: "EP4CE6E22C8N",
        les: 6_272,
        multipliers: 15,
    },
    CycloneIvDevice {
        name: "EP4CE10F17C8N",
        les: 10_320,
        multipliers: 23,
    },
    CycloneIvDevice {
        name: "EP4CE22F17C6N",
        les: 22_320,
        multipliers: 66,
    },
    CycloneIvDevice {
        name: "EP4CE55F23C8N",
        les: 55_856,
        multipliers: 154,
    },
    CycloneIvDevice {
        name: "EP4CE115F29C7N",
        les: 114_480,
        multipliers: 266,
    },
];

/// The smallest Cyclone IV device, used as fallback for unknown part numbers.
const FALLBACK_INDEX: usize = 0;

/// Target model for the Intel Cyclone IV E FPGA family.
#[derive(Debug)]
pub struct CycloneIv {
    /// Index into `CYCLONE_IV_DEVICES` for the selected part.
    device_index: usize,
    options: TargetOptions,
}

impl CycloneIv {
    /// Creates a Cyclone IV E target for the given device part number.
    ///
    /// If the exact part number is not found, falls back to the smallest
    /// known device (EP4CE6E22C8N). The flag reports an exact match.
    pub fn new(device: &str, options: TargetOptions) -> (Self, bool) {
        let index = CYCLONE_IV_DEVICES
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(device));
        (
            Self {
                device_index: index.unwrap_or(FALLBACK_INDEX),
                options,
            },
            index.is_some(),
        )
    }

    fn device(&self) -> &CycloneIvDevice {
        &CYCLONE_IV_DEVICES[self.device_index]
    }
}

impl Target for CycloneIv {
    fn family_name(&self) -> &str {
        "cyclone_iv"
    }

    fn device_name(&self) -> &str {
        self.device().name
    }

    fn total_luts(&self) -> u32 {
        self.device().les
    }

    fn total_ffs(&self) -> u32 {
        self.device().les
    }

    fn total_dsp(&self) -> u32 {
        self.device().multipliers
    }

    fn lut_input_count(&self) -> u32 {
        4
    }

    fn dsp_shape(&self) -> DspShape {
        DspShape {
            x: 18,
            y: 18,
            signed_only: false,
        }
    }

    fn dsp_lut_equivalent(&self) -> f64 {
        20.0
    }

    fn lut_delay(&self) -> Delay {
        Delay::new(0.4, 0.6, 0.8)
    }

    fn dsp_delay(&self) -> Delay {
        Delay::new(2.8, 3.5, 4.3)
    }

    fn carry_delay_per_bit(&self) -> Delay {
        Delay::new(0.03, 0.05, 0.07)
    }

    fn options(&self) -> &TargetOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn les_provide_luts_and_ffs() {
        let (t, exact) = CycloneIv::new("EP4CE22F17C6N", TargetOptions::default());
        assert!(exact);
        assert_eq!(t.total_luts(), 22_320);
        assert_eq!(t.total_ffs(), 22_320);
        assert_eq!(t.lut_input_count(), 4);
    }

    #[test]
    fn four_input_luts_cost_more() {
        let (t, _) = CycloneIv::new("", TargetOptions::default());
        assert_eq!(t.compression_cost_per_bit(), 1.0);
        assert_eq!(t.lut_multiplier_luts(2, 2, 4), 4.0);
        assert_eq!(t.lut_multiplier_luts(3, 3, 6), 6.0 * 4.0);
    }

    #[test]
    fn unknown_device_falls_back() {
        let (t, exact) = CycloneIv::new("EP4CE1", TargetOptions::default());
        assert!(!exact);
        assert_eq!(t.device_name(), "EP4CE6E22C8N");
    }
}
