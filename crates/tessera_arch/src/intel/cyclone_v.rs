//! Intel Cyclone V target model.
//!
//! Cyclone V ALMs hold a fracturable 8-input LUT usable as two 6-input
//! LUTs. Its variable-precision DSP blocks offer one 27x27 multiplier in
//! either signed or unsigned mode.

use crate::types::{Delay, DspShape, TargetOptions};
use crate::Target;

/// Device parameters for a specific Cyclone V part number.
struct CycloneVDevice {
    /// Part number string (e.g., "5CSEMA5F31C6").
    name: &'static str,
    /// Number of Adaptive Logic Modules.
    alms: u32,
    /// Number of flip-flops.
    ffs: u32,
    /// Number of variable-precision DSP blocks.
    dsp: u32,
}

/// Known Cyclone V device variants.
const CYCLONE_V_DEVICES: &[CycloneVDevice] = &[
    CycloneVDevice {
        name: "5CSEMA5F31C6",
        alms: 32_070,
        ffs: 64_140,
        dsp: 87,
    },
    CycloneVDevice {
        name: "5CSEBA6U23I7",
        alms: 41_910,
        ffs: 83_820,
        dsp: 112,
    },
    CycloneVDevice {
        name: "5CEBA4F23C7",
        alms: 18_480,
        ffs: 36_960,
        dsp: 66,
    },
];

/// The smallest Cyclone V device, used as fallback for unknown part numbers.
const FALLBACK_INDEX: usize = 2;

/// Target model for the Intel Cyclone V FPGA family.
#[derive(Debug)]
pub struct CycloneV {
    /// Index into `CYCLONE_V_DEVICES` for the selected part.
    device_index: usize,
    options: TargetOptions,
}

impl CycloneV {
    /// Creates a Cyclone V target for the given device part number.
    ///
    /// If the exact part number is not found, falls back to the smallest
    /// known device (5CEBA4F23C7). The flag reports an exact match.
    pub fn new(device: &str, options: TargetOptions) -> (Self, bool) {
        let index = CYCLONE_V_DEVICES
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

    fn device(&self) -> &CycloneVDevice {
        &CYCLONE_V_DEVICES[self.device_index]
    }
}

impl Target for CycloneV {
    fn family_name(&self) -> &str {
        "cyclone_v"
    }

    fn device_name(&self) -> &str {
        self.device().name
    }

    fn total_luts(&self) -> u32 {
        self.device().alms
    }

    fn total_ffs(&self) -> u32 {
        self.device().ffs
    }

    fn total_dsp(&self) -> u32 {
        self.device().dsp
    }

    fn lut_input_count(&self) -> u32 {
        6
    }

    fn dsp_shape(&self) -> DspShape {
        DspShape {
            x: 27,
            y: 27,
            signed_only: false,
        }
    }

    fn dsp_lut_equivalent(&self) -> f64 {
        40.0
    }

    fn lut_delay(&self) -> Delay {
        Delay::new(0.3, 0.45, 0.6)
    }

    fn dsp_delay(&self) -> Delay {
        Delay::new(2.0, 2.6, 3.2)
    }

    fn carry_delay_per_bit(&self) -> Delay {
        Delay::new(0.015, 0.025, 0.035)
    }

    fn options(&self) -> &TargetOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_device() {
        let (t, exact) = CycloneV::new("5CSEMA5F31C6", TargetOptions::default());
        assert!(exact);
        assert_eq!(t.total_luts(), 32_070);
        assert_eq!(t.total_dsp(), 87);
    }

    #[test]
    fn unknown_device_falls_back() {
        let (t, exact) = CycloneV::new("UNKNOWN_PART", TargetOptions::default());
        assert!(!exact);
        assert_eq!(t.device_name(), "5CEBA4F23C7");
    }

    #[test]
    fn dsp_is_27x27_in_both_modes() {
        let (t, _) = CycloneV::new("", TargetOptions::default());
        assert_eq!(t.dsp_widths(false, false), (27, 27));
        assert_eq!(t.dsp_widths(true, false), (27, 27));
    }
}
