//! Xilinx Artix-7 target model.
//!
//! The Artix-7 family uses 28nm CLBs with fracturable 6-input LUTs (one
//! LUT6 or two LUT5 sharing inputs) and DSP48E1 slices whose multiplier
//! takes a 25-bit and an 18-bit two's complement operand.

use crate::types::{Delay, DspShape, TargetOptions};
use crate::Target;

/// Device parameters for a specific Artix-7 part number.
struct Artix7Device {
    /// Part number string (e.g., "xc7a35ticpg236-1L").
    name: &'static str,
    /// Number of 6-input LUTs.
    luts: u32,
    /// Number of flip-flops.
    ffs: u32,
    /// Number of DSP48E1 slices.
    dsp48e1: u32,
}

/// Known Artix-7 device variants.
const ARTIX7_DEVICES: &[Artix7Device] = &[
    Artix7Device {
        name: "xc7a35ticpg236-1L",
        luts: 20_800,
        ffs: 41_600,
        dsp48e1: 90,
    },
    Artix7Device {
        name: "xc7a100tcsg324-1",
        luts: 63_400,
        ffs: 126_800,
        dsp48e1: 240,
    },
    Artix7Device {
        name: "xc7a200tffg1156-1",
        luts: 134_600,
        ffs: 269_200,
        dsp48e1: 740,
    },
];

/// The smallest Artix-7 device, used as fallback for unknown part numbers.
const FALLBACK_INDEX: usize = 0;

/// Target model for the Xilinx Artix-7 FPGA family.
#[derive(Debug)]
pub struct Artix7 {
    /// Index into `ARTIX7_DEVICES` for the selected part.
    device_index: usize,
    options: TargetOptions,
}

impl Artix7 {
    /// Creates an Artix-7 target for the given device part number.
    ///
    /// If the exact part number is not found, falls back to the smallest
    /// known device (xc7a35ticpg236-1L). The flag reports an exact match.
    pub fn new(device: &str, options: TargetOptions) -> (Self, bool) {
        let index = ARTIX7_DEVICES
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(device));
        let device_index = index.unwrap_or(FALLBACK_INDEX);
        (
            Self {
                device_index,
                options,
            },
            index.is_some(),
        )
    }

    fn device(&self) -> &Artix7Device {
        &ARTIX7_DEVICES[self.device_index]
    }
}

impl Target for Artix7 {
    fn family_name(&self) -> &str {
        "artix7"
    }

    fn device_name(&self) -> &str {
        self.device().name
    }

    fn total_luts(&self) -> u32 {
        self.device().luts
    }

    fn total_ffs(&self) -> u32 {
        self.device().ffs
    }

    fn total_dsp(&self) -> u32 {
        self.device().dsp48e1
    }

    fn lut_input_count(&self) -> u32 {
        6
    }

    fn dsp_shape(&self) -> DspShape {
        DspShape {
            x: 25,
            y: 18,
            signed_only: true,
        }
    }

    fn dsp_lut_equivalent(&self) -> f64 {
        30.0
    }

    fn lut_delay(&self) -> Delay {
        Delay::new(0.25, 0.4, 0.55)
    }

    fn dsp_delay(&self) -> Delay {
        Delay::new(2.2, 2.9, 3.6)
    }

    fn carry_delay_per_bit(&self) -> Delay {
        Delay::new(0.010, 0.015, 0.025)
    }

    fn options(&self) -> &TargetOptions {
        &self.options
    }
}
