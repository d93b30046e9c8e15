//! FPGA target models for the tessera multiplier generator.
//!
//! This crate provides the [`Target`] trait, the capability object the
//! tiling and compression engine queries for tile and compressor costs,
//! hard multiplier shapes, delays and the clock period that drives pipeline
//! scheduling. Concrete models are provided for Xilinx Artix-7, Intel
//! Cyclone V and Intel Cyclone IV E.
//!
//! # Usage
//!
//! ```
//! use tessera_arch::{load_target, TargetOptions};
//!
//! let target = load_target("cyclone_v", "5CSEMA5F31C6", TargetOptions::default()).unwrap();
//! assert_eq!(target.dsp_widths(false, false), (27, 27));
//! ```

#![warn(missing_docs)]

pub mod intel;
pub mod types;
pub mod xilinx;

pub use intel::cyclone_iv::CycloneIv;
pub use intel::cyclone_v::CycloneV;
pub use types::{Delay, DspShape, ResourceUsage, TargetOptions};
pub use xilinx::artix7::Artix7;

use std::time::Duration;
use tessera_common::{TesseraError, TesseraResult};
use tessera_config::{IlpSolverKind, MultiplierParams, TilingMethod};
use tessera_ilp::{BranchAndBound, IlpBackend, MicroLp};

/// The cost, delay and option queries of a target device.
///
/// Device models implement the required methods from their datasheet
/// tables; the provided methods derive tile and compressor costs from them.
pub trait Target: std::fmt::Debug {
    // --- Device description (required) ---

    /// Returns the canonical family name (e.g., "cyclone_v", "artix7").
    fn family_name(&self) -> &str;

    /// Returns the device part number.
    fn device_name(&self) -> &str;

    /// Returns the total number of LUTs (ALMs, LEs) in the device.
    fn total_luts(&self) -> u32;

    /// Returns the total number of flip-flops in the device.
    fn total_ffs(&self) -> u32;

    /// Returns the total number of hard multiplier blocks.
    fn total_dsp(&self) -> u32;

    /// Returns the number of inputs per LUT (typically 4 or 6).
    fn lut_input_count(&self) -> u32;

    /// Returns the native shape of one hard multiplier block.
    fn dsp_shape(&self) -> DspShape;

    /// LUT-equivalent area charged for one hard multiplier block.
    fn dsp_lut_equivalent(&self) -> f64;

    /// Delay of one LUT level including local routing.
    fn lut_delay(&self) -> Delay;

    /// Combinational delay of a hard multiplier block.
    fn dsp_delay(&self) -> Delay;

    /// Carry-chain delay per bit.
    fn carry_delay_per_bit(&self) -> Delay;

    /// The per-run options this target was loaded with.
    fn options(&self) -> &TargetOptions;

    // --- Derived costs (provided) ---

    /// Returns a summary of the total device resources.
    fn resource_summary(&self) -> ResourceUsage {
        ResourceUsage {
            luts: self.total_luts(),
            ffs: self.total_ffs(),
            dsp: self.total_dsp(),
        }
    }

    /// Usable hard multiplier widths for operands of the given signedness.
    fn dsp_widths(&self, signed_x: bool, signed_y: bool) -> (u32, u32) {
        self.dsp_shape().widths(signed_x, signed_y)
    }

    /// LUT-equivalent cost of routing one tile output bit into the bit heap
    /// and compressing it.
    fn compression_cost_per_bit(&self) -> f64 {
        if self.lut_input_count() >= 6 {
            0.65
        } else {
            1.0
        }
    }

    /// Number of LUTs that compute a product of `in_x` by `in_y` operand
    /// bits with `out_bits` result bits.
    ///
    /// Single-row products are AND arrays, two-row products use the carry
    /// chain, and anything wider than one LUT grows as a mux tree.
    fn lut_multiplier_luts(&self, in_x: u32, in_y: u32, out_bits: u32) -> f64 {
        if in_x == 0 || in_y == 0 || out_bits == 0 {
            return 0.0;
        }
        let k = self.lut_input_count();
        let fracturable = k >= 6;
        let inputs = in_x + in_y;
        if in_x.min(in_y) == 1 {
            return if fracturable {
                (f64::from(out_bits) / 2.0).ceil()
            } else {
                f64::from(out_bits)
            };
        }
        if fracturable && inputs < k {
            return (f64::from(out_bits) / 2.0).ceil();
        }
        if inputs <= k {
            return f64::from(out_bits);
        }
        if in_x.min(in_y) == 2 {
            return f64::from(in_x.max(in_y) + 1);
        }
        f64::from(out_bits) * 2f64.powi((inputs - k) as i32)
    }

    /// LUT-equivalent cost of a tile: its LUTs plus the compression of its
    /// output bits.
    fn tile_lut_cost(&self, luts: f64, out_bits: u32) -> f64 {
        luts + self.compression_cost_per_bit() * f64::from(out_bits)
    }

    /// LUT-equivalent cost of the hard multiplier blocks a tile uses.
    fn tile_dsp_cost(&self, dsp_units: u32) -> f64 {
        f64::from(dsp_units) * self.dsp_lut_equivalent()
    }

    /// LUT-equivalent area of a compressor with `inputs` input bits in its
    /// widest column group and `outputs` result bits.
    fn compressor_area(&self, inputs: u32, outputs: u32) -> f64 {
        if inputs <= 1 {
            return 0.0;
        }
        let k = self.lut_input_count();
        if k >= 6 && inputs < k {
            return (f64::from(outputs) / 2.0).ceil();
        }
        if inputs <= k {
            return f64::from(outputs);
        }
        f64::from(outputs) * 2f64.powi((inputs - k) as i32)
    }

    // --- Timing (provided) ---

    /// Delay of a carry-propagating adder of the given width.
    fn adder_delay(&self, width: u32) -> Delay {
        self.lut_delay() + self.carry_delay_per_bit().scaled(f64::from(width))
    }

    /// Delay of a tile. Hard multiplier tiles take the block delay; LUT
    /// tiles one LUT level, plus a carry chain over the outputs when the
    /// product spans two rows.
    fn tile_delay(&self, dsp_units: u32, in_x: u32, in_y: u32, out_bits: u32) -> Delay {
        if dsp_units > 0 {
            return self.dsp_delay();
        }
        if in_x.min(in_y) == 2 && in_x + in_y > self.lut_input_count() {
            return self.lut_delay() + self.carry_delay_per_bit().scaled(f64::from(out_bits));
        }
        self.lut_delay()
    }

    /// Delay of one compressor level.
    fn compressor_delay(&self) -> Delay {
        self.lut_delay()
    }

    /// Target clock period in nanoseconds; `None` for a combinational run.
    fn clock_period_ns(&self) -> Option<f64> {
        self.options().frequency.and_then(|f| f.period_ns())
    }

    /// Number of register stages a path of `delay_ns` needs at the target
    /// clock. Always 0 for a combinational run.
    fn pipeline_depth(&self, delay_ns: f64) -> u32 {
        match self.clock_period_ns() {
            Some(period) if delay_ns > period => ((delay_ns / period).ceil() as u32) - 1,
            _ => 0,
        }
    }

    // --- Run options (provided) ---

    /// The tiling strategy to instantiate.
    fn tiling_method(&self) -> TilingMethod {
        self.options().tiling_method
    }

    /// The ILP back end, if the run has one.
    fn ilp_solver(&self) -> Option<Box<dyn IlpBackend>> {
        let options = self.options();
        if !options.ilp_enabled {
            return None;
        }
        Some(match options.ilp_solver {
            IlpSolverKind::Microlp => Box::new(MicroLp::new()),
            IlpSolverKind::BranchAndBound => Box::new(BranchAndBound::new()),
        })
    }

    /// Timeout for a single ILP solve.
    fn ilp_timeout(&self) -> Duration {
        self.options().ilp_timeout
    }
}

/// Loads a target model for the given family and device.
///
/// Supported families: `"artix7"`, `"cyclone_v"`, `"cyclone_iv"`. If the
/// device part number is not found within the family, falls back to the
/// smallest known device (the target is still usable).
///
/// # Errors
///
/// Returns a configuration error if the family name is not recognized.
pub fn load_target(
    family: &str,
    device: &str,
    options: TargetOptions,
) -> TesseraResult<Box<dyn Target>> {
    match family.to_ascii_lowercase().as_str() {
        "cyclone_iv" | "cycloneiv" | "cyclone-iv" | "cyclone4" | "cyclone_4" => {
            let (target, _exact) = CycloneIv::new(device, options);
            Ok(Box::new(target))
        }
        "cyclone_v" | "cyclonev" | "cyclone-v" => {
            let (target, _exact) = CycloneV::new(device, options);
            Ok(Box::new(target))
        }
        "artix7" | "artix-7" | "artix_7" => {
            let (target, _exact) = Artix7::new(device, options);
            Ok(Box::new(target))
        }
        _ => Err(TesseraError::config(format!(
            "unknown FPGA family: {family:?}. Supported: artix7, cyclone_v, cyclone_iv"
        ))),
    }
}

/// Loads the target named by resolved multiplier parameters.
pub fn load_target_for(params: &MultiplierParams) -> TesseraResult<Box<dyn Target>> {
    load_target(
        &params.target.family,
        &params.target.device,
        TargetOptions::from_params(params),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::Frequency;

    fn artix(options: TargetOptions) -> Box<dyn Target> {
        load_target("artix7", "xc7a100tcsg324-1", options).unwrap()
    }

    #[test]
    fn load_families_and_aliases() {
        assert_eq!(artix(TargetOptions::default()).family_name(), "artix7");
        for alias in ["cyclone4", "Cyclone-IV", "cyclone_iv"] {
            let t = load_target(alias, "EP4CE22F17C6N", TargetOptions::default()).unwrap();
            assert_eq!(t.family_name(), "cyclone_iv");
            assert_eq!(t.lut_input_count(), 4);
        }
        let t = load_target("CYCLONE_V", "", TargetOptions::default()).unwrap();
        assert_eq!(t.family_name(), "cyclone_v");
    }

    #[test]
    fn unknown_family_is_configuration_error() {
        let err = load_target("spartan3", "xc3s500e", TargetOptions::default()).unwrap_err();
        assert!(matches!(err, TesseraError::Configuration { .. }));
        assert!(format!("{err}").contains("unknown FPGA family"));
    }

    #[test]
    fn lut_multiplier_costs_on_six_input_luts() {
        let t = artix(TargetOptions::default());
        assert_eq!(t.lut_multiplier_luts(1, 1, 1), 1.0);
        assert_eq!(t.lut_multiplier_luts(2, 2, 4), 2.0);
        assert_eq!(t.lut_multiplier_luts(3, 3, 6), 6.0);
        assert_eq!(t.lut_multiplier_luts(2, 6, 8), 7.0);
        assert_eq!(t.lut_multiplier_luts(4, 1, 4), 2.0);
        assert_eq!(t.lut_multiplier_luts(0, 3, 0), 0.0);
    }

    #[test]
    fn lut_costs_grow_with_covered_bits() {
        let t = artix(TargetOptions::default());
        let small = t.lut_multiplier_luts(2, 2, 4);
        let big = t.lut_multiplier_luts(3, 3, 6);
        assert!(small <= big);
        assert!(t.tile_lut_cost(small, 4) < t.tile_lut_cost(big, 6));
    }

    #[test]
    fn compressor_area_depends_on_lut_size() {
        let a7 = artix(TargetOptions::default());
        let c4 = load_target("cyclone_iv", "", TargetOptions::default()).unwrap();
        assert_eq!(a7.compressor_area(3, 2), 1.0);
        assert_eq!(c4.compressor_area(3, 2), 2.0);
        assert_eq!(a7.compressor_area(6, 3), 3.0);
        assert_eq!(a7.compressor_area(1, 1), 0.0);
    }

    #[test]
    fn combinational_run_has_no_pipeline() {
        let t = artix(TargetOptions::default());
        assert_eq!(t.clock_period_ns(), None);
        assert_eq!(t.pipeline_depth(100.0), 0);
    }

    #[test]
    fn pipeline_depth_from_frequency() {
        let options = TargetOptions {
            frequency: Some(Frequency::from_mhz(250.0)),
            ..TargetOptions::default()
        };
        let t = artix(options);
        assert_eq!(t.clock_period_ns(), Some(4.0));
        assert_eq!(t.pipeline_depth(3.9), 0);
        assert_eq!(t.pipeline_depth(4.5), 1);
        assert_eq!(t.pipeline_depth(12.5), 3);
    }

    #[test]
    fn ilp_solver_follows_options() {
        let t = artix(TargetOptions::default());
        assert_eq!(t.ilp_solver().unwrap().name(), "microlp");
        let t = artix(TargetOptions {
            ilp_solver: IlpSolverKind::BranchAndBound,
            ..TargetOptions::default()
        });
        assert_eq!(t.ilp_solver().unwrap().name(), "branch-and-bound");
        let t = artix(TargetOptions {
            ilp_enabled: false,
            ..TargetOptions::default()
        });
        assert!(t.ilp_solver().is_none());
    }

    #[test]
    fn tile_delay_by_kind() {
        let t = artix(TargetOptions::default());
        assert_eq!(t.tile_delay(1, 24, 17, 41), t.dsp_delay());
        assert_eq!(t.tile_delay(0, 3, 3, 6), t.lut_delay());
        assert!(t.tile_delay(0, 2, 8, 10).max_ns > t.lut_delay().max_ns);
    }

    #[test]
    fn adder_delay_grows_with_width() {
        let t = artix(TargetOptions::default());
        assert!(t.adder_delay(32).max_ns > t.adder_delay(8).max_ns);
        assert_eq!(t.compressor_delay(), t.lut_delay());
    }

    #[test]
    fn load_from_params() {
        let mut config = tessera_config::GeneratorConfig::for_widths(8, 8, 0, false);
        config.target.family = "cyclone_v".into();
        config.tiling.method = TilingMethod::BeamSearch;
        let params = tessera_config::resolve_params(&config).unwrap();
        let t = load_target_for(&params).unwrap();
        assert_eq!(t.family_name(), "cyclone_v");
        assert_eq!(t.tiling_method(), TilingMethod::BeamSearch);
    }
}
