//! Resolution of a parsed configuration into validated multiplier parameters.

use crate::error::ConfigError;
use crate::types::{
    CompressionMode, FinalAdderKind, GeneratorConfig, IlpSolverKind, MultiplierSection,
    TilingMethod,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tessera_common::Frequency;

/// The widest operand the generator accepts.
///
/// Products and error budgets are computed in `u128`, which leaves headroom
/// for the sign-offset constants of two 60-bit operands.
pub const MAX_OPERAND_WIDTH: u32 = 60;

/// Fully validated parameters for one multiplier construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierParams {
    /// Width of the X operand.
    pub wx: u32,
    /// Width of the Y operand.
    pub wy: u32,
    /// Output width; equals `wx + wy` when full precision was requested.
    pub w_out: u32,
    /// Whether both operands are two's complement.
    pub signed: bool,
    /// Target device selection.
    pub target: TargetSpec,
    /// Tiling options.
    pub tiling: TilingOptions,
    /// ILP back end options.
    pub ilp: IlpOptions,
    /// Compression options.
    pub compression: CompressionOptions,
}

impl MultiplierParams {
    /// Width of the exact product, `wx + wy`.
    pub fn w_full(&self) -> u32 {
        self.wx + self.wy
    }

    /// Number of low product bits discarded by truncation.
    pub fn truncated_bits(&self) -> u32 {
        self.w_full() - self.w_out
    }

    /// Returns `true` if fewer than `wx + wy` output bits were requested.
    pub fn is_truncated(&self) -> bool {
        self.w_out < self.w_full()
    }

    /// The operator name used for diagnostics context and emitted modules.
    pub fn operator_name(&self) -> String {
        let sign = if self.signed { "s" } else { "u" };
        format!("IntMultiplier_{}x{}_{}_{sign}", self.wx, self.wy, self.w_out)
    }
}

/// The resolved `[target]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Device family name.
    pub family: String,
    /// Device part number, possibly empty.
    pub device: String,
    /// Target clock frequency, if pipelining was requested.
    pub frequency: Option<Frequency>,
}

/// Which tile families the collection may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFamilies {
    /// DSP rectangles.
    pub use_dsp: bool,
    /// LUT-based small multipliers.
    pub use_lut: bool,
    /// Two chained DSP blocks.
    pub super_tiles: bool,
    /// 2xk LUT shapes.
    pub two_xk: bool,
    /// Irregular LUT shapes.
    pub irregular: bool,
    /// Karatsuba DSP pairs.
    pub karatsuba: bool,
}

impl TileFamilies {
    /// Returns `true` if at least one base family (DSP or LUT) is enabled.
    pub fn any_enabled(&self) -> bool {
        self.use_dsp || self.use_lut
    }

    /// Only plain LUT tiles.
    pub fn lut_only() -> Self {
        Self {
            use_dsp: false,
            use_lut: true,
            super_tiles: false,
            two_xk: false,
            irregular: false,
            karatsuba: false,
        }
    }
}

/// The resolved `[tiling]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingOptions {
    /// Which strategy to instantiate.
    pub method: TilingMethod,
    /// DSP budget, if any.
    pub max_dsp: Option<u32>,
    /// Minimum covered fraction for a DSP placement, in `[0, 1]`.
    pub dsp_occupation_threshold: f64,
    /// Beam width, at least 1.
    pub beam_width: usize,
    /// Let tilings leave truncated-region cells uncovered within the error
    /// budget; when off every grid cell is covered.
    pub opti_trunc: bool,
    /// Enabled tile families.
    pub families: TileFamilies,
    /// Run the bit heap LSB pruning pass.
    pub prune_bitheap_lsb: bool,
}

/// The resolved `[ilp]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IlpOptions {
    /// Whether an ILP back end is offered to the run.
    pub enabled: bool,
    /// Per-solve timeout.
    pub timeout: Duration,
    /// Relaxation attempts: one more stage for the compression models, a
    /// doubled timeout for the covering model.
    pub max_relaxations: u32,
    /// Solver selection.
    pub solver: IlpSolverKind,
}

/// The resolved `[compression]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Compressor selection mode.
    pub mode: CompressionMode,
    /// Final adder kind.
    pub final_adder: FinalAdderKind,
}

impl GeneratorConfig {
    /// Builds a configuration with default settings for the given widths.
    pub fn for_widths(wx: u32, wy: u32, w_out: u32, signed: bool) -> Self {
        Self {
            multiplier: MultiplierSection {
                wx,
                wy,
                w_out,
                signed,
            },
            ..Self::default()
        }
    }
}

/// Validates a configuration and resolves it into [`MultiplierParams`].
///
/// `w_out = 0` resolves to full precision.
pub fn resolve_params(config: &GeneratorConfig) -> Result<MultiplierParams, ConfigError> {
    let m = &config.multiplier;
    for (name, width) in [("wx", m.wx), ("wy", m.wy)] {
        if width == 0 || width > MAX_OPERAND_WIDTH {
            return Err(ConfigError::ValidationError(format!(
                "multiplier.{name} = {width} must be in 1..={MAX_OPERAND_WIDTH}"
            )));
        }
    }
    let w_full = m.wx + m.wy;
    if m.w_out > w_full {
        return Err(ConfigError::ValidationError(format!(
            "multiplier.w_out = {} exceeds the product width {w_full}",
            m.w_out
        )));
    }
    let w_out = if m.w_out == 0 { w_full } else { m.w_out };

    let t = &config.tiling;
    if !(0.0..=1.0).contains(&t.dsp_occupation_threshold) {
        return Err(ConfigError::ValidationError(format!(
            "tiling.dsp_occupation_threshold = {} must be in [0, 1]",
            t.dsp_occupation_threshold
        )));
    }
    if t.beam_width == 0 {
        return Err(ConfigError::ValidationError(
            "tiling.beam_width must be at least 1".to_string(),
        ));
    }

    let frequency = match &config.target.frequency {
        Some(text) => {
            let freq: Frequency = text
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("target.frequency: {e}")))?;
            if freq.hz() <= 0.0 {
                None
            } else {
                Some(freq)
            }
        }
        None => None,
    };

    Ok(MultiplierParams {
        wx: m.wx,
        wy: m.wy,
        w_out,
        signed: m.signed,
        target: TargetSpec {
            family: config.target.family.clone(),
            device: config.target.device.clone(),
            frequency,
        },
        tiling: TilingOptions {
            method: t.method,
            max_dsp: t.max_dsp,
            dsp_occupation_threshold: t.dsp_occupation_threshold,
            beam_width: t.beam_width,
            opti_trunc: t.opti_trunc,
            families: TileFamilies {
                use_dsp: t.use_dsp,
                use_lut: t.use_lut,
                super_tiles: t.super_tiles,
                two_xk: t.two_xk,
                irregular: t.irregular,
                karatsuba: t.karatsuba,
            },
            prune_bitheap_lsb: t.prune_bitheap_lsb,
        },
        ilp: IlpOptions {
            enabled: config.ilp.enabled,
            timeout: Duration::from_millis(config.ilp.timeout_ms),
            max_relaxations: config.ilp.max_relaxations,
            solver: config.ilp.solver,
        },
        compression: CompressionOptions {
            mode: config.compression.strategy,
            final_adder: config.compression.final_adder,
        },
    })
}
