//! Configuration types deserialized from `tessera.toml`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The top-level generator configuration parsed from `tessera.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Operand and output widths.
    pub multiplier: MultiplierSection,
    /// Target device selection.
    #[serde(default)]
    pub target: TargetSection,
    /// Tiling method and tile family flags.
    #[serde(default)]
    pub tiling: TilingSection,
    /// ILP back end settings.
    #[serde(default)]
    pub ilp: IlpSection,
    /// Bit heap compression settings.
    #[serde(default)]
    pub compression: CompressionSection,
}

/// The `[multiplier]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiplierSection {
    /// Width of the X operand in bits.
    pub wx: u32,
    /// Width of the Y operand in bits.
    pub wy: u32,
    /// Output width in bits; 0 requests the full `wx + wy` product.
    #[serde(default)]
    pub w_out: u32,
    /// Whether both operands are two's complement.
    #[serde(default)]
    pub signed: bool,
}

/// The `[target]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSection {
    /// Device family name (e.g., "artix7", "cyclone_v").
    #[serde(default = "default_family")]
    pub family: String,
    /// Device part number; unknown parts fall back to the family default.
    #[serde(default)]
    pub device: String,
    /// Target clock frequency (e.g., "300MHz"); absent means combinational.
    #[serde(default)]
    pub frequency: Option<String>,
}

fn default_family() -> String {
    "artix7".to_string()
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            family: default_family(),
            device: String::new(),
            frequency: None,
        }
    }
}

/// The `[tiling]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingSection {
    /// Tiling strategy to instantiate.
    pub method: TilingMethod,
    /// Upper bound on DSP blocks; `None` leaves DSP usage unconstrained.
    pub max_dsp: Option<u32>,
    /// Minimum fraction of a DSP tile's area that must cover the grid.
    pub dsp_occupation_threshold: f64,
    /// Number of partial solutions retained by beam search.
    pub beam_width: usize,
    /// Let tilings leave truncated-region cells uncovered within the error
    /// budget.
    pub opti_trunc: bool,
    /// Allow DSP-based tiles.
    pub use_dsp: bool,
    /// Allow LUT-based tiles.
    pub use_lut: bool,
    /// Allow composite tiles chaining two DSP blocks.
    pub super_tiles: bool,
    /// Allow 2xk LUT tiles.
    pub two_xk: bool,
    /// Allow irregular (non-rectangular) LUT tiles.
    pub irregular: bool,
    /// Allow Karatsuba pairs of DSP tiles.
    pub karatsuba: bool,
    /// Enable the opt-in bit heap LSB pruning pass.
    pub prune_bitheap_lsb: bool,
}

impl Default for TilingSection {
    fn default() -> Self {
        Self {
            method: TilingMethod::Greedy,
            max_dsp: None,
            dsp_occupation_threshold: 0.0,
            beam_width: 4,
            opti_trunc: true,
            use_dsp: true,
            use_lut: true,
            super_tiles: false,
            two_xk: true,
            irregular: false,
            karatsuba: false,
            prune_bitheap_lsb: false,
        }
    }
}

/// The `[ilp]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IlpSection {
    /// Whether an ILP back end is available to the run.
    pub enabled: bool,
    /// Solver timeout per solve call, in milliseconds.
    pub timeout_ms: u64,
    /// How many times a model without a solution is relaxed and re-solved.
    pub max_relaxations: u32,
    /// Which solver runs the models.
    pub solver: IlpSolverKind,
}

impl Default for IlpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 10_000,
            max_relaxations: 4,
            solver: IlpSolverKind::default(),
        }
    }
}

/// The ILP solvers a run can select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IlpSolverKind {
    /// The `microlp` simplex solver, with branch-and-bound as fallback.
    #[default]
    Microlp,
    /// The built-in branch-and-bound search only.
    BranchAndBound,
}

impl IlpSolverKind {
    /// Returns the configuration string of this solver.
    pub fn name(self) -> &'static str {
        match self {
            IlpSolverKind::Microlp => "microlp",
            IlpSolverKind::BranchAndBound => "branch-and-bound",
        }
    }
}

impl fmt::Display for IlpSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IlpSolverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "microlp" | "simplex" => Ok(IlpSolverKind::Microlp),
            "branch-and-bound" | "bnb" => Ok(IlpSolverKind::BranchAndBound),
            _ => Err(ConfigError::Unknown {
                kind: "ILP solver",
                value: s.to_string(),
            }),
        }
    }
}

/// The `[compression]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSection {
    /// How compressors are selected.
    pub strategy: CompressionMode,
    /// Which final adder collapses the compressed heap.
    pub final_adder: FinalAdderKind,
}

/// The tiling strategies a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TilingMethod {
    /// Fixed raster scan, cheapest fitting tile per free cell.
    BasicRaster,
    /// Greedy scan from the most significant corner with DSP preference.
    Greedy,
    /// Greedy with locally optimized anchor positions.
    #[serde(rename = "xgreedy")]
    XGreedy,
    /// Beam search over greedy expansions.
    BeamSearch,
    /// Exact 0/1 ILP covering.
    OptimalIlp,
    /// Joint tiling and compression ILP.
    JointIlp,
}

impl TilingMethod {
    /// All methods, in documentation order.
    pub const ALL: [TilingMethod; 6] = [
        TilingMethod::BasicRaster,
        TilingMethod::Greedy,
        TilingMethod::XGreedy,
        TilingMethod::BeamSearch,
        TilingMethod::OptimalIlp,
        TilingMethod::JointIlp,
    ];

    /// Returns the configuration string of this method.
    pub fn name(self) -> &'static str {
        match self {
            TilingMethod::BasicRaster => "basic-raster",
            TilingMethod::Greedy => "greedy",
            TilingMethod::XGreedy => "xgreedy",
            TilingMethod::BeamSearch => "beam-search",
            TilingMethod::OptimalIlp => "optimal-ilp",
            TilingMethod::JointIlp => "joint-ilp",
        }
    }

    /// Returns `true` if the method needs an ILP back end.
    pub fn requires_ilp(self) -> bool {
        matches!(self, TilingMethod::OptimalIlp | TilingMethod::JointIlp)
    }
}

impl fmt::Display for TilingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TilingMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('_', "-");
        match lower.as_str() {
            "basic-raster" | "basic" | "raster" => Ok(TilingMethod::BasicRaster),
            "greedy" => Ok(TilingMethod::Greedy),
            "xgreedy" | "x-greedy" => Ok(TilingMethod::XGreedy),
            "beam-search" | "beam" | "beamsearch" => Ok(TilingMethod::BeamSearch),
            "optimal-ilp" | "optimal" | "ilp" => Ok(TilingMethod::OptimalIlp),
            "joint-ilp" | "joint" => Ok(TilingMethod::JointIlp),
            _ => Err(ConfigError::Unknown {
                kind: "tiling method",
                value: s.to_string(),
            }),
        }
    }
}

/// How compressors are selected for the bit heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    /// Per-stage efficiency-driven greedy selection.
    #[default]
    Heuristic,
    /// Compressor counts solved as an ILP after tiling.
    Ilp,
}

impl FromStr for CompressionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "greedy" => Ok(CompressionMode::Heuristic),
            "ilp" => Ok(CompressionMode::Ilp),
            _ => Err(ConfigError::Unknown {
                kind: "compression strategy",
                value: s.to_string(),
            }),
        }
    }
}

/// The final carry-propagating adder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalAdderKind {
    /// Two-operand ripple-carry adder.
    #[default]
    Binary,
    /// Three-operand adder.
    Ternary,
}

impl FinalAdderKind {
    /// Number of rows the final adder accepts per column.
    pub fn arity(self) -> u32 {
        match self {
            FinalAdderKind::Binary => 2,
            FinalAdderKind::Ternary => 3,
        }
    }
}

impl FromStr for FinalAdderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "2" => Ok(FinalAdderKind::Binary),
            "ternary" | "3" => Ok(FinalAdderKind::Ternary),
            _ => Err(ConfigError::Unknown {
                kind: "final adder",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_roundtrip_through_from_str() {
        for method in TilingMethod::ALL {
            assert_eq!(method.name().parse::<TilingMethod>().unwrap(), method);
        }
    }

    #[test]
    fn method_aliases() {
        assert_eq!("ILP".parse::<TilingMethod>().unwrap(), TilingMethod::OptimalIlp);
        assert_eq!("beam_search".parse::<TilingMethod>().unwrap(), TilingMethod::BeamSearch);
        assert!("annealing".parse::<TilingMethod>().is_err());
    }

    #[test]
    fn only_ilp_methods_require_ilp() {
        let ilp: Vec<_> = TilingMethod::ALL
            .into_iter()
            .filter(|m| m.requires_ilp())
            .collect();
        assert_eq!(ilp, vec![TilingMethod::OptimalIlp, TilingMethod::JointIlp]);
    }

    #[test]
    fn final_adder_arity() {
        assert_eq!(FinalAdderKind::Binary.arity(), 2);
        assert_eq!("ternary".parse::<FinalAdderKind>().unwrap().arity(), 3);
    }

    #[test]
    fn compression_mode_from_str() {
        assert_eq!("ILP".parse::<CompressionMode>().unwrap(), CompressionMode::Ilp);
        assert!("annealing".parse::<CompressionMode>().is_err());
    }

    #[test]
    fn method_serde_uses_config_names() {
        let json = serde_json::to_string(&TilingMethod::XGreedy).unwrap();
        assert_eq!(json, "\"xgreedy\"");
        let back: TilingMethod = serde_json::from_str("\"joint-ilp\"").unwrap();
        assert_eq!(back, TilingMethod::JointIlp);
    }

    #[test]
    fn tiling_defaults() {
        let t = TilingSection::default();
        assert_eq!(t.method, TilingMethod::Greedy);
        assert!(t.use_dsp && t.use_lut && t.two_xk);
        assert!(!t.prune_bitheap_lsb);
        assert_eq!(t.beam_width, 4);
    }
}
