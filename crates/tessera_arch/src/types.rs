//! Shared data types for target models.

use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::time::Duration;
use tessera_common::Frequency;
use tessera_config::{IlpSolverKind, MultiplierParams, TilingMethod};

/// A timing delay with min/typical/max corners.
///
/// The pipeline scheduler works with the slow corner (`max_ns`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    /// Minimum delay in nanoseconds (fast corner).
    pub min_ns: f64,
    /// Typical delay in nanoseconds (nominal corner).
    pub typ_ns: f64,
    /// Maximum delay in nanoseconds (slow corner).
    pub max_ns: f64,
}

impl Delay {
    /// A zero delay (no propagation time).
    pub const ZERO: Self = Self {
        min_ns: 0.0,
        typ_ns: 0.0,
        max_ns: 0.0,
    };

    /// Creates a new delay with the given min/typ/max values.
    pub const fn new(min_ns: f64, typ_ns: f64, max_ns: f64) -> Self {
        Self {
            min_ns,
            typ_ns,
            max_ns,
        }
    }

    /// Multiplies every corner by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(
            self.min_ns * factor,
            self.typ_ns * factor,
            self.max_ns * factor,
        )
    }
}

impl Add for Delay {
    type Output = Delay;

    fn add(self, rhs: Delay) -> Delay {
        Delay::new(
            self.min_ns + rhs.min_ns,
            self.typ_ns + rhs.typ_ns,
            self.max_ns + rhs.max_ns,
        )
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A summary of device resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Number of look-up tables (ALMs for Cyclone V, LEs for Cyclone IV).
    pub luts: u32,
    /// Number of flip-flops.
    pub ffs: u32,
    /// Number of hard multiplier blocks.
    pub dsp: u32,
}

/// The native operand widths of a device's hard multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DspShape {
    /// Width of the first multiplier input.
    pub x: u32,
    /// Width of the second multiplier input.
    pub y: u32,
    /// Whether the block only multiplies two's complement inputs, so an
    /// unsigned operand must give up one bit for a zero sign.
    pub signed_only: bool,
}

impl DspShape {
    /// Usable input widths for operands of the given signedness.
    pub fn widths(&self, signed_x: bool, signed_y: bool) -> (u32, u32) {
        if self.signed_only {
            (
                self.x - u32::from(!signed_x),
                self.y - u32::from(!signed_y),
            )
        } else {
            (self.x, self.y)
        }
    }
}

/// Per-run options a target carries alongside its device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Target clock; `None` for a combinational design.
    pub frequency: Option<Frequency>,
    /// The tiling strategy the run selected.
    pub tiling_method: TilingMethod,
    /// Whether an ILP back end is offered.
    pub ilp_enabled: bool,
    /// Per-solve ILP timeout.
    pub ilp_timeout: Duration,
    /// Which ILP solver the run uses.
    pub ilp_solver: IlpSolverKind,
}

impl TargetOptions {
    /// Extracts the target options from resolved parameters.
    pub fn from_params(params: &MultiplierParams) -> Self {
        Self {
            frequency: params.target.frequency,
            tiling_method: params.tiling.method,
            ilp_enabled: params.ilp.enabled,
            ilp_timeout: params.ilp.timeout,
            ilp_solver: params.ilp.solver,
        }
    }
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            frequency: None,
            tiling_method: TilingMethod::Greedy,
            ilp_enabled: true,
            ilp_timeout: Duration::from_secs(10),
            ilp_solver: IlpSolverKind::default(),
        }
    }
}
