//! Intel FPGA target models.
//!
//! Supports Cyclone IV E (4-input LEs, 18x18 embedded multipliers) and
//! Cyclone V (ALMs, 27x27 variable-precision DSP blocks).

pub mod cyclone_iv;
pub mod cyclone_v;
