//! Xilinx (AMD) FPGA target models.
//!
//! Currently supports Artix-7 with hardcoded device parameters.

pub mod artix7;
