//! Integer multiplier generation.
//!
//! [`generate`] runs the whole pipeline for one set of parameters: it
//! tiles the partial-product grid, projects the tiles onto a bit heap,
//! checks the truncation error, and compresses the heap down to the final
//! adder. The resulting [`MultiplierDesign`] can be evaluated bit-accurately,
//! checked against [`MultiplierDesign::emulate`], summarized as a
//! [`ResourceReport`], and emitted through any
//! [`CodeEmitter`](tessera_emit::CodeEmitter).
//!
//! # Usage
//!
//! ```
//! use tessera_config::{resolve_params, GeneratorConfig};
//! use tessera_diagnostics::DiagnosticSink;
//! use tessera_multiplier::generate;
//!
//! let params = resolve_params(&GeneratorConfig::for_widths(8, 8, 0, false)).unwrap();
//! let design = generate(&params, &DiagnosticSink::new()).unwrap();
//! assert_eq!(design.evaluate(200, 100).unwrap(), 20_000);
//! assert!(design.to_verilog().unwrap().contains("module IntMultiplier_8x8_16_u"));
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod design;
pub mod emission;
pub mod projection;
pub mod report;
pub mod vectors;

pub use builder::{generate, generate_from_config, MultiplierBuilder};
pub use design::MultiplierDesign;
pub use emission::emit_design;
pub use projection::ProjectedTile;
pub use report::{FamilyCount, ResourceReport};
pub use vectors::{Expected, TestVector};
