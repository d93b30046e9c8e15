//! Structured diagnostics for the multiplier generator.
//!
//! Engine stages never print. They emit [`Diagnostic`] values with a severity,
//! a category-prefixed code and the operator context into a shared
//! [`DiagnosticSink`]; the front end decides how to render them through a
//! [`DiagnosticRenderer`] (rustc-style text or one JSON object per line).

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
