//! Diagnostic rendering backends.

use crate::diagnostic::Diagnostic;

/// Renders a diagnostic into a formatted string.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// ```text
/// warning[W201]: DSP block underutilized
///   --> IntMultiplier_20x20_40
///    = note: tile covers 40% of its area
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in the header line.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, diag: &Diagnostic) -> String {
        let head = format!("{}[{}]", diag.severity, diag.code);
        if !self.color {
            return head;
        }
        let ansi = match diag.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
            crate::Severity::Note => "36",
            crate::Severity::Help => "32",
        };
        format!("\x1b[1;{ansi}m{head}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}: {}\n", self.header(diag), diag.message);
        if let Some(context) = &diag.context {
            out.push_str(&format!("  --> {context}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as a single-line JSON object.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        // Serializing plain data with derived impls cannot fail.
        serde_json::to_string(diag).unwrap_or_default()
    }
}
