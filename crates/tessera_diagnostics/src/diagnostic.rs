//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message.
///
/// The `context` names the operator being generated (for example
/// `IntMultiplier_8x8_16`), which replaces the source locations a language
/// front end would attach.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The main message.
    pub message: String,
    /// The operator this diagnostic concerns, if any.
    pub context: Option<String>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Creates a note diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, code, message)
    }

    /// Sets the operator context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}
