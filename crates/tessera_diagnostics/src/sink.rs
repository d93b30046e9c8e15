//! Shared collector for the diagnostics of one generator run.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::{Mutex, MutexGuard};

/// Collects the diagnostics raised while building one multiplier.
///
/// Every stage (tiling, projection, compression, emission) receives the
/// same `&DiagnosticSink`. Diagnostics keep their emission order.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        self.lock().push(diag);
    }

    /// Number of diagnostics recorded with `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|d| d.severity == severity).count()
    }

    /// Returns `true` once an error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Returns `true` if a diagnostic with `code` has been recorded.
    pub fn has_code(&self, code: DiagnosticCode) -> bool {
        self.lock().iter().any(|d| d.code == code)
    }

    /// Drains the sink.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Copy of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }
}
