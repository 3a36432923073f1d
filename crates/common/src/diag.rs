//! Diagnostics collected during a conversion run.
//!
//! A conversion never aborts on a recoverable compromise; it records what
//! was done instead (a dropped effect, a placeholder for a dangling
//! reference, a rate fallback) and keeps going. The ordered log is returned
//! alongside the result so batch tooling can inspect every compromise made
//! during one run.

use serde::{Deserialize, Serialize};

/// Category of a recoverable compromise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Malformed or unsupported segment/effect shape, recovered by
    /// substituting a gap or an unscaled clip.
    Structural,

    /// Dangling or cyclic mob reference, recovered with a placeholder clip.
    Reference,

    /// Edit rates that could not be reconciled exactly; the fallback rate
    /// policy was applied.
    RatePrecision,
}

/// One recorded compromise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Structural, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Reference, message)
    }

    pub fn rate_precision(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::RatePrecision, message)
    }
}

/// Ordered collection of diagnostics for one conversion run.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic, also emitting it as a tracing warning.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(kind = ?diagnostic.kind, "{}", diagnostic.message);
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Move all recorded entries out of the log.
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Absorb another log, preserving order.
    pub fn extend(&mut self, other: DiagnosticLog) {
        self.entries.extend(other.entries);
    }
}
