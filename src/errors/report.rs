// src/errors/report.rs
//! Accumulating diagnostic sink.

use crate::errors::sema::SemanticError;
use crate::frontend::Span;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

/// A structured diagnostic: the error, its primary source location, and
/// any notes attached after it was emitted.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub error: SemanticError,
    pub span: Span,
    pub notes: Vec<SemanticError>,
}

impl Diagnostic {
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self {
            error,
            span,
            notes: Vec::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        severity_of(&self.error)
    }
}

fn severity_of(error: &SemanticError) -> Severity {
    match error {
        SemanticError::UnreachableCode { .. } => Severity::Warning,
        SemanticError::Candidates { .. } => Severity::Note,
        _ => Severity::Error,
    }
}

/// Collects diagnostics during analysis. Errors are accumulated, never
/// thrown; a note attaches to the most recently emitted diagnostic.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an error or warning at the given location
    pub fn emit(&mut self, error: SemanticError, span: Span) {
        if severity_of(&error) == Severity::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(Diagnostic::new(error, span));
    }

    /// Attach a note to the immediately preceding diagnostic
    pub fn attach_note(&mut self, note: SemanticError) {
        if let Some(last) = self.diagnostics.last_mut() {
            last.notes.push(note);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
