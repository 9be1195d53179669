//! The diagnostics system.
//!
//! The front-end never aborts on user errors: every problem becomes a
//! [`Diagnostic`] pushed onto a [`Reporter`] and processing continues on a
//! partial tree. Consumers inspect the reporter afterwards and decide
//! whether anything of severity [`Severity::Error`] warrants failure.

use span::{SourceMap, Span};
use std::{cell::RefCell, fmt};

pub mod lsp;

#[cfg(test)]
mod test;

/// A severity-tagged message pinned to a source region.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, span: Span, message: impl Into<String>) -> Self {
        Self { severity, span, message: message.into() }
    }

    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, span, message)
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, span, message)
    }

    pub fn info(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, span, message)
    }

    /// Render the diagnostic for console output.
    pub fn format(&self, map: &SourceMap) -> String {
        use colored::Colorize;

        let location = map.location(self.span);
        let severity = match self.severity {
            Severity::Error => "error".red(),
            Severity::Warning => "warning".yellow(),
            Severity::Info => "info".blue(),
        };

        format!("{location}: {severity}: {}", self.message)
    }
}

/// Level of severity of a diagnostic.
///
/// The discriminants are the values of the LSP `DiagnosticSeverity`
/// protocol enumeration and must not be changed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Info = 3,
}

impl Severity {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// The shared diagnostics sink.
///
/// Diagnostics accumulate in discovery order and are never mutated once
/// pushed. The sink is passed by shared reference throughout the pipeline.
#[derive(Default)]
pub struct Reporter {
    buffer: RefCell<Vec<Diagnostic>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        self.buffer.borrow_mut().push(diagnostic);
    }

    pub fn error(&self, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::error(span, message));
    }

    pub fn warning(&self, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::warning(span, message));
    }

    pub fn info(&self, span: Span, message: impl Into<String>) {
        self.report(Diagnostic::info(span, message));
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.borrow().is_empty()
    }

    pub fn count(&self) -> usize {
        self.buffer.borrow().len()
    }

    pub fn has_errors(&self) -> bool {
        self.buffer
            .borrow()
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.buffer.into_inner()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.buffer.borrow().clone()
    }
}
