//! Diagnostic collection and reporting.
//!
//! Errors in cc0 are fail-fast and travel up the call stack as `Result`
//! values; the [`Handler`] exists for the messages that do *not* abort
//! compilation (warnings such as an integer literal clamped to zero)
//! and for tests that want to observe them.
//!
//! # Examples
//!
//! ```
//! use cc0_util::{Handler, Span};
//!
//! let handler = Handler::new();
//! handler.warning("integer literal out of range, using 0", Span::new(1, 5));
//!
//! assert!(!handler.has_errors());
//! assert_eq!(handler.warning_count(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;

use crate::Span;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A fatal problem; compilation will not produce output.
    Error,
    /// A suspicious construct; compilation continues.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic message with severity and source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: Level,
    /// Human-readable message.
    pub message: String,
    /// Source position the message refers to.
    pub span: Span,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
        }
    }

    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_dummy() {
            write!(f, "{}: {}", self.level, self.message)
        } else {
            write!(f, "{}: At {}: {}", self.level, self.span, self.message)
        }
    }
}

/// Collector for diagnostics emitted during a compilation.
///
/// Uses interior mutability so that it can be threaded through phases
/// that only hold a shared reference.
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new, empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-built diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Record a warning at the given position.
    pub fn warning(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::warning(message, span));
    }

    /// Record an error at the given position.
    pub fn error(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::error(message, span));
    }

    /// Returns true if any error-level diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of recorded warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Number of recorded errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Snapshot of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_handler_starts_empty() {
        let handler = Handler::new();
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
        assert_eq!(handler.warning_count(), 0);
    }

    #[test]
    fn test_handler_counts() {
        let handler = Handler::new();
        handler.warning("first", Span::new(1, 1));
        handler.warning("second", Span::new(2, 1));
        handler.error("boom", Span::new(3, 1));

        assert!(handler.has_errors());
        assert_eq!(handler.warning_count(), 2);
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.diagnostics().len(), 3);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning("odd literal", Span::new(2, 9));
        assert_eq!(format!("{}", diag), "warning: At line 2, column 9: odd literal");

        let diag = Diagnostic::error("no main", Span::DUMMY);
        assert_eq!(format!("{}", diag), "error: no main");
    }
}
