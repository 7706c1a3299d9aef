//! Errors raised by the instruction and symbol model.

use thiserror::Error;

/// Failures inside the IR layer. `RedeclaredIdentifier` is a user error
/// (the analyzer attaches the position); `AnalyzerBug` means the
/// analyzer itself emitted something the instruction table rejects.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IrError {
    /// A name was declared twice in the same scope.
    #[error("an identifier cannot be redeclared: '{name}'")]
    RedeclaredIdentifier { name: String },

    /// The analyzer used an instruction incorrectly.
    #[error("there is a bug in the analyzer: {0}")]
    AnalyzerBug(String),
}
