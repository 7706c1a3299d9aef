//! Assembler error types.

use thiserror::Error;

/// A failure in either back-end serializer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AssembleError {
    /// The program defines no `main` function; nothing is emitted.
    #[error("no 'main' function is defined")]
    NoMainDefined,

    /// A listing line does not parse as a section header, constant,
    /// briefing, or instruction.
    #[error("malformed listing line: '{line}'")]
    MalformedListing { line: String },

    /// An instruction line names no known opcode.
    #[error("unknown mnemonic: '{mnemonic}'")]
    UnknownMnemonic { mnemonic: String },

    /// The analyzed program violates an assembler precondition; this
    /// indicates a compiler bug rather than a user error.
    #[error("inconsistent program: {0}")]
    InconsistentProgram(String),
}
