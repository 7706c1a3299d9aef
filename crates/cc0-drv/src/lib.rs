//! cc0-drv - Compiler driver.
//!
//! Orchestrates the pipeline: read the source, lex it into a token
//! stream, analyze it into a program, assemble the textual listing, and
//! optionally encode the listing into the binary object format. Every
//! phase is fail-fast; the first error aborts with a phase-specific
//! exit code:
//!
//! | code | phase |
//! |------|-------|
//! | 0 | success |
//! | 1 | source or output I/O |
//! | 2 | lexical analysis |
//! | 3 | analysis / code generation |
//! | 4 | assembly (including a missing `main`) |

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use cc0_gen::{assemble_binary, assemble_text, AssembleError};
use cc0_lex::{tokenize, LexError};
use cc0_sem::{analyze, AnalyzeError};
use cc0_util::Handler;

/// Which artifact to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    /// The textual assembly listing.
    Listing,
    /// The binary object file.
    Object,
}

/// A failure anywhere in the pipeline.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The source file could not be read.
    #[error("failed to open source file '{path}': {source}")]
    SourceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The output file could not be written.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A lexical error.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// An analyzer error.
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    /// An assembler error.
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

impl DriverError {
    /// The process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::SourceOpenFailed { .. } | DriverError::OutputWriteFailed { .. } => 1,
            DriverError::Lex(_) => 2,
            DriverError::Analyze(_) => 3,
            DriverError::Assemble(_) => 4,
        }
    }
}

/// Compile c0 source text to the assembly listing.
pub fn compile_to_listing(source: &str, handler: &Handler) -> Result<String, DriverError> {
    debug!("lexing");
    let stream = tokenize(source, handler)?;
    debug!(tokens = stream.len(), "analyzing");
    let program = analyze(stream)?;
    debug!(
        functions = program.callables().count(),
        constants = program.pool.len(),
        "assembling listing"
    );
    Ok(assemble_text(&program)?)
}

/// Compile c0 source text to the binary object format.
pub fn compile_to_object(source: &str, handler: &Handler) -> Result<Vec<u8>, DriverError> {
    let listing = compile_to_listing(source, handler)?;
    debug!(listing_bytes = listing.len(), "assembling object");
    Ok(assemble_binary(&listing)?)
}

/// One compiler invocation: input path, output path, artifact kind.
pub struct Session {
    input: PathBuf,
    output: PathBuf,
    emit: Emit,
    handler: Handler,
}

impl Session {
    /// Create a session.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, emit: Emit) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            emit,
            handler: Handler::new(),
        }
    }

    /// Run the pipeline and write the artifact.
    pub fn run(&self) -> Result<(), DriverError> {
        let source =
            fs::read_to_string(&self.input).map_err(|source| DriverError::SourceOpenFailed {
                path: self.input.clone(),
                source,
            })?;

        let artifact = match self.emit {
            Emit::Listing => compile_to_listing(&source, &self.handler)?.into_bytes(),
            Emit::Object => compile_to_object(&source, &self.handler)?,
        };

        write_output(&self.output, &artifact)?;
        debug!(output = %self.output.display(), bytes = artifact.len(), "wrote artifact");
        Ok(())
    }

    /// Warnings collected while compiling (clamped literals and the
    /// like); they never fail the build.
    pub fn warnings(&self) -> Vec<String> {
        self.handler
            .diagnostics()
            .iter()
            .map(|diag| diag.to_string())
            .collect()
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), DriverError> {
    fs::write(path, bytes).map_err(|source| DriverError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
