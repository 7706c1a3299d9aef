//! cc0-sem - The analyzer / code generator.
//!
//! A recursive-descent pass over the token stream that concurrently
//! validates the syntax, maintains the scoped symbol tables, applies the
//! implicit numeric conversions, and emits VM instructions directly into
//! per-function instruction streams. There is no AST: jump targets and
//! late type conversions are fixed up by backpatching byte offsets.
//!
//! # Backtracking discipline
//!
//! Every production records the stream position on entry and rewinds to
//! it before reporting failure, which lets callers speculate between
//! alternatives (most visibly in `statement` and `primary`). A failure
//! outside speculation propagates to the top and aborts compilation.
//!
//! # Current function / current scope
//!
//! The pair is a stack discipline: analysis starts in the global start
//! pseudo-function and the global scope, and each function definition
//! pushes its record and body scope for the duration of its body.

mod error;
mod expr;
mod io;
mod items;
mod stmt;
mod types;

pub use error::AnalyzeError;

use cc0_ir::{FuncId, Function, IrError, Opcode, Program, ScopeId};
use cc0_lex::{Token, TokenStream};
use cc0_util::Span;

/// Analyze a token stream into a fully populated [`Program`].
pub fn analyze(stream: TokenStream) -> Result<Program, AnalyzeError> {
    let mut analyzer = Analyzer::new(stream);
    analyzer.run()?;
    Ok(analyzer.program)
}

/// The (function, scope) pair the analyzer is currently emitting into.
struct Frame {
    func: FuncId,
    scope: ScopeId,
}

/// Analyzer state threaded through every production.
pub(crate) struct Analyzer {
    stream: TokenStream,
    program: Program,
    frames: Vec<Frame>,
    /// Position of the most recently consumed token, for diagnostics.
    last_span: Span,
}

impl Analyzer {
    fn new(stream: TokenStream) -> Self {
        let program = Program::new();
        let frames = vec![Frame {
            func: program.start,
            scope: program.global_scope,
        }];
        Self {
            stream,
            program,
            frames,
            last_span: Span::DUMMY,
        }
    }

    fn run(&mut self) -> Result<(), AnalyzeError> {
        self.analyze_variable_declarations()?;
        self.analyze_function_definitions()?;

        if let Some(token) = self.stream.peek() {
            return Err(AnalyzeError::InvalidDeclaration { span: token.span });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Token stream access
    // ------------------------------------------------------------------

    /// Consume the next token, tracking its position.
    pub(crate) fn next_token(&mut self) -> Result<Token, AnalyzeError> {
        match self.stream.next() {
            Some(token) => {
                self.last_span = token.span;
                Ok(token)
            }
            None => Err(AnalyzeError::NoMoreTokens {
                span: self.last_span,
            }),
        }
    }

    /// Current stream position, for later [`reset_to`](Self::reset_to).
    pub(crate) fn pos(&self) -> usize {
        self.stream.pos()
    }

    /// Rewind the stream, restoring the "last consumed" position.
    pub(crate) fn reset_to(&mut self, pos: usize) {
        self.stream.reset_to(pos);
        self.last_span = match pos.checked_sub(1).and_then(|i| self.stream.get(i)) {
            Some(token) => token.span,
            None => Span::DUMMY,
        };
    }

    /// Peek at the next token without consuming it.
    pub(crate) fn peek(&self) -> Option<&Token> {
        self.stream.peek()
    }

    /// Position of the most recently consumed token.
    pub(crate) fn here(&self) -> Span {
        self.last_span
    }

    // ------------------------------------------------------------------
    // Current function / scope
    // ------------------------------------------------------------------

    fn frame(&self) -> &Frame {
        self.frames.last().expect("the global frame is never popped")
    }

    pub(crate) fn current_func(&self) -> FuncId {
        self.frame().func
    }

    pub(crate) fn current_scope(&self) -> ScopeId {
        self.frame().scope
    }

    /// Enter a function body: subsequent emission targets `func` and
    /// name resolution starts at `scope`.
    pub(crate) fn push_frame(&mut self, func: FuncId, scope: ScopeId) {
        self.frames.push(Frame { func, scope });
    }

    /// Leave the innermost function body.
    pub(crate) fn pop_frame(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot pop the global frame");
        self.frames.pop();
    }

    pub(crate) fn func(&self) -> &Function {
        &self.program.functions[self.current_func()]
    }

    pub(crate) fn func_mut(&mut self) -> &mut Function {
        let func = self.current_func();
        &mut self.program.functions[func]
    }

    /// Byte offset at which the next emitted instruction will begin.
    pub(crate) fn offset(&self) -> u32 {
        self.func().current_offset()
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// Append an instruction to the current function.
    pub(crate) fn emit(&mut self, opcode: Opcode, operands: &[i64]) -> Result<(), AnalyzeError> {
        let result = self.func_mut().append(opcode, operands);
        result.map_err(|e| self.lift(e))
    }

    /// Backpatch the first operand of the jump beginning at `offset`.
    pub(crate) fn patch_jump(&mut self, offset: u32, target: u32) -> Result<(), AnalyzeError> {
        let result = self.func_mut().patch_operand_at(offset, i64::from(target));
        result.map_err(|e| self.lift(e))
    }

    /// Attach a source position to an IR-level failure.
    pub(crate) fn lift(&self, err: IrError) -> AnalyzeError {
        match err {
            IrError::RedeclaredIdentifier { name } => AnalyzeError::RedeclaredIdentifier {
                span: self.last_span,
                name,
            },
            IrError::AnalyzerBug(message) => AnalyzeError::AnalyzerBug { message },
        }
    }

    pub(crate) fn program(&mut self) -> &mut Program {
        &mut self.program
    }

    pub(crate) fn prog(&self) -> &Program {
        &self.program
    }

    /// Resolve `name` from `scope`, returning an owned symbol so the
    /// caller can keep emitting while holding it.
    pub(crate) fn resolve(&self, scope: ScopeId, name: &str) -> Option<(cc0_ir::Symbol, u32)> {
        self.program
            .lookup_with_level(scope, name)
            .map(|(symbol, level)| (symbol.clone(), level))
    }
}

#[cfg(test)]
mod tests;
