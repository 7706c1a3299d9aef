//! Statement analysis: compounds, control flow, and the speculative
//! statement dispatcher.
//!
//! `statement` tries its alternatives in a fixed order, rewinding the
//! stream between attempts. Only an assignment (or `scan`) whose target
//! turns out to be a constant short-circuits the speculation: retrying
//! the other alternatives could never succeed and would bury the report.

use cc0_ir::{Opcode, ValueType};
use cc0_lex::TokenKind;

use crate::error::AnalyzeError;
use crate::Analyzer;

impl Analyzer {
    /// `compound ::= '{' {variable-decl} statement-seq '}'`
    pub(crate) fn analyze_compound_statement(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        if !self.expect(TokenKind::LBrace) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        self.analyze_variable_declarations()?;
        self.analyze_statement_seq()?;
        if !self.expect(TokenKind::RBrace) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        Ok(())
    }

    /// `statement-seq ::= {statement}`
    ///
    /// Stops at the first statement that matches no alternative; the
    /// enclosing compound then checks for its closing brace.
    pub(crate) fn analyze_statement_seq(&mut self) -> Result<(), AnalyzeError> {
        loop {
            match self.analyze_statement() {
                Ok(()) => continue,
                Err(err) if err.is_fatal() => return Err(err),
                Err(_) => return Ok(()),
            }
        }
    }

    /// One statement, by speculative alternatives.
    pub(crate) fn analyze_statement(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();

        // compound
        if self.expect(TokenKind::LBrace) {
            self.analyze_variable_declarations()?;
            self.analyze_statement_seq()?;
            if !self.expect(TokenKind::RBrace) {
                self.reset_to(mark);
                return Err(AnalyzeError::InvalidStatement { span: self.here() });
            }
            return Ok(());
        }

        // 'if' ...
        match self.analyze_condition_statement() {
            Ok(()) => return Ok(()),
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        // 'while' ...
        match self.analyze_loop_statement() {
            Ok(()) => return Ok(()),
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        // 'return' ...
        match self.analyze_return_statement() {
            Ok(()) => return Ok(()),
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        // 'print' | 'scan'
        match self.analyze_io_statement() {
            Ok(()) => return Ok(()),
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        // assignment ';'
        match self.analyze_assignment_expression() {
            Ok(()) => {
                if !self.expect(TokenKind::Semicolon) {
                    return Err(AnalyzeError::InvalidStatement { span: self.here() });
                }
                return Ok(());
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        // function-call ';'
        match self.analyze_function_call() {
            Ok(_) => {
                if !self.expect(TokenKind::Semicolon) {
                    return Err(AnalyzeError::InvalidStatement { span: self.here() });
                }
                return Ok(());
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        // ';'
        if self.expect(TokenKind::Semicolon) {
            return Ok(());
        }

        self.reset_to(mark);
        Err(AnalyzeError::InvalidStatement { span: self.here() })
    }

    /// `'if' '(' condition ')' statement ['else' statement]`
    ///
    /// The condition leaves a conditional jump to be patched. After the
    /// then-branch a placeholder is appended: a harmless `nop` when no
    /// `else` follows, a `jmp` (to be patched past the else-branch) when
    /// one does. Peeking for `else` before choosing keeps every byte
    /// offset recorded inside the else-branch stable. The conditional
    /// jump targets the offset after the placeholder in both cases.
    fn analyze_condition_statement(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        if !self.expect(TokenKind::If) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        if !self.expect(TokenKind::LParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        let cond_jump = match self.analyze_condition() {
            Ok(offset) => offset,
            Err(err) => {
                self.reset_to(mark);
                return Err(err);
            }
        };
        if !self.expect(TokenKind::RParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        self.analyze_statement()?;

        let else_follows = matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Else));
        if else_follows {
            let placeholder = self.offset();
            self.emit(Opcode::Jmp, &[0])?;
            let after_placeholder = self.offset();
            self.patch_jump(cond_jump, after_placeholder)?;

            self.next_token()?; // the 'else'
            self.analyze_statement()?;
            let end = self.offset();
            self.patch_jump(placeholder, end)?;
        } else {
            self.emit(Opcode::Nop, &[])?;
            let after_placeholder = self.offset();
            self.patch_jump(cond_jump, after_placeholder)?;
        }
        Ok(())
    }

    /// `'while' '(' condition ')' statement`
    ///
    /// The loop closes with a backward `jmp` to the offset recorded
    /// before the condition; the condition's jump is patched to the
    /// offset after that `jmp`.
    fn analyze_loop_statement(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        if !self.expect(TokenKind::While) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        if !self.expect(TokenKind::LParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        let loop_head = self.offset();
        let cond_jump = match self.analyze_condition() {
            Ok(offset) => offset,
            Err(err) => {
                self.reset_to(mark);
                return Err(err);
            }
        };
        if !self.expect(TokenKind::RParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        self.analyze_statement()?;

        self.emit(Opcode::Jmp, &[i64::from(loop_head)])?;
        let after_body = self.offset();
        self.patch_jump(cond_jump, after_body)
    }

    /// `'return' [expression] ';'`
    ///
    /// In a non-void function the expression is parsed and coerced to
    /// the return type; a void function parses no expression at all.
    fn analyze_return_statement(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        if !self.expect(TokenKind::Return) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        let return_type = self.func().return_type;
        if return_type != ValueType::Void {
            let kind = self.analyze_expression()?;
            self.convert(kind, return_type)?;
        }

        if !self.expect(TokenKind::Semicolon) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        let ret = match return_type {
            ValueType::Void => Opcode::Ret,
            ValueType::Double => Opcode::Dret,
            ValueType::Int | ValueType::Char => Opcode::Iret,
        };
        self.emit(ret, &[])
    }

    /// `condition ::= expression [rel-op expression]`
    ///
    /// Emits the comparison followed by the *complement* of the source
    /// operator, so the jump is taken exactly when the condition does
    /// not hold. A lone expression gets a bare `je 0` (jump-if-zero).
    /// Returns the byte offset of the conditional jump for patching.
    pub(crate) fn analyze_condition(&mut self) -> Result<u32, AnalyzeError> {
        let mut kind = self.analyze_expression()?;
        let lhs_end = self.offset();

        let mark = self.pos();
        let operator = match self.next_token() {
            Ok(token) if token.kind.is_relational_operator() => token.kind,
            _ => {
                self.reset_to(mark);
                // Lone condition: false is exactly zero. The jump
                // consumes one int slot, so narrow a double first.
                if kind == ValueType::Void {
                    return Err(AnalyzeError::IllegalExpression { span: self.here() });
                }
                if kind == ValueType::Double {
                    self.emit(Opcode::D2i, &[])?;
                }
                let jump_at = self.offset();
                self.emit(Opcode::Je, &[0])?;
                return Ok(jump_at);
            }
        };

        let rhs = match self.analyze_expression() {
            Ok(rhs) => rhs,
            Err(err) => {
                self.reset_to(mark);
                return Err(err);
            }
        };

        kind = {
            if kind == ValueType::Void || rhs == ValueType::Void {
                return Err(AnalyzeError::IllegalExpression { span: self.here() });
            }
            let unified = kind.promoted(rhs);
            if kind != unified {
                self.convert_at(lhs_end, kind, unified)?;
            } else if rhs != unified {
                self.convert(rhs, unified)?;
            }
            unified
        };

        let compare = if kind == ValueType::Double {
            Opcode::Dcmp
        } else {
            Opcode::Icmp
        };
        self.emit(compare, &[])?;

        // Only jump when the condition doesn't stand.
        let complement = match operator {
            TokenKind::Lt => Opcode::Jge,
            TokenKind::Le => Opcode::Jg,
            TokenKind::EqEq => Opcode::Jne,
            TokenKind::Ne => Opcode::Je,
            TokenKind::Ge => Opcode::Jl,
            _ => Opcode::Jle,
        };
        let jump_at = self.offset();
        self.emit(complement, &[0])?;
        Ok(jump_at)
    }
}
