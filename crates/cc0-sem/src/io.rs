//! `print` and `scan` statement analysis.

use cc0_ir::{Opcode, ValueType};
use cc0_lex::TokenKind;

use crate::error::AnalyzeError;
use crate::Analyzer;

/// The character printed between the items of a `print` list.
const SEPARATOR: i64 = ' ' as i64;

impl Analyzer {
    /// `scan '(' identifier ')' ';'  |  print '(' [printable-list] ')' ';'`
    pub(crate) fn analyze_io_statement(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        let token = self.next_token().map_err(|_| AnalyzeError::InvalidStatement {
            span: self.here(),
        })?;

        match token.kind {
            TokenKind::Scan => self.analyze_scan(mark)?,
            TokenKind::Print => self.analyze_print(mark)?,
            _ => {
                self.reset_to(mark);
                return Err(AnalyzeError::InvalidStatement { span: self.here() });
            }
        }

        if !self.expect(TokenKind::Semicolon) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        Ok(())
    }

    /// The target must be a non-constant variable; its kind selects the
    /// scan and store instructions.
    fn analyze_scan(&mut self, mark: usize) -> Result<(), AnalyzeError> {
        if !self.expect(TokenKind::LParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }
        let token = self.next_token().map_err(|_| AnalyzeError::InvalidStatement {
            span: self.here(),
        })?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            _ => {
                self.reset_to(mark);
                return Err(AnalyzeError::InvalidStatement { span: token.span });
            }
        };
        let name_span = token.span;
        if !self.expect(TokenKind::RParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        let scope = self.current_scope();
        let Some((symbol, level)) = self.resolve(scope, &name) else {
            return Err(AnalyzeError::UndefinedIdentifier {
                span: name_span,
                name,
            });
        };
        if symbol.is_callable || symbol.kind == ValueType::Void {
            return Err(AnalyzeError::IllegalExpression { span: name_span });
        }
        if symbol.is_constant {
            return Err(AnalyzeError::AssignmentToConstant {
                span: name_span,
                name,
            });
        }

        self.emit(Opcode::Loada, &[i64::from(level), symbol.address])?;
        match symbol.kind {
            ValueType::Int => {
                self.emit(Opcode::Iscan, &[])?;
                self.emit(Opcode::Istore, &[])?;
            }
            ValueType::Char => {
                self.emit(Opcode::Cscan, &[])?;
                self.emit(Opcode::Istore, &[])?;
            }
            _ => {
                self.emit(Opcode::Dscan, &[])?;
                self.emit(Opcode::Dstore, &[])?;
            }
        }
        Ok(())
    }

    /// Items are separated by a single space and followed by a newline;
    /// `print()` with no arguments emits only the newline.
    fn analyze_print(&mut self, mark: usize) -> Result<(), AnalyzeError> {
        if !self.expect(TokenKind::LParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidStatement { span: self.here() });
        }

        let empty = matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen));
        if empty {
            self.next_token()?;
        } else {
            self.analyze_printable_list()?;
            if !self.expect(TokenKind::RParen) {
                self.reset_to(mark);
                return Err(AnalyzeError::InvalidStatement { span: self.here() });
            }
        }

        self.emit(Opcode::Printl, &[])
    }

    /// `printable-list ::= printable {',' printable}`
    fn analyze_printable_list(&mut self) -> Result<(), AnalyzeError> {
        self.analyze_printable()?;
        loop {
            let mark = self.pos();
            match self.next_token() {
                Ok(token) if token.kind == TokenKind::Comma => {}
                _ => {
                    self.reset_to(mark);
                    return Ok(());
                }
            }
            self.emit(Opcode::Bipush, &[SEPARATOR])?;
            self.emit(Opcode::Cprint, &[])?;
            self.analyze_printable()?;
        }
    }

    /// `printable ::= expression | string-literal | char-literal`
    fn analyze_printable(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        match self.analyze_expression() {
            Ok(kind) => {
                let print = match kind {
                    ValueType::Double => Opcode::Dprint,
                    ValueType::Char => Opcode::Cprint,
                    ValueType::Int => Opcode::Iprint,
                    ValueType::Void => {
                        return Err(AnalyzeError::InvalidStatement { span: self.here() })
                    }
                };
                return self.emit(print, &[]);
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => self.reset_to(mark),
        }

        let token = self.next_token().map_err(|_| AnalyzeError::IncompleteExpression {
            span: self.here(),
        })?;
        match token.kind {
            TokenKind::StringLiteral(value) => {
                let sentinel = self.program().add_string_literal(&value);
                self.emit(Opcode::Loadc, &[sentinel])?;
                self.emit(Opcode::Sprint, &[])
            }
            TokenKind::CharLiteral(c) => {
                self.emit(Opcode::Bipush, &[i64::from(u32::from(c))])?;
                self.emit(Opcode::Cprint, &[])
            }
            _ => Err(AnalyzeError::IncompleteExpression { span: token.span }),
        }
    }
}
