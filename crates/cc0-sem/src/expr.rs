//! Expression analysis and code emission.
//!
//! Grammar, outermost first:
//!
//! ```text
//! expression  ::= multi-expr { add-op multi-expr }
//! multi-expr  ::= cast-expr { mul-op cast-expr }
//! cast-expr   ::= { '(' type-specifier ')' } unary-expr
//! unary-expr  ::= [unary-op] primary
//! primary     ::= '(' expression ')' | identifier | integer-literal
//!               | double-literal | char-literal | function-call
//! ```
//!
//! Every production returns the type of the value it left on the stack.
//! When a binary operation discovers that its already-emitted left
//! operand needs widening, the conversion is inserted at the byte offset
//! recorded right after that operand's code.

use cc0_ir::{Opcode, ValueType};
use cc0_lex::TokenKind;

use crate::error::AnalyzeError;
use crate::types::type_of_specifier;
use crate::Analyzer;

impl Analyzer {
    /// `expression ::= multi-expr { add-op multi-expr }`
    pub(crate) fn analyze_expression(&mut self) -> Result<ValueType, AnalyzeError> {
        let mut kind = self.analyze_multiplicative_expression()?;

        loop {
            let mark = self.pos();
            let lhs_end = self.offset();
            let operator = match self.next_token() {
                Ok(token) if token.kind.is_additive_operator() => token.kind,
                _ => {
                    self.reset_to(mark);
                    return Ok(kind);
                }
            };

            let rhs = match self.analyze_multiplicative_expression() {
                Ok(rhs) => rhs,
                Err(err) => {
                    self.reset_to(mark);
                    return Err(err);
                }
            };

            kind = self.unify_operands(kind, rhs, lhs_end)?;
            let opcode = match (operator, kind) {
                (TokenKind::Plus, ValueType::Double) => Opcode::Dadd,
                (TokenKind::Plus, _) => Opcode::Iadd,
                (_, ValueType::Double) => Opcode::Dsub,
                (_, _) => Opcode::Isub,
            };
            self.emit(opcode, &[])?;
        }
    }

    /// `multi-expr ::= cast-expr { mul-op cast-expr }`
    fn analyze_multiplicative_expression(&mut self) -> Result<ValueType, AnalyzeError> {
        let mut kind = self.analyze_cast_expression()?;

        loop {
            let mark = self.pos();
            let lhs_end = self.offset();
            let operator = match self.next_token() {
                Ok(token) if token.kind.is_multiplicative_operator() => token.kind,
                _ => {
                    self.reset_to(mark);
                    return Ok(kind);
                }
            };

            let rhs = match self.analyze_cast_expression() {
                Ok(rhs) => rhs,
                Err(err) => {
                    self.reset_to(mark);
                    return Err(err);
                }
            };

            kind = self.unify_operands(kind, rhs, lhs_end)?;
            let opcode = match (operator, kind) {
                (TokenKind::Star, ValueType::Double) => Opcode::Dmul,
                (TokenKind::Star, _) => Opcode::Imul,
                (_, ValueType::Double) => Opcode::Ddiv,
                (_, _) => Opcode::Idiv,
            };
            self.emit(opcode, &[])?;
        }
    }

    /// `cast-expr ::= { '(' type-specifier ')' } unary-expr`
    ///
    /// Casts apply innermost (rightmost) first: `(int)(double)x` first
    /// widens and then truncates.
    fn analyze_cast_expression(&mut self) -> Result<ValueType, AnalyzeError> {
        let mut casts = Vec::new();

        loop {
            let mark = self.pos();
            let opened = matches!(
                self.next_token(),
                Ok(token) if token.kind == TokenKind::LParen
            );
            if !opened {
                self.reset_to(mark);
                break;
            }
            let target = match self.next_token() {
                Ok(token) => type_of_specifier(&token.kind),
                Err(_) => None,
            };
            let closed = matches!(
                self.next_token(),
                Ok(token) if token.kind == TokenKind::RParen
            );
            match target {
                Some(target) if closed => casts.push((target, self.here())),
                _ => {
                    self.reset_to(mark);
                    break;
                }
            }
        }

        let mut kind = self.analyze_unary_expression()?;
        for &(target, span) in casts.iter().rev() {
            if target == ValueType::Void {
                return Err(AnalyzeError::IllegalExpression { span });
            }
            self.convert(kind, target)?;
            kind = target;
        }
        Ok(kind)
    }

    /// `unary-expr ::= [unary-op] primary`
    fn analyze_unary_expression(&mut self) -> Result<ValueType, AnalyzeError> {
        let mark = self.pos();
        let token = self.next_token().map_err(|_| AnalyzeError::IncompleteExpression {
            span: self.here(),
        })?;

        let negate = match token.kind {
            TokenKind::Minus => true,
            TokenKind::Plus => false,
            _ => {
                self.reset_to(mark);
                false
            }
        };

        let kind = match self.analyze_primary_expression() {
            Ok(kind) => kind,
            Err(err) => {
                self.reset_to(mark);
                return Err(err);
            }
        };

        if negate {
            let opcode = if kind == ValueType::Double {
                Opcode::Dneg
            } else {
                Opcode::Ineg
            };
            self.emit(opcode, &[])?;
        }
        Ok(kind)
    }

    /// `primary ::= '(' expression ')' | identifier | integer-literal
    ///            | double-literal | char-literal | function-call`
    fn analyze_primary_expression(&mut self) -> Result<ValueType, AnalyzeError> {
        let mark = self.pos();
        let token = self.next_token().map_err(|_| AnalyzeError::IncompleteExpression {
            span: self.here(),
        })?;

        match token.kind {
            TokenKind::LParen => {
                let kind = self.analyze_expression()?;
                let closing = self.next_token().map_err(|_| {
                    AnalyzeError::IncompleteExpression { span: self.here() }
                })?;
                if closing.kind != TokenKind::RParen {
                    return Err(AnalyzeError::IllegalExpression { span: closing.span });
                }
                Ok(kind)
            }
            TokenKind::Identifier(name) => {
                let Some((symbol, level)) = self.resolve(self.current_scope(), &name) else {
                    return Err(AnalyzeError::UndefinedIdentifier {
                        span: token.span,
                        name,
                    });
                };
                if symbol.is_callable {
                    // The call production needs the identifier again.
                    self.reset_to(mark);
                    self.analyze_function_call()
                } else {
                    self.emit(Opcode::Loada, &[i64::from(level), symbol.address])?;
                    let load = if symbol.kind == ValueType::Double {
                        Opcode::Dload
                    } else {
                        Opcode::Iload
                    };
                    self.emit(load, &[])?;
                    Ok(symbol.kind)
                }
            }
            TokenKind::IntegerLiteral(value) => {
                self.emit(Opcode::Ipush, &[value])?;
                Ok(ValueType::Int)
            }
            TokenKind::DoubleLiteral(value) => {
                let sentinel = self.program().add_double_literal(value);
                self.emit(Opcode::Loadc, &[sentinel])?;
                Ok(ValueType::Double)
            }
            TokenKind::CharLiteral(c) => {
                self.emit(Opcode::Bipush, &[i64::from(u32::from(c))])?;
                Ok(ValueType::Char)
            }
            _ => Err(AnalyzeError::IllegalExpression { span: token.span }),
        }
    }

    /// `function-call ::= identifier '(' [expression-list] ')'`
    ///
    /// Arguments are pushed left to right, each coerced to its
    /// parameter's type; the call's operand is the callee's function
    /// index.
    pub(crate) fn analyze_function_call(&mut self) -> Result<ValueType, AnalyzeError> {
        let mark = self.pos();
        let token = self.next_token().map_err(|_| AnalyzeError::IncompleteFunctionCall {
            span: self.here(),
        })?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            _ => {
                self.reset_to(mark);
                return Err(AnalyzeError::IncompleteFunctionCall { span: token.span });
            }
        };
        let name_span = token.span;

        // Callables live in the global scope only.
        let global = self.prog().global_scope;
        let Some(symbol) = self.prog().lookup(global, &name).cloned() else {
            self.reset_to(mark);
            return Err(AnalyzeError::UndefinedIdentifier {
                span: name_span,
                name,
            });
        };
        if !symbol.is_callable {
            self.reset_to(mark);
            return Err(AnalyzeError::IllegalExpression { span: name_span });
        }
        let param_kinds = self.parameter_kinds(&symbol);

        if !self.expect(TokenKind::LParen) {
            self.reset_to(mark);
            return Err(AnalyzeError::IncompleteFunctionCall { span: self.here() });
        }

        let mut found = 0;
        let empty = matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen));
        if empty {
            self.next_token()?;
        } else {
            loop {
                let kind = self.analyze_expression()?;
                if let Some(&target) = param_kinds.get(found) {
                    self.convert(kind, target)?;
                }
                found += 1;

                let token = self.next_token().map_err(|_| {
                    AnalyzeError::IncompleteFunctionCall { span: self.here() }
                })?;
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RParen => break,
                    _ => {
                        return Err(AnalyzeError::IncompleteFunctionCall { span: token.span })
                    }
                }
            }
        }

        if found != param_kinds.len() {
            return Err(AnalyzeError::ArgumentCountMismatch {
                span: name_span,
                name,
                expected: param_kinds.len(),
                found,
            });
        }

        self.emit(Opcode::Call, &[symbol.address])?;
        Ok(symbol.kind)
    }

    /// `assignment ::= identifier '=' expression`
    ///
    /// Leaves nothing on the stack: the target address is pushed first
    /// and a typed store consumes both.
    pub(crate) fn analyze_assignment_expression(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        let token = self.next_token().map_err(|_| AnalyzeError::IncompleteExpression {
            span: self.here(),
        })?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            _ => {
                self.reset_to(mark);
                return Err(AnalyzeError::IncompleteExpression { span: token.span });
            }
        };
        let name_span = token.span;

        if !self.expect(TokenKind::Assign) {
            self.reset_to(mark);
            return Err(AnalyzeError::IncompleteExpression { span: self.here() });
        }

        let scope = self.current_scope();
        let Some((symbol, level)) = self.resolve(scope, &name) else {
            return Err(AnalyzeError::UndefinedIdentifier {
                span: name_span,
                name,
            });
        };
        if symbol.is_callable {
            return Err(AnalyzeError::IllegalExpression { span: name_span });
        }
        if symbol.is_constant {
            return Err(AnalyzeError::AssignmentToConstant {
                span: name_span,
                name,
            });
        }

        self.emit(Opcode::Loada, &[i64::from(level), symbol.address])?;
        let kind = self.analyze_expression()?;
        self.convert(kind, symbol.kind)?;
        let store = if symbol.kind == ValueType::Double {
            Opcode::Dstore
        } else {
            Opcode::Istore
        };
        self.emit(store, &[])
    }

    /// Converge two binary operands to the larger type, inserting the
    /// left operand's widening (if any) at `lhs_end`.
    fn unify_operands(
        &mut self,
        lhs: ValueType,
        rhs: ValueType,
        lhs_end: u32,
    ) -> Result<ValueType, AnalyzeError> {
        if lhs == ValueType::Void || rhs == ValueType::Void {
            return Err(AnalyzeError::IllegalExpression { span: self.here() });
        }
        let unified = lhs.promoted(rhs);
        if lhs != unified {
            self.convert_at(lhs_end, lhs, unified)?;
        } else if rhs != unified {
            self.convert(rhs, unified)?;
        }
        Ok(unified)
    }

    /// Consume the next token if it matches `expected`.
    pub(crate) fn expect(&mut self, expected: TokenKind) -> bool {
        let mark = self.pos();
        match self.next_token() {
            Ok(token) if token.kind == expected => true,
            _ => {
                self.reset_to(mark);
                false
            }
        }
    }

    fn parameter_kinds(&self, symbol: &cc0_ir::Symbol) -> Vec<ValueType> {
        let Some(func) = symbol.func else {
            return Vec::new();
        };
        let record = &self.prog().functions[func];
        let Some(scope) = record.scope else {
            return Vec::new();
        };
        record
            .parameters()
            .iter()
            .filter_map(|name| self.prog().lookup(scope, name).map(|sym| sym.kind))
            .collect()
    }
}
