//! Top-level items: variable declarations and function definitions.
//!
//! Global variable declarations emit their initialization code into the
//! global start pseudo-function; function definitions push a fresh
//! (function, scope) frame for the duration of their body and append a
//! trailing return sequence so every function terminates.

use cc0_ir::{Function, Opcode, ValueType};
use cc0_lex::TokenKind;

use crate::error::AnalyzeError;
use crate::types::type_of_specifier;
use crate::Analyzer;

impl Analyzer {
    /// `{variable-decl}`
    ///
    /// A declaration is recognized by a four-token lookahead:
    /// `[const] type identifier` followed by one of `=` `,` `;`.
    /// Anything else (notably `type identifier '('`) ends the block.
    pub(crate) fn analyze_variable_declarations(&mut self) -> Result<(), AnalyzeError> {
        loop {
            let mark = self.pos();
            if !self.declaration_follows() {
                self.reset_to(mark);
                return Ok(());
            }
            self.reset_to(mark);
            self.analyze_variable_declaration()?;
        }
    }

    fn declaration_follows(&mut self) -> bool {
        let Ok(mut token) = self.next_token() else {
            return false;
        };
        if token.kind == TokenKind::Const {
            token = match self.next_token() {
                Ok(token) => token,
                Err(_) => return false,
            };
        }
        if !token.kind.is_type_specifier() {
            return false;
        }
        if !matches!(self.next_token().map(|t| t.kind), Ok(TokenKind::Identifier(_))) {
            return false;
        }
        matches!(
            self.next_token().map(|t| t.kind),
            Ok(TokenKind::Assign | TokenKind::Comma | TokenKind::Semicolon)
        )
    }

    /// `variable-decl ::= ['const'] type-specifier init-decl-list ';'`
    pub(crate) fn analyze_variable_declaration(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        let mut token = self.next_token().map_err(|_| {
            AnalyzeError::IncompleteVariableDecl { span: self.here() }
        })?;

        let is_constant = token.kind == TokenKind::Const;
        if is_constant {
            token = self.next_token().map_err(|_| {
                AnalyzeError::IncompleteVariableDecl { span: self.here() }
            })?;
        }

        let Some(decl_type) = type_of_specifier(&token.kind) else {
            self.reset_to(mark);
            return Err(AnalyzeError::IncompleteVariableDecl { span: self.here() });
        };
        if decl_type == ValueType::Void {
            return Err(AnalyzeError::InvalidDeclaration { span: token.span });
        }

        self.analyze_declarator_list(is_constant, decl_type)?;

        if !self.expect(TokenKind::Semicolon) {
            self.reset_to(mark);
            return Err(AnalyzeError::IncompleteVariableDecl { span: self.here() });
        }
        Ok(())
    }

    /// `init-decl-list ::= init-decl {',' init-decl}`
    fn analyze_declarator_list(
        &mut self,
        is_constant: bool,
        decl_type: ValueType,
    ) -> Result<(), AnalyzeError> {
        self.analyze_init_declarator(is_constant, decl_type)?;
        loop {
            let mark = self.pos();
            match self.next_token() {
                Ok(token) if token.kind == TokenKind::Comma => {}
                _ => {
                    self.reset_to(mark);
                    return Ok(());
                }
            }
            self.analyze_init_declarator(is_constant, decl_type)?;
        }
    }

    /// `init-decl ::= identifier ['=' expression]`
    ///
    /// An initialized declarator reserves its slot first (`snew 2` for a
    /// double, a zero push otherwise), then stores the initializer
    /// through the slot's address. An uninitialized one only reserves;
    /// an uninitialized constant is rejected since it could never
    /// receive a value.
    fn analyze_init_declarator(
        &mut self,
        is_constant: bool,
        decl_type: ValueType,
    ) -> Result<(), AnalyzeError> {
        let token = self.next_token().map_err(|_| {
            AnalyzeError::IncompleteVariableDecl { span: self.here() }
        })?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            _ => return Err(AnalyzeError::InvalidDeclaration { span: token.span }),
        };

        let scope = self.current_scope();
        let added = if is_constant {
            self.program().add_constant(scope, &name, decl_type)
        } else {
            self.program().add_variable(scope, &name, decl_type)
        };
        let address = added.map_err(|e| self.lift(e))?;

        // ['=' expression]
        let mark = self.pos();
        let initialized = match self.next_token() {
            Ok(token) if token.kind == TokenKind::Assign => true,
            _ => {
                self.reset_to(mark);
                false
            }
        };

        if !initialized {
            if is_constant {
                return Err(AnalyzeError::IncompleteExpression { span: self.here() });
            }
            let slots = i64::from(decl_type.slot_size());
            return self.emit(Opcode::Snew, &[slots]);
        }

        if decl_type == ValueType::Double {
            self.emit(Opcode::Snew, &[2])?;
        } else {
            self.emit(Opcode::Ipush, &[0])?;
        }
        self.emit(Opcode::Loada, &[0, address])?;

        let kind = self.analyze_expression()?;
        if kind != decl_type {
            self.convert(kind, decl_type)?;
        }

        let store = if decl_type == ValueType::Double {
            Opcode::Dstore
        } else {
            Opcode::Istore
        };
        self.emit(store, &[])
    }

    /// `{function-def}`
    pub(crate) fn analyze_function_definitions(&mut self) -> Result<(), AnalyzeError> {
        loop {
            let mark = self.pos();
            let starts_like_one = matches!(
                self.next_token(),
                Ok(token) if token.kind.is_type_specifier()
            );
            self.reset_to(mark);
            if !starts_like_one {
                return Ok(());
            }
            self.analyze_function_definition()?;
        }
    }

    /// `function-def ::= type-specifier identifier '(' [param-list] ')' compound`
    ///
    /// The function's symbol enters the global scope before the body is
    /// analyzed, which is what makes recursion resolve.
    fn analyze_function_definition(&mut self) -> Result<(), AnalyzeError> {
        let mark = self.pos();
        let token = self.next_token().map_err(|_| {
            AnalyzeError::InvalidDeclaration { span: self.here() }
        })?;
        let Some(return_type) = type_of_specifier(&token.kind) else {
            self.reset_to(mark);
            return Err(AnalyzeError::InvalidDeclaration { span: token.span });
        };

        let global = self.prog().global_scope;
        let func = self.program().functions.push(Function::new(return_type));
        let body_scope = self.program().append_child_scope(global, func);

        self.push_frame(func, body_scope);
        let result = self.analyze_function_inner(return_type);
        self.pop_frame();
        result
    }

    fn analyze_function_inner(&mut self, return_type: ValueType) -> Result<(), AnalyzeError> {
        let func = self.current_func();

        let token = self.next_token().map_err(|_| {
            AnalyzeError::InvalidDeclaration { span: self.here() }
        })?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            _ => return Err(AnalyzeError::InvalidDeclaration { span: token.span }),
        };

        let registered = self.program().add_function(&name, return_type, func);
        registered.map_err(|e| self.lift(e))?;

        self.analyze_parameter_clause()?;
        self.analyze_compound_statement()?;

        // Guarantee termination whatever the body did.
        match return_type {
            ValueType::Void => self.emit(Opcode::Ret, &[])?,
            ValueType::Int | ValueType::Char => {
                self.emit(Opcode::Ipush, &[0])?;
                self.emit(Opcode::Iret, &[])?;
            }
            ValueType::Double => {
                self.emit(Opcode::Snew, &[2])?;
                self.emit(Opcode::Dret, &[])?;
            }
        }
        Ok(())
    }

    /// `'(' [param-list] ')'`
    fn analyze_parameter_clause(&mut self) -> Result<(), AnalyzeError> {
        if !self.expect(TokenKind::LParen) {
            return Err(AnalyzeError::InvalidDeclaration { span: self.here() });
        }
        if self.expect(TokenKind::RParen) {
            return Ok(());
        }
        self.analyze_parameter_list()?;
        if !self.expect(TokenKind::RParen) {
            return Err(AnalyzeError::IncompleteExpression { span: self.here() });
        }
        Ok(())
    }

    /// `param-list ::= param {',' param}`
    fn analyze_parameter_list(&mut self) -> Result<(), AnalyzeError> {
        self.analyze_parameter()?;
        loop {
            let mark = self.pos();
            match self.next_token() {
                Ok(token) if token.kind == TokenKind::Comma => {}
                _ => {
                    self.reset_to(mark);
                    return Ok(());
                }
            }
            self.analyze_parameter()?;
        }
    }

    /// `param ::= ['const'] type-specifier identifier`
    ///
    /// Parameters enter the body scope in left-to-right order, so their
    /// slot addresses match the call-time stack layout. A `const`
    /// parameter becomes a constant symbol and rejects assignment.
    fn analyze_parameter(&mut self) -> Result<(), AnalyzeError> {
        let mut token = self.next_token().map_err(|_| {
            AnalyzeError::InvalidDeclaration { span: self.here() }
        })?;

        let is_constant = token.kind == TokenKind::Const;
        if is_constant {
            token = self.next_token().map_err(|_| {
                AnalyzeError::InvalidDeclaration { span: self.here() }
            })?;
        }

        let kind = match type_of_specifier(&token.kind) {
            Some(kind) if kind != ValueType::Void => kind,
            _ => return Err(AnalyzeError::InvalidDeclaration { span: token.span }),
        };

        let token = self.next_token().map_err(|_| {
            AnalyzeError::InvalidDeclaration { span: self.here() }
        })?;
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            _ => return Err(AnalyzeError::InvalidDeclaration { span: token.span }),
        };

        let scope = self.current_scope();
        let added = if is_constant {
            self.program().add_constant(scope, &name, kind)
        } else {
            self.program().add_variable(scope, &name, kind)
        };
        added.map_err(|e| self.lift(e))?;

        self.func_mut().add_parameter(&name, kind);
        Ok(())
    }
}
