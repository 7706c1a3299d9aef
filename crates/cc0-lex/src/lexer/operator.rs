//! Operator and punctuator lexing.

use crate::error::LexError;
use crate::token::TokenKind;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a one- or two-character operator. Comments were already
    /// stripped, so a `/` here is always division; a `*/` here is the
    /// stray close of a block comment that was never opened.
    pub(crate) fn lex_operator(&mut self) -> Result<TokenKind, LexError> {
        let c = self.cursor.current_char();
        self.cursor.advance();

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => {
                if self.cursor.current_char() == '/' {
                    self.cursor.advance();
                    return Err(LexError::UnrecognizedToken {
                        span: self.token_span,
                        lexeme: "*/".to_string(),
                    });
                }
                TokenKind::Star
            }
            '/' => TokenKind::Slash,
            '<' => {
                if self.cursor.match_char('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                if self.cursor.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ne
                } else {
                    return Err(LexError::UnrecognizedToken {
                        span: self.token_span,
                        lexeme: "!".to_string(),
                    });
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            other => {
                return Err(LexError::UnrecognizedToken {
                    span: self.token_span,
                    lexeme: other.to_string(),
                })
            }
        };
        Ok(kind)
    }
}
