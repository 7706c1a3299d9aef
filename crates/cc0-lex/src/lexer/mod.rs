//! The lexical divider.
//!
//! [`Lexer`] walks the source with a [`Cursor`], discards whitespace and
//! comments, and produces one classified [`Token`] per call. Raw lexemes
//! come in three shapes: quoted literals (resolved here), digit- or
//! letter-initial runs (handed to [`classify`]), and operators.
//!
//! Block comments are a lexer-wide state: `/*` sets a flag that persists
//! across any number of lines until `*/`, and everything in between is
//! discarded. A `*/` outside a block comment is an error.

mod literal;
mod operator;

use cc0_util::{Handler, Span};

use crate::classify::classify;
use crate::cursor::Cursor;
use crate::error::LexError;
use crate::token::{Token, TokenKind};

/// Lexer for c0 source text.
pub struct Lexer<'a> {
    /// Character cursor over the source.
    pub(crate) cursor: Cursor<'a>,

    /// Sink for warnings (clamped literals, unterminated comments).
    pub(crate) handler: &'a Handler,

    /// Whether the cursor is currently inside a `/* */` comment.
    in_block_comment: bool,

    /// Position of the first character of the token being lexed.
    pub(crate) token_span: Span,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            in_block_comment: false,
            token_span: Span::new(1, 1),
        }
    }

    /// Returns the next token, or `None` at the end of the source.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia();

        self.token_span = Span::new(self.cursor.line(), self.cursor.column());

        if self.cursor.is_at_end() {
            if self.in_block_comment {
                self.handler
                    .warning("unterminated block comment", self.token_span);
                self.in_block_comment = false;
            }
            return Ok(None);
        }

        let kind = match self.cursor.current_char() {
            '\'' => self.lex_char_literal()?,
            '"' => self.lex_string_literal()?,
            c if c.is_ascii_digit() || c.is_ascii_alphabetic() => self.lex_word()?,
            _ => self.lex_operator()?,
        };

        Ok(Some(Token::new(kind, self.token_span)))
    }

    /// Scans a digit- or letter-initial run and classifies it.
    fn lex_word(&mut self) -> Result<TokenKind, LexError> {
        let start = self.cursor.position();
        let digit_initial = self.cursor.current_char().is_ascii_digit();

        loop {
            let c = self.cursor.current_char();
            if c.is_ascii_alphanumeric() || c == '_' || (digit_initial && c == '.') {
                self.cursor.advance();
                continue;
            }
            // A sign directly after a scientific `e`/`E` belongs to the
            // exponent, not to the surrounding expression.
            if digit_initial && (c == '+' || c == '-') {
                let lexeme = self.cursor.slice_from(start);
                let hex = lexeme.starts_with("0x") || lexeme.starts_with("0X");
                if !hex
                    && (lexeme.ends_with('e') || lexeme.ends_with('E'))
                    && self.cursor.peek_char(1).is_ascii_digit()
                {
                    self.cursor.advance();
                    continue;
                }
            }
            break;
        }

        let lexeme = self.cursor.slice_from(start);
        classify(lexeme, self.token_span, self.handler)
    }

    /// Skips whitespace, `//` comments, and `/* */` comments.
    fn skip_trivia(&mut self) {
        loop {
            if self.in_block_comment {
                while !self.cursor.is_at_end() {
                    if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == '/' {
                        self.cursor.advance_n(2);
                        self.in_block_comment = false;
                        break;
                    }
                    self.cursor.advance();
                }
                if self.in_block_comment {
                    // End of input; next_token reports the dangling state.
                    return;
                }
                continue;
            }

            let c = self.cursor.current_char();
            if !self.cursor.is_at_end() && c.is_whitespace() {
                self.cursor.advance();
                continue;
            }
            if c == '/' && self.cursor.peek_char(1) == '/' {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
                continue;
            }
            if c == '/' && self.cursor.peek_char(1) == '*' {
                self.cursor.advance_n(2);
                self.in_block_comment = true;
                continue;
            }
            return;
        }
    }
}
