//! Character and string literal lexing.
//!
//! Both literal forms are built from "char sequences": a single plain
//! character, `\` followed by one of `n r t ' " \`, or `\x` followed by
//! two hex digits. A character literal holds exactly one sequence; a
//! string holds zero or more. Neither may span a line break.

use crate::error::LexError;
use crate::token::TokenKind;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a character literal. The cursor is on the opening `'`.
    pub(crate) fn lex_char_literal(&mut self) -> Result<TokenKind, LexError> {
        let error = LexError::IllegalCharLiteral {
            span: self.token_span,
        };

        self.cursor.advance();

        let c = self.cursor.current_char();
        if self.cursor.is_at_end() || c == '\'' || c == '\n' {
            return Err(error);
        }

        let decoded = self.char_sequence().ok_or_else(|| error.clone())?;

        if !self.cursor.match_char('\'') {
            return Err(error);
        }
        Ok(TokenKind::CharLiteral(decoded))
    }

    /// Lexes a string literal. The cursor is on the opening `"`.
    pub(crate) fn lex_string_literal(&mut self) -> Result<TokenKind, LexError> {
        let error = LexError::IllegalStringLiteral {
            span: self.token_span,
        };

        self.cursor.advance();

        let mut content = String::new();
        loop {
            let c = self.cursor.current_char();
            if self.cursor.is_at_end() || c == '\n' {
                return Err(error);
            }
            if c == '"' {
                self.cursor.advance();
                return Ok(TokenKind::StringLiteral(content));
            }
            match self.char_sequence() {
                Some(decoded) => content.push(decoded),
                None => return Err(error),
            }
        }
    }

    /// Decodes one char sequence, or `None` when it is malformed.
    fn char_sequence(&mut self) -> Option<char> {
        let c = self.cursor.current_char();

        if c != '\\' {
            self.cursor.advance();
            return Some(c);
        }

        self.cursor.advance();
        let escape = self.cursor.current_char();
        self.cursor.advance();

        match escape {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '\'' => Some('\''),
            '"' => Some('"'),
            '\\' => Some('\\'),
            'x' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    let digit = self.cursor.current_char().to_digit(16)?;
                    value = value * 16 + digit;
                    self.cursor.advance();
                }
                char::from_u32(value)
            }
            _ => None,
        }
    }
}
