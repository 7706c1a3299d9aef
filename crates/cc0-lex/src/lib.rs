//! cc0-lex - Lexical analysis for the c0 language.
//!
//! This crate turns c0 source text into a random-access [`TokenStream`].
//! The work is split into three pieces:
//!
//! - the *lexical divider* ([`Lexer`]) walks the source character by
//!   character, strips `//` and `/* */` comments (the block-comment state
//!   survives line breaks), and cuts the text into raw lexemes: quoted
//!   literals, digit/letter runs, and operators;
//! - the *token classifier* ([`classify`]) decides what a digit- or
//!   letter-initial run actually is: double literal, hex or decimal
//!   integer, keyword, or identifier;
//! - the [`TokenStream`] buffers every classified token and supports
//!   position save/reset, which is what the analyzer's backtracking is
//!   built on.

pub mod classify;
pub mod cursor;
mod edge_cases;
mod error;
mod lexer;
mod stream;
mod token;

pub use classify::classify;
pub use cursor::Cursor;
pub use error::LexError;
pub use lexer::Lexer;
pub use stream::TokenStream;
pub use token::{Token, TokenKind};

use cc0_util::Handler;

/// Tokenize an entire source file into a [`TokenStream`].
///
/// Warnings (e.g. integer literals clamped to zero) are recorded in the
/// handler; the first fatal lexical problem aborts with an error.
pub fn tokenize(source: &str, handler: &Handler) -> Result<TokenStream, LexError> {
    let mut lexer = Lexer::new(source, handler);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(TokenStream::new(tokens))
}
