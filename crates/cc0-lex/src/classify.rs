//! Token classifier.
//!
//! The lexical divider produces raw digit- or letter-initial lexemes
//! without deciding what they are; [`classify`] applies the language's
//! classification rules in order:
//!
//! 1. digit-initial with a `.` or a scientific exponent → double literal
//!    (out of range is fatal);
//! 2. `0x`/`0X` prefix → hexadecimal integer (out of range is a warning
//!    and the value becomes 0);
//! 3. digit-initial otherwise → decimal integer, where a leading zero is
//!    only legal for the lexeme `0` itself;
//! 4. letter-initial → keyword if it matches the reserved-word table,
//!    identifier otherwise.
//!
//! Quoted literals and operators never reach the classifier; the divider
//! resolves those on its own.

use cc0_util::{Handler, Span};

use crate::error::LexError;
use crate::token::TokenKind;

/// Largest value an integer literal may denote. The VM's integers are
/// 32-bit; negative values are formed with the unary minus operator.
const INT_LITERAL_MAX: u64 = i32::MAX as u64;

/// Classify a raw word lexeme into its token kind.
///
/// Integer literals that parse but exceed the representable range are
/// clamped to 0 with a warning recorded in `handler`; doubles out of
/// range are a fatal error.
pub fn classify(lexeme: &str, span: Span, handler: &Handler) -> Result<TokenKind, LexError> {
    let first = lexeme.chars().next().unwrap_or('\0');
    if first.is_ascii_digit() {
        classify_number(lexeme, span, handler)
    } else {
        Ok(keyword(lexeme).unwrap_or_else(|| TokenKind::Identifier(lexeme.to_string())))
    }
}

/// Look up a reserved word.
pub fn keyword(lexeme: &str) -> Option<TokenKind> {
    match lexeme {
        "const" => Some(TokenKind::Const),
        "void" => Some(TokenKind::Void),
        "int" => Some(TokenKind::Int),
        "char" => Some(TokenKind::Char),
        "double" => Some(TokenKind::Double),
        "struct" => Some(TokenKind::Struct),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "switch" => Some(TokenKind::Switch),
        "case" => Some(TokenKind::Case),
        "default" => Some(TokenKind::Default),
        "while" => Some(TokenKind::While),
        "for" => Some(TokenKind::For),
        "do" => Some(TokenKind::Do),
        "return" => Some(TokenKind::Return),
        "break" => Some(TokenKind::Break),
        "continue" => Some(TokenKind::Continue),
        "print" => Some(TokenKind::Print),
        "scan" => Some(TokenKind::Scan),
        _ => None,
    }
}

fn classify_number(lexeme: &str, span: Span, handler: &Handler) -> Result<TokenKind, LexError> {
    let has_hex_prefix = lexeme.starts_with("0x") || lexeme.starts_with("0X");

    if !has_hex_prefix && (lexeme.contains('.') || lexeme.contains('e') || lexeme.contains('E')) {
        return classify_double(lexeme, span);
    }

    if has_hex_prefix {
        return classify_hex(lexeme, span, handler);
    }

    classify_decimal(lexeme, span, handler)
}

fn classify_double(lexeme: &str, span: Span) -> Result<TokenKind, LexError> {
    match lexeme.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(TokenKind::DoubleLiteral(value)),
        _ => Err(LexError::IllegalDoubleLiteral {
            span,
            lexeme: lexeme.to_string(),
        }),
    }
}

fn classify_hex(lexeme: &str, span: Span, handler: &Handler) -> Result<TokenKind, LexError> {
    let digits = &lexeme[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LexError::IllegalIntegerLiteral {
            span,
            lexeme: lexeme.to_string(),
        });
    }

    match u64::from_str_radix(digits, 16) {
        Ok(value) if value <= INT_LITERAL_MAX => Ok(TokenKind::IntegerLiteral(value as i64)),
        _ => {
            handler.warning(
                format!("integer literal '{}' out of range, using 0", lexeme),
                span,
            );
            Ok(TokenKind::IntegerLiteral(0))
        }
    }
}

fn classify_decimal(lexeme: &str, span: Span, handler: &Handler) -> Result<TokenKind, LexError> {
    if !lexeme.chars().all(|c| c.is_ascii_digit()) {
        return Err(LexError::IllegalIntegerLiteral {
            span,
            lexeme: lexeme.to_string(),
        });
    }

    // A leading zero is only legal for the literal `0` itself.
    if lexeme.len() > 1 && lexeme.starts_with('0') {
        return Err(LexError::IllegalIntegerLiteral {
            span,
            lexeme: lexeme.to_string(),
        });
    }

    match lexeme.parse::<u64>() {
        Ok(value) if value <= INT_LITERAL_MAX => Ok(TokenKind::IntegerLiteral(value as i64)),
        _ => {
            handler.warning(
                format!("integer literal '{}' out of range, using 0", lexeme),
                span,
            );
            Ok(TokenKind::IntegerLiteral(0))
        }
    }
}
