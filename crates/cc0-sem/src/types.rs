//! The implicit conversion algebra.
//!
//! Conversions are permitted at assignment, return, argument passing,
//! and mixed-type binary operations. Mixed operands converge to the
//! larger type under the promotion order (`double` dominates `int`
//! dominates `char`); `char` widens to `int` without an instruction
//! because both occupy one int-valued slot.

use cc0_ir::{Opcode, ValueType};
use cc0_lex::TokenKind;

use crate::error::AnalyzeError;
use crate::Analyzer;

/// Instruction sequence converting a value of type `from` into `to`.
/// `Err(())` means the conversion does not exist (`void` is involved).
pub(crate) fn conversion(from: ValueType, to: ValueType) -> Result<&'static [Opcode], ()> {
    use ValueType::*;
    match (from, to) {
        (Void, _) | (_, Void) => Err(()),
        (a, b) if a == b => Ok(&[]),
        (Int, Double) | (Char, Double) => Ok(&[Opcode::I2d]),
        (Double, Int) => Ok(&[Opcode::D2i]),
        (Double, Char) => Ok(&[Opcode::D2i, Opcode::I2c]),
        (Int, Char) => Ok(&[Opcode::I2c]),
        (Char, Int) => Ok(&[]),
        _ => Err(()),
    }
}

/// The c0 type named by a type-specifier token.
pub(crate) fn type_of_specifier(kind: &TokenKind) -> Option<ValueType> {
    match kind {
        TokenKind::Void => Some(ValueType::Void),
        TokenKind::Char => Some(ValueType::Char),
        TokenKind::Int => Some(ValueType::Int),
        TokenKind::Double => Some(ValueType::Double),
        _ => None,
    }
}

impl Analyzer {
    /// Append the conversion from `from` to `to` at the current offset.
    pub(crate) fn convert(&mut self, from: ValueType, to: ValueType) -> Result<(), AnalyzeError> {
        let ops = conversion(from, to).map_err(|_| AnalyzeError::IllegalExpression {
            span: self.here(),
        })?;
        for &op in ops {
            self.emit(op, &[])?;
        }
        Ok(())
    }

    /// Insert the conversion from `from` to `to` so that it executes at
    /// byte offset `offset`, i.e. directly after an operand that was
    /// emitted before the type mismatch was discovered. Expression code
    /// contains no jumps, so shifting the instructions after `offset`
    /// cannot invalidate a recorded patch site.
    pub(crate) fn convert_at(
        &mut self,
        offset: u32,
        from: ValueType,
        to: ValueType,
    ) -> Result<(), AnalyzeError> {
        let ops = conversion(from, to).map_err(|_| AnalyzeError::IllegalExpression {
            span: self.here(),
        })?;
        let func = self.current_func();
        let mut at = offset;
        for &op in ops {
            let result = self.program().functions[func].insert_at(at, op, &[]);
            result.map_err(|e| self.lift(e))?;
            at += op.encoded_size();
        }
        Ok(())
    }
}
