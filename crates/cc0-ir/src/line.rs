//! One emitted instruction.

use std::fmt;

use crate::opcode::Opcode;

/// An instruction line: an opcode and its operand values.
///
/// Operands are stored as `i64` so that the constant pool's negative
/// sentinel addresses survive until the text assembler translates them
/// into real pool indices.
#[derive(Clone, Debug, PartialEq)]
pub struct Line {
    /// The instruction.
    pub opcode: Opcode,
    /// Operand values, one per entry in the opcode's width table.
    pub operands: Vec<i64>,
}

impl Line {
    /// Create a new line. The caller is responsible for the operand
    /// count; [`Function::append`](crate::Function::append) validates it.
    pub fn new(opcode: Opcode, operands: Vec<i64>) -> Self {
        Self { opcode, operands }
    }

    /// Overwrite the first operand. Used to backpatch jump targets.
    ///
    /// # Panics
    ///
    /// Panics if the line has no operands; patching an operand that does
    /// not exist is an analyzer bug.
    pub fn set_first_operand(&mut self, value: i64) {
        assert!(
            !self.operands.is_empty(),
            "tried to patch an operand that does not exist on {}",
            self.opcode
        );
        self.operands[0] = value;
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.mnemonic())?;
        for operand in &self.operands {
            write!(f, " {}", operand)?;
        }
        Ok(())
    }
}
