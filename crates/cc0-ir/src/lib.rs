//! cc0-ir - The compiler's instruction and symbol model.
//!
//! Everything the analyzer builds and the assemblers consume lives here:
//!
//! - the [`Opcode`] table with per-opcode operand widths, encoded byte
//!   sizes, and stack deltas;
//! - [`Line`], one emitted instruction with its operands;
//! - [`Function`], the per-function instruction stream with byte-offset
//!   tracking, backpatching, and the local slot allocator;
//! - [`ConstantPool`], the global deduplicated literal table;
//! - [`Program`], the arena of scopes and function records tied together
//!   by [`ScopeId`] and [`FuncId`] indices.
//!
//! Scopes, symbols, and function records reference each other cyclically
//! in the source language model; the arenas turn those cycles into plain
//! indices so the assemblers can walk everything long after analysis has
//! finished.

mod constant;
mod error;
mod function;
mod line;
mod opcode;
mod symbol;
mod types;

pub use constant::{Constant, ConstantPool};
pub use error::IrError;
pub use function::Function;
pub use line::Line;
pub use opcode::{Opcode, StackEffect};
pub use symbol::{FuncId, Program, Scope, ScopeId, Symbol};
pub use types::ValueType;
