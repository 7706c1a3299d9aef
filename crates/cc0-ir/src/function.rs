//! Per-function instruction streams and local slot allocation.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::IrError;
use crate::line::Line;
use crate::opcode::{Opcode, StackEffect};
use crate::symbol::ScopeId;
use crate::types::ValueType;

/// A function record: its instruction stream, parameters, and the
/// allocator for its local frame slots.
///
/// Byte offsets are maintained eagerly: the offset at which each line
/// begins is kept alongside the lines, so jump emitters can record patch
/// sites as byte offsets (the representation the VM's jump operands use)
/// and still find the line they refer to.
#[derive(Debug, Clone)]
pub struct Function {
    /// Declared return type.
    pub return_type: ValueType,

    /// The scope holding the function's parameters and body locals.
    /// `None` only for the global start function before analysis begins.
    pub scope: Option<ScopeId>,

    /// Parameter names in declaration order; their symbols live in the
    /// related scope.
    parameters: Vec<String>,

    /// Total frame slots occupied by the parameters.
    param_slots: u16,

    /// Emitted instructions.
    lines: Vec<Line>,

    /// Byte offset at which each line begins.
    offsets: Vec<u32>,

    /// Byte offset at which the next appended instruction will begin.
    offset: u32,

    /// Running operand stack depth, used to size `popn`.
    stack_depth: i32,

    /// Freed local slots, smallest first.
    empty_slots: BinaryHeap<Reverse<u16>>,

    /// First never-allocated local slot.
    next_slot: u16,
}

impl Function {
    /// Create an empty function record.
    pub fn new(return_type: ValueType) -> Self {
        Self {
            return_type,
            scope: None,
            parameters: Vec::new(),
            param_slots: 0,
            lines: Vec::new(),
            offsets: Vec::new(),
            offset: 0,
            stack_depth: 0,
            empty_slots: BinaryHeap::new(),
            next_slot: 0,
        }
    }

    /// Byte offset at which the next appended instruction will begin.
    #[inline]
    pub fn current_offset(&self) -> u32 {
        self.offset
    }

    /// The emitted instructions, in order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Mutable handle to the most recently appended line, used by jump
    /// emitters to backpatch a target.
    pub fn last_line_mut(&mut self) -> Option<&mut Line> {
        self.lines.last_mut()
    }

    /// Append an instruction, validating the operand count against the
    /// opcode table. An arity mismatch is a bug in the analyzer, not in
    /// the compiled program.
    pub fn append(&mut self, opcode: Opcode, operands: &[i64]) -> Result<(), IrError> {
        self.check_arity(opcode, operands)?;
        self.apply_stack_effect(opcode, operands);
        self.offsets.push(self.offset);
        self.offset += opcode.encoded_size();
        self.lines.push(Line::new(opcode, operands.to_vec()));
        Ok(())
    }

    /// Index of the line beginning exactly at `offset`.
    pub fn line_index_at(&self, offset: u32) -> Option<usize> {
        self.offsets.binary_search(&offset).ok()
    }

    /// Rewrite the line beginning at `offset`. Used to turn a
    /// placeholder into a type conversion after the operand types are
    /// known. Byte offsets of later lines are recomputed in case the
    /// replacement encodes to a different size.
    pub fn replace_at(
        &mut self,
        offset: u32,
        opcode: Opcode,
        operands: &[i64],
    ) -> Result<(), IrError> {
        self.check_arity(opcode, operands)?;
        let index = self.line_index_at(offset).ok_or_else(|| {
            IrError::AnalyzerBug(format!("no instruction begins at byte offset {}", offset))
        })?;
        self.lines[index] = Line::new(opcode, operands.to_vec());
        self.rebuild_offsets();
        Ok(())
    }

    /// Insert an instruction so that it begins at `offset`, shifting the
    /// lines that follow. Used to slip a widening conversion in after an
    /// already-emitted operand.
    pub fn insert_at(
        &mut self,
        offset: u32,
        opcode: Opcode,
        operands: &[i64],
    ) -> Result<(), IrError> {
        self.check_arity(opcode, operands)?;
        let index = if offset == self.offset {
            self.lines.len()
        } else {
            self.line_index_at(offset).ok_or_else(|| {
                IrError::AnalyzerBug(format!("no instruction begins at byte offset {}", offset))
            })?
        };
        self.apply_stack_effect(opcode, operands);
        self.lines.insert(index, Line::new(opcode, operands.to_vec()));
        self.rebuild_offsets();
        Ok(())
    }

    /// Patch the first operand of the line beginning at `offset`.
    pub fn patch_operand_at(&mut self, offset: u32, value: i64) -> Result<(), IrError> {
        let index = self.line_index_at(offset).ok_or_else(|| {
            IrError::AnalyzerBug(format!("no instruction begins at byte offset {}", offset))
        })?;
        self.lines[index].set_first_operand(value);
        Ok(())
    }

    /// Emit `popn` dropping every stack slot above `reserved`.
    pub fn pop_stack(&mut self, reserved: i32) -> Result<(), IrError> {
        let excess = i64::from(self.stack_depth - reserved);
        self.append(Opcode::Popn, &[excess])
    }

    /// Current operand stack depth estimate.
    pub fn stack_depth(&self) -> i32 {
        self.stack_depth
    }

    /// Reserve the next unused local slot: one slot for `int`/`char`,
    /// two consecutive slots for `double`. Freed slots are reused first.
    pub fn next_local_slot(&mut self, kind: ValueType) -> u16 {
        debug_assert!(kind != ValueType::Void, "void occupies no slot");
        if kind != ValueType::Double {
            return match self.empty_slots.pop() {
                Some(Reverse(slot)) => slot,
                None => {
                    let slot = self.next_slot;
                    self.next_slot += 1;
                    slot
                }
            };
        }

        // A double needs two consecutive slots; look for an adjacent
        // pair among the freed ones before growing the frame.
        let mut freed: Vec<u16> = self.empty_slots.drain().map(|Reverse(s)| s).collect();
        freed.sort_unstable();
        let pair = freed.windows(2).position(|w| w[0] + 1 == w[1]);
        match pair {
            Some(i) => {
                let slot = freed[i];
                freed.remove(i + 1);
                freed.remove(i);
                self.empty_slots = freed.into_iter().map(Reverse).collect();
                slot
            }
            None => {
                self.empty_slots = freed.into_iter().map(Reverse).collect();
                let slot = self.next_slot;
                self.next_slot += 2;
                slot
            }
        }
    }

    /// Return a slot (or slot pair) to the allocator.
    pub fn release_slot(&mut self, address: u16, kind: ValueType) {
        self.empty_slots.push(Reverse(address));
        if kind == ValueType::Double {
            self.empty_slots.push(Reverse(address + 1));
        }
    }

    /// Record a parameter. Slot allocation happens through the symbol
    /// table so that the parameter's address matches its symbol.
    pub fn add_parameter(&mut self, name: &str, kind: ValueType) {
        self.parameters.push(name.to_string());
        self.param_slots += kind.slot_size();
    }

    /// Parameter names in declaration order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Total frame slots occupied by the parameters.
    pub fn param_slots(&self) -> u16 {
        self.param_slots
    }

    fn check_arity(&self, opcode: Opcode, operands: &[i64]) -> Result<(), IrError> {
        if operands.len() != opcode.operand_count() {
            return Err(IrError::AnalyzerBug(format!(
                "{} takes {} operand(s) but was given {}",
                opcode,
                opcode.operand_count(),
                operands.len()
            )));
        }
        Ok(())
    }

    fn apply_stack_effect(&mut self, opcode: Opcode, operands: &[i64]) {
        match opcode.stack_effect() {
            StackEffect::Fixed(delta) => self.stack_depth += delta,
            StackEffect::Variable => match opcode {
                Opcode::Popn => self.stack_depth -= operands[0] as i32,
                Opcode::Snew => self.stack_depth += operands[0] as i32,
                // The depth of a loadc depends on the referenced
                // constant; the analyzer accounts for it separately.
                _ => {}
            },
        }
    }

    fn rebuild_offsets(&mut self) {
        self.offsets.clear();
        let mut offset = 0;
        for line in &self.lines {
            self.offsets.push(offset);
            offset += line.opcode.encoded_size();
        }
        self.offset = offset;
    }
}
