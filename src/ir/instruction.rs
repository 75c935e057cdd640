//! Instructions and control-transfer terminators.
//!
//! The graph deliberately knows very little about instructions: an instruction is an
//! opaque [`Opcode`] plus its operand values. Typing, folding and lowering belong to the
//! language front end and the optimization passes. What the graph *does* care about is the
//! [`Terminator`] that closes every block, because the terminator defines the block's
//! successors.

use std::fmt;

use crate::ir::{BlockId, ValueId};

/// Opaque operation name of an instruction.
///
/// The graph never interprets opcodes; they exist so that printed graphs and tests can
/// tell instructions apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(&'static str);

impl Opcode {
    /// Creates an opcode from its mnemonic.
    #[must_use]
    pub const fn new(mnemonic: &'static str) -> Self {
        Self(mnemonic)
    }

    /// Returns the mnemonic.
    #[must_use]
    pub const fn mnemonic(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An instruction appended to an open block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Value defined by this instruction.
    result: ValueId,
    /// Operation performed.
    opcode: Opcode,
    /// Input values.
    operands: Vec<ValueId>,
}

impl Instruction {
    pub(crate) fn new(result: ValueId, opcode: Opcode, operands: Vec<ValueId>) -> Self {
        Self {
            result,
            opcode,
            operands,
        }
    }

    /// Returns the value defined by this instruction.
    #[must_use]
    pub const fn result(&self) -> ValueId {
        self.result
    }

    /// Returns the opcode.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the input values.
    #[must_use]
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.result, self.opcode)?;
        for (i, operand) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{operand}")?;
        }
        Ok(())
    }
}

/// The control transfer that closes a block.
///
/// A block has at most two successors, in the order returned by
/// [`Terminator::successors`]. That order is significant: it is the order in which the
/// block registers itself as predecessor of its successors, and therefore the order of
/// the corresponding phi inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional jump.
    Goto(BlockId),

    /// Two-way conditional branch.
    Branch {
        /// Value tested by the branch.
        condition: ValueId,
        /// Successor taken when the condition holds.
        if_true: BlockId,
        /// Successor taken otherwise.
        if_false: BlockId,
    },

    /// Leaves the compilation unit, optionally with a value.
    Return(Option<ValueId>),

    /// Abandons optimized execution at this point.
    Deoptimize,
}

impl Terminator {
    /// Returns the successor blocks named by this terminator.
    #[must_use]
    pub fn successors(&self) -> SuccessorIter {
        match *self {
            Terminator::Goto(target) => SuccessorIter::new([Some(target), None]),
            Terminator::Branch {
                if_true, if_false, ..
            } => SuccessorIter::new([Some(if_true), Some(if_false)]),
            Terminator::Return(_) | Terminator::Deoptimize => SuccessorIter::new([None, None]),
        }
    }

    /// Returns the successor at `index`, if any.
    #[must_use]
    pub fn successor_at(&self, index: usize) -> Option<BlockId> {
        self.successors().nth(index)
    }

    /// Returns the number of successors (0, 1 or 2).
    #[must_use]
    pub fn successor_count(&self) -> usize {
        self.successors().len()
    }

    /// Returns `true` if control leaves the compilation unit here.
    #[must_use]
    pub const fn is_exit(&self) -> bool {
        matches!(self, Terminator::Return(_) | Terminator::Deoptimize)
    }

    /// Returns the value used by this terminator, if any.
    #[must_use]
    pub fn operand(&self) -> Option<ValueId> {
        match *self {
            Terminator::Branch { condition, .. } => Some(condition),
            Terminator::Return(value) => value,
            Terminator::Goto(_) | Terminator::Deoptimize => None,
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Goto(target) => write!(f, "goto {target}"),
            Terminator::Branch {
                condition,
                if_true,
                if_false,
            } => write!(f, "branch {condition} ? {if_true} : {if_false}"),
            Terminator::Return(Some(value)) => write!(f, "return {value}"),
            Terminator::Return(None) => write!(f, "return"),
            Terminator::Deoptimize => write!(f, "deoptimize"),
        }
    }
}

/// Iterator over the successors of a [`Terminator`].
#[derive(Debug, Clone)]
pub struct SuccessorIter {
    slots: [Option<BlockId>; 2],
    next: usize,
}

impl SuccessorIter {
    fn new(slots: [Option<BlockId>; 2]) -> Self {
        Self { slots, next: 0 }
    }
}

impl Iterator for SuccessorIter {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let item = *self.slots.get(self.next)?;
        self.next += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slots[self.next.min(2)..]
            .iter()
            .filter(|slot| slot.is_some())
            .count();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SuccessorIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goto_successors() {
        let term = Terminator::Goto(BlockId::new(4));
        assert_eq!(term.successors().collect::<Vec<_>>(), vec![BlockId::new(4)]);
        assert_eq!(term.successor_count(), 1);
        assert!(!term.is_exit());
    }

    #[test]
    fn test_branch_successor_order() {
        let term = Terminator::Branch {
            condition: ValueId::new(0),
            if_true: BlockId::new(2),
            if_false: BlockId::new(1),
        };
        assert_eq!(
            term.successors().collect::<Vec<_>>(),
            vec![BlockId::new(2), BlockId::new(1)]
        );
        assert_eq!(term.successor_at(1), Some(BlockId::new(1)));
        assert_eq!(term.successor_at(2), None);
        assert_eq!(term.operand(), Some(ValueId::new(0)));
    }

    #[test]
    fn test_exit_terminators() {
        assert_eq!(Terminator::Return(None).successor_count(), 0);
        assert_eq!(Terminator::Deoptimize.successor_count(), 0);
        assert!(Terminator::Deoptimize.is_exit());
        assert_eq!(
            Terminator::Return(Some(ValueId::new(3))).operand(),
            Some(ValueId::new(3))
        );
    }

    #[test]
    fn test_successor_iter_size_hint() {
        let term = Terminator::Branch {
            condition: ValueId::new(0),
            if_true: BlockId::new(2),
            if_false: BlockId::new(1),
        };
        let mut it = term.successors();
        assert_eq!(it.len(), 2);
        it.next();
        assert_eq!(it.len(), 1);
        it.next();
        assert_eq!(it.len(), 0);
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Terminator::Goto(BlockId::new(1))), "goto b1");
        assert_eq!(format!("{}", Terminator::Return(None)), "return");
        let instr = Instruction::new(
            ValueId::new(5),
            Opcode::new("add"),
            vec![ValueId::new(1), ValueId::new(2)],
        );
        assert_eq!(format!("{instr}"), "v5 = add v1, v2");
    }
}
