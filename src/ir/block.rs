//! Basic blocks.
//!
//! A [`BasicBlock`] is a straight-line instruction sequence closed by exactly one
//! [`Terminator`]. Blocks are owned by their [`Graph`](crate::ir::Graph) and are only
//! mutated through it; this module holds the block data and its read-only view.
//!
//! # Lifecycle
//!
//! ```text
//!   create_block            finish / finish_exit      order_blocks       assign_dominators
//! ──────────────▶ Open ──────────────────────────▶ Finished ─────────▶ Ordered ──────────▶ Dominated
//! ```
//!
//! - **Open**: instructions can be appended; predecessors can be registered.
//! - **Finished**: the terminator is set and the block has registered itself with its
//!   successors. Only loop headers still accept predecessors (their back edges).
//! - **Ordered**: the block received its final dense id from the postorder scheduler.
//! - **Dominated**: the dominator and dominated-children links are valid.
//!
//! Blocks are never deallocated individually. Blocks the scheduler cannot reach stay in
//! the arena in whatever state they were left and are excluded from the ordered list.

use std::fmt;

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::ir::{BlockId, Environment, Instruction, LoopId, PhiId, Terminator};

/// Lifecycle state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum BlockState {
    /// Under construction.
    Open,
    /// Terminated, not yet placed in the final order.
    Finished,
    /// Placed in the final order.
    Ordered,
    /// Dominator links assigned.
    Dominated,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    /// Per-block analysis marks.
    pub struct BlockFlags: u8 {
        /// Reachable from the entry block.
        const REACHABLE = 0x01;
        /// Explicitly excluded by a pruning pass.
        const PRUNED = 0x02;
        /// Dominates every later block of its innermost loop.
        const LOOP_SUCCESSOR_DOMINATOR = 0x04;
    }
}

/// Dense id of a block the scheduler never placed.
pub(crate) const UNPLACED: usize = usize::MAX;

/// A basic block of the graph.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Stable arena handle.
    pub(crate) handle: BlockId,
    /// Dense id: creation number until ordering, order position afterwards
    /// (`UNPLACED` for blocks left out of the order).
    pub(crate) id: usize,
    pub(crate) state: BlockState,
    pub(crate) flags: BlockFlags,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) phis: Vec<PhiId>,
    pub(crate) terminator: Option<Terminator>,
    /// Predecessors in registration order; phi inputs follow this order.
    pub(crate) predecessors: Vec<BlockId>,
    /// Working environment while the block is under construction.
    pub(crate) environment: Option<Environment>,
    pub(crate) loop_information: Option<LoopId>,
    /// Innermost enclosing loop header, if any.
    pub(crate) parent_loop_header: Option<BlockId>,
    pub(crate) dominator: Option<BlockId>,
    /// Blocks immediately dominated by this one, sorted by dense id.
    pub(crate) dominated_blocks: Vec<BlockId>,
}

impl BasicBlock {
    pub(crate) fn new(handle: BlockId, id: usize) -> Self {
        Self {
            handle,
            id,
            state: BlockState::Open,
            flags: BlockFlags::REACHABLE,
            instructions: Vec::new(),
            phis: Vec::new(),
            terminator: None,
            predecessors: Vec::new(),
            environment: None,
            loop_information: None,
            parent_loop_header: None,
            dominator: None,
            dominated_blocks: Vec::new(),
        }
    }

    /// Returns the stable handle of this block.
    #[must_use]
    pub const fn handle(&self) -> BlockId {
        self.handle
    }

    /// Returns the dense id of this block.
    ///
    /// Before [`Graph::order_blocks`](crate::ir::Graph::order_blocks) this is the creation
    /// number; afterwards it is the block's position in
    /// [`Graph::ordered_blocks`](crate::ir::Graph::ordered_blocks) (0 = entry). Blocks
    /// the ordering never reached report `usize::MAX`.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Returns `false` for a block that ordering left out because it is unreachable.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        self.id != UNPLACED
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BlockState {
        self.state
    }

    /// Returns the analysis flags.
    #[must_use]
    pub const fn flags(&self) -> BlockFlags {
        self.flags
    }

    /// Returns `true` while instructions can still be appended.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == BlockState::Open
    }

    /// Returns `true` once the block has a terminator.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state >= BlockState::Finished
    }

    /// Returns `true` once the block has been placed in the final order.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.state >= BlockState::Ordered
    }

    /// Returns the instructions in execution order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the phis owned by this block.
    #[must_use]
    pub fn phis(&self) -> &[PhiId] {
        &self.phis
    }

    /// Returns the terminator, or `None` while the block is open.
    #[must_use]
    pub const fn terminator(&self) -> Option<&Terminator> {
        self.terminator.as_ref()
    }

    /// Returns the successors named by the terminator.
    pub fn successors(&self) -> impl Iterator<Item = BlockId> {
        self.terminator
            .as_ref()
            .map(Terminator::successors)
            .into_iter()
            .flatten()
    }

    /// Returns the predecessors in registration order.
    #[must_use]
    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    /// Returns the working environment, if the block still has one.
    ///
    /// Blocks closed with [`Graph::finish_exit`](crate::ir::Graph::finish_exit) have
    /// discarded theirs.
    #[must_use]
    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Returns `true` if the block owns a loop-information record.
    #[must_use]
    pub const fn is_loop_header(&self) -> bool {
        self.loop_information.is_some()
    }

    /// Returns the loop-information record of a loop header.
    #[must_use]
    pub const fn loop_information(&self) -> Option<LoopId> {
        self.loop_information
    }

    /// Returns the innermost enclosing loop header.
    #[must_use]
    pub const fn parent_loop_header(&self) -> Option<BlockId> {
        self.parent_loop_header
    }

    /// Returns the immediate dominator. `None` for the entry block and before dominator
    /// assignment.
    #[must_use]
    pub const fn dominator(&self) -> Option<BlockId> {
        self.dominator
    }

    /// Returns the blocks immediately dominated by this one, sorted by id.
    #[must_use]
    pub fn dominated_blocks(&self) -> &[BlockId] {
        &self.dominated_blocks
    }

    /// Returns `true` if the block is reachable from the entry block.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.flags.contains(BlockFlags::REACHABLE)
    }

    /// Returns `true` if a pruning pass excluded this block.
    #[must_use]
    pub fn is_pruned(&self) -> bool {
        self.flags.contains(BlockFlags::PRUNED)
    }

    /// Returns `true` if this block dominates every later block of its innermost loop.
    ///
    /// This is a conservative approximation computed during dominator assignment: a
    /// `false` answer does not imply the block fails to dominate those blocks.
    #[must_use]
    pub fn is_loop_successor_dominator(&self) -> bool {
        self.flags.contains(BlockFlags::LOOP_SUCCESSOR_DOMINATOR)
    }

    pub(crate) fn remove_dominated(&mut self, block: BlockId) -> bool {
        match self.dominated_blocks.iter().position(|&b| b == block) {
            Some(index) => {
                self.dominated_blocks.remove(index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_placed() {
            write!(f, "B{} ({})", self.id, self.handle)?;
        } else {
            write!(f, "B- ({})", self.handle)?;
        }
        if self.is_loop_header() {
            write!(f, " [loop header]")?;
        }
        if !self.is_reachable() {
            write!(f, " [unreachable]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_block_creation() {
        let block = BasicBlock::new(BlockId::new(4), 4);
        assert_eq!(block.handle(), BlockId::new(4));
        assert_eq!(block.id(), 4);
        assert!(block.is_open());
        assert!(!block.is_finished());
        assert!(block.is_reachable());
        assert!(!block.is_loop_header());
        assert_eq!(block.successors().count(), 0);
        assert!(block.environment().is_none());
        assert!(block.is_placed());
    }

    #[test]
    fn test_unplaced_block_display() {
        let mut block = BasicBlock::new(BlockId::new(3), 3);
        block.id = UNPLACED;
        block.flags.remove(BlockFlags::REACHABLE);
        assert!(!block.is_placed());
        assert_eq!(block.to_string(), "B- (b3) [unreachable]");
    }

    #[test]
    fn test_state_ordering() {
        let states: Vec<BlockState> = BlockState::iter().collect();
        assert_eq!(
            states,
            vec![
                BlockState::Open,
                BlockState::Finished,
                BlockState::Ordered,
                BlockState::Dominated
            ]
        );

        let mut block = BasicBlock::new(BlockId::new(0), 0);
        block.state = BlockState::Dominated;
        assert!(block.is_finished());
        assert!(block.is_ordered());
        assert_eq!(block.state().to_string(), "Dominated");
    }

    #[test]
    fn test_remove_dominated() {
        let mut block = BasicBlock::new(BlockId::new(0), 0);
        block.dominated_blocks = vec![BlockId::new(2), BlockId::new(1), BlockId::new(4)];

        assert!(block.remove_dominated(BlockId::new(1)));
        assert!(!block.remove_dominated(BlockId::new(1)));
        assert_eq!(block.dominated_blocks(), &[BlockId::new(2), BlockId::new(4)]);
    }

    #[test]
    fn test_flags() {
        let mut block = BasicBlock::new(BlockId::new(0), 0);
        block.flags.insert(BlockFlags::LOOP_SUCCESSOR_DOMINATOR);
        assert!(block.is_loop_successor_dominator());
        block.flags.remove(BlockFlags::REACHABLE);
        block.flags.insert(BlockFlags::PRUNED);
        assert!(!block.is_reachable());
        assert!(block.is_pruned());
        assert_eq!(block.to_string(), "B0 (b0) [unreachable]");
    }
}
