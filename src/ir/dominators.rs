//! Dominator assignment and reachability over the final block order.
//!
//! Dominators are computed in one forward pass over the ordered blocks. Because the order
//! is a reverse postorder and back edges are ignored, every forward predecessor of a block
//! already has its dominator when the block is visited, so the immediate dominator is the
//! nearest common ancestor of the predecessors in the partially built tree. A loop header
//! takes its single forward predecessor as dominator.
//!
//! While visiting a loop header, a cheap edge-counting scan over the loop's id range marks
//! the blocks that dominate every later block of the loop. The scan is a conservative
//! approximation: unmarked blocks may still dominate the rest of the loop.

use tracing::{debug, trace};

use crate::{
    ir::{BlockFlags, BlockId, BlockState, Graph},
    Error, Result,
};

impl Graph {
    /// Assigns immediate dominators, dominated-children lists and loop-successor-dominator
    /// marks to every reachable block.
    ///
    /// Running the pass again on an unmodified graph leaves every link unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] if the graph is not ordered, a loop header has
    /// no forward predecessor, or a dominator chain is broken.
    pub fn assign_dominators(&mut self) -> Result<()> {
        if !self.is_ordered() {
            return Err(invariant_error!("dominators assigned before block ordering"));
        }
        let order = self.ordered.clone();
        for &block in &order {
            if !self.blocks[block.index()].is_reachable() {
                continue;
            }
            let data = &self.blocks[block.index()];
            if data.is_loop_header() {
                let first = data.predecessors.first().copied().ok_or_else(|| {
                    invariant_error!("loop header {} has no predecessors", block)
                })?;
                self.assign_common_dominator(block, first)?;
                self.assign_loop_successor_dominators(block)?;
            } else {
                let predecessors = data.predecessors.clone();
                for pred in predecessors {
                    if self.blocks[pred.index()].is_reachable() {
                        self.assign_common_dominator(block, pred)?;
                    }
                }
            }
            self.blocks[block.index()].state = BlockState::Dominated;
        }
        debug!(blocks = order.len(), "assigned dominators");
        Ok(())
    }

    /// Narrows the dominator of `block` to cover the predecessor `other`.
    fn assign_common_dominator(&mut self, block: BlockId, other: BlockId) -> Result<()> {
        let Some(current) = self.blocks[block.index()].dominator else {
            self.blocks[block.index()].dominator = Some(other);
            self.insert_dominated(other, block);
            return Ok(());
        };
        if self.blocks[other.index()].dominator.is_none() {
            return Ok(());
        }

        let mut first = current;
        let mut second = other;
        while first != second {
            if self.dense_id(first) > self.dense_id(second) {
                first = self.blocks[first.index()].dominator.ok_or_else(|| {
                    invariant_error!("dominator chain of {} ends at {}", block, first)
                })?;
            } else {
                second = self.blocks[second.index()].dominator.ok_or_else(|| {
                    invariant_error!("dominator chain of {} ends at {}", other, second)
                })?;
            }
        }

        if current != first {
            if !self.blocks[current.index()].remove_dominated(block) {
                return Err(invariant_error!(
                    "{} missing from the dominated list of {}",
                    block,
                    current
                ));
            }
            self.blocks[block.index()].dominator = Some(first);
            self.insert_dominated(first, block);
        }
        Ok(())
    }

    /// Adds `block` to the dominated list of `dominator`, keeping it sorted by dense id.
    fn insert_dominated(&mut self, dominator: BlockId, block: BlockId) {
        let id = self.blocks[block.index()].id;
        let position = self.blocks[dominator.index()]
            .dominated_blocks
            .iter()
            .position(|child| self.blocks[child.index()].id > id);
        let children = &mut self.blocks[dominator.index()].dominated_blocks;
        match position {
            Some(index) => children.insert(index, block),
            None => children.push(block),
        }
    }

    /// Marks the blocks of the loop headed by `header` that dominate all later blocks of
    /// the loop.
    ///
    /// Counts edges that are still "open" while scanning the loop's id range: each block
    /// consumes its incoming forward edges and produces its successor edges that stay
    /// inside the range. A block reached with no other edge open dominates the remainder
    /// of the range.
    fn assign_loop_successor_dominators(&mut self, header: BlockId) -> Result<()> {
        let loop_id = self.blocks[header.index()]
            .loop_information
            .ok_or_else(|| invariant_error!("{} is not a loop header", header))?;
        let first_id = self.blocks[header.index()].id;
        // A loop whose back edges were all left out of the order spans its header only.
        let last_id = match self.last_back_edge(loop_id) {
            Some(last) if self.dense_id(last) < first_id => {
                return Err(Error::UnsupportedConstruct(format!(
                    "back edge {last} precedes its loop header {header}"
                )));
            }
            Some(last) => self.dense_id(last),
            None => first_id,
        };

        self.blocks[header.index()]
            .flags
            .insert(BlockFlags::LOOP_SUCCESSOR_DOMINATOR);

        let mut outstanding: isize = 1;
        for position in first_id..=last_id {
            let candidate = *self.ordered.get(position).ok_or_else(|| {
                invariant_error!("loop range of {} exceeds the block order", header)
            })?;
            let data = &self.blocks[candidate.index()];
            if !data.is_reachable() {
                continue;
            }

            for pred in &data.predecessors {
                let pred = &self.blocks[pred.index()];
                if pred.is_reachable() && pred.id < data.id {
                    outstanding -= 1;
                }
            }
            if outstanding < 0 {
                return Err(invariant_error!(
                    "negative edge balance at {} in loop {}",
                    candidate,
                    header
                ));
            }

            // Blocks of nested loops, and their headers, get their mark from the nested
            // loop's own scan, which runs when its header is visited.
            let marks = outstanding == 0
                && data.parent_loop_header == Some(header)
                && !data.is_loop_header();

            for successor in data.successors() {
                let successor = &self.blocks[successor.index()];
                if successor.is_reachable() && successor.id > data.id && successor.id <= last_id {
                    outstanding += 1;
                }
            }

            if marks {
                trace!(%header, block = %candidate, "loop successor dominator");
                self.blocks[candidate.index()]
                    .flags
                    .insert(BlockFlags::LOOP_SUCCESSOR_DOMINATOR);
            }
        }
        Ok(())
    }

    /// Excludes `block` from reachability.
    ///
    /// Takes effect at the next [`Graph::rerun_reachability`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBlock`] for a foreign handle, or an invariant violation for
    /// the entry block.
    pub fn mark_unreachable(&mut self, block: BlockId) -> Result<()> {
        if block == self.entry {
            return Err(invariant_error!("the entry block cannot be pruned"));
        }
        self.block_mut(block)?.flags.insert(BlockFlags::PRUNED);
        Ok(())
    }

    /// Recomputes the reachable flag of every ordered block.
    ///
    /// A block is reachable if it was not pruned and it is the entry or one of its forward
    /// predecessors is reachable. One pass suffices because forward predecessors precede
    /// their successors in the order.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the graph is not ordered.
    pub fn rerun_reachability(&mut self) -> Result<()> {
        if !self.is_ordered() {
            return Err(invariant_error!("reachability rerun before block ordering"));
        }
        let order = self.ordered.clone();
        let mut reachable_count = 0usize;
        for &block in &order {
            let data = &self.blocks[block.index()];
            let reachable = !data.is_pruned()
                && (block == self.entry
                    || data.predecessors.iter().any(|pred| {
                        let pred = &self.blocks[pred.index()];
                        pred.id < data.id && pred.is_reachable()
                    }));
            let flags = &mut self.blocks[block.index()].flags;
            flags.set(BlockFlags::REACHABLE, reachable);
            reachable_count += usize::from(reachable);
        }
        debug!(
            blocks = order.len(),
            reachable = reachable_count,
            "recomputed reachability"
        );
        Ok(())
    }

    /// Clears all dominator information and assigns it again over the reachable blocks.
    ///
    /// # Errors
    ///
    /// See [`Graph::assign_dominators`].
    pub fn rerun_dominators(&mut self) -> Result<()> {
        for block in &mut self.blocks {
            block.dominator = None;
            block.dominated_blocks.clear();
            block.flags.remove(BlockFlags::LOOP_SUCCESSOR_DOMINATOR);
            if block.state == BlockState::Dominated {
                block.state = BlockState::Ordered;
            }
        }
        self.assign_dominators()
    }
}
