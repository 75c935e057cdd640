//! Structural verification of a finalized graph.
//!
//! [`Graph::verify`] re-checks, from scratch, everything the construction and analysis
//! passes promise about an ordered graph with assigned dominators. It is meant for tests
//! and debug builds; [`Graph::finalize`] runs it when
//! [`GraphConfig::verify`](crate::GraphConfig::verify) is set.
//!
//! # Checks
//!
//! | Check | Property |
//! |-------|----------|
//! | Order | `ordered[0]` is the entry, dense ids equal positions |
//! | Symmetry | successor and predecessor lists describe the same edges |
//! | Edge split | no edge leaves a multi-successor block into a multi-predecessor block |
//! | Phi alignment | every phi has one input per predecessor, equal to the value the predecessor carries |
//! | Loop headers | exactly one forward predecessor, the rest are back edges |
//! | Reverse postorder | every forward edge goes from a lower to a higher id |
//! | Loop contiguity | the id range of a loop holds its members and nested loops, nothing else |
//! | Dominance | every dominator chain reaches the entry; children lists match |
//! | Reference | immediate dominators equal an independent computation |

use tracing::debug;

use crate::{
    ir::{cfg::BlockCfg, BasicBlock, BlockId, Graph},
    utils::graph::{algorithms::compute_dominators, RootedGraph},
    Result,
};

impl Graph {
    /// Checks every structural property of an ordered graph with assigned dominators.
    ///
    /// Only reachable blocks and the edges between them are considered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`](crate::Error::InvariantViolation) describing
    /// the first property found broken.
    pub fn verify(&self) -> Result<()> {
        self.verify_order()?;
        for &handle in &self.ordered {
            let block = self.block_ref(handle)?;
            if !block.is_reachable() {
                continue;
            }
            self.verify_edges(block)?;
            self.verify_phis(block)?;
            self.verify_loop_header(block)?;
            self.verify_dominator(block)?;
        }
        self.verify_reference_dominators()?;
        debug!(blocks = self.ordered.len(), "verified graph");
        Ok(())
    }

    fn reachable(&self, block: BlockId) -> bool {
        self.block(block).is_some_and(BasicBlock::is_reachable)
    }

    /// Returns `true` if `from -> to` is a registered back edge.
    fn is_back_edge(&self, from: BlockId, to: BlockId) -> bool {
        self.block(to)
            .and_then(BasicBlock::loop_information)
            .and_then(|id| self.loop_information(id))
            .is_some_and(|info| info.back_edges().contains(&from))
    }

    fn verify_order(&self) -> Result<()> {
        if self.ordered.first() != Some(&self.entry) {
            return Err(invariant_error!("block order does not start at the entry"));
        }
        for (position, &handle) in self.ordered.iter().enumerate() {
            let block = self.block_ref(handle)?;
            if block.id != position {
                return Err(invariant_error!(
                    "{} has id {} at position {}",
                    handle,
                    block.id,
                    position
                ));
            }
            if !block.is_ordered() || block.terminator.is_none() {
                return Err(invariant_error!("{} is ordered but not finished", handle));
            }
        }
        Ok(())
    }

    fn verify_edges(&self, block: &BasicBlock) -> Result<()> {
        let handle = block.handle;
        for successor in block.successors() {
            let target = self.block_ref(successor)?;
            let count = target.predecessors.iter().filter(|&&p| p == handle).count();
            if count != 1 {
                return Err(invariant_error!(
                    "{} lists {} {} times as predecessor",
                    successor,
                    handle,
                    count
                ));
            }
            if !target.is_reachable() {
                continue;
            }
            if !self.is_back_edge(handle, successor) && block.id >= target.id {
                return Err(invariant_error!(
                    "forward edge {} -> {} goes from id {} to id {}",
                    handle,
                    successor,
                    block.id,
                    target.id
                ));
            }
        }

        let live_predecessors = block
            .predecessors
            .iter()
            .filter(|&&p| self.reachable(p))
            .count();
        for &pred in &block.predecessors {
            let source = self.block_ref(pred)?;
            if !source.successors().any(|s| s == handle) {
                return Err(invariant_error!(
                    "{} is a predecessor of {} without an edge",
                    pred,
                    handle
                ));
            }
            let live_successors = source.successors().filter(|&s| self.reachable(s)).count();
            if source.is_reachable() && live_predecessors > 1 && live_successors > 1 {
                return Err(invariant_error!(
                    "critical edge {} -> {} is not split",
                    pred,
                    handle
                ));
            }
        }
        Ok(())
    }

    fn verify_phis(&self, block: &BasicBlock) -> Result<()> {
        for &phi in &block.phis {
            let data = self
                .phi(phi)
                .ok_or_else(|| invariant_error!("{} owns unknown phi {}", block.handle, phi))?;
            if data.block() != block.handle {
                return Err(invariant_error!(
                    "{} lists phi {} owned by {}",
                    block.handle,
                    phi,
                    data.block()
                ));
            }
            if data.input_count() != block.predecessors.len() {
                return Err(invariant_error!(
                    "phi {} has {} inputs, {} has {} predecessors",
                    phi,
                    data.input_count(),
                    block.handle,
                    block.predecessors.len()
                ));
            }
            let Some(slot) = data.merged_index() else {
                continue;
            };
            for (edge, (&pred, &input)) in block.predecessors.iter().zip(data.inputs()).enumerate()
            {
                // Exit blocks have dropped their environment.
                let Some(environment) = self.block(pred).and_then(BasicBlock::environment) else {
                    continue;
                };
                let live = environment.values().get(slot).copied();
                if live != Some(input) {
                    return Err(invariant_error!(
                        "phi {} input {} is {} but {} carries {:?} on that edge",
                        phi,
                        edge,
                        input,
                        pred,
                        live
                    ));
                }
            }
        }
        Ok(())
    }

    fn verify_loop_header(&self, block: &BasicBlock) -> Result<()> {
        let Some(loop_id) = block.loop_information else {
            return Ok(());
        };
        let header = block.handle;
        let info = self.loop_ref(loop_id)?;

        if block.predecessors.get(1..) != Some(info.back_edges()) {
            return Err(invariant_error!(
                "loop header {} predecessors {:?} do not match back edges {:?}",
                header,
                block.predecessors,
                info.back_edges()
            ));
        }

        let end = self
            .last_back_edge(loop_id)
            .map_or(block.id, |last| self.dense_id(last));
        let range = block.id..=end;

        for &member in info.members() {
            if self.reachable(member) && !range.contains(&self.dense_id(member)) {
                return Err(invariant_error!(
                    "member {} of loop {} lies outside its range",
                    member,
                    header
                ));
            }
        }
        for position in range {
            let inside = self.ordered[position];
            if self.reachable(inside) && !self.nested_in(inside, header) {
                return Err(invariant_error!(
                    "{} lies inside the range of loop {} but is not a member",
                    inside,
                    header
                ));
            }
        }
        Ok(())
    }

    /// Returns `true` if `block` is `header` or belongs to its loop, directly or through
    /// nested loops.
    fn nested_in(&self, block: BlockId, header: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(candidate) = current {
            if candidate == header {
                return true;
            }
            current = self.block(candidate).and_then(BasicBlock::parent_loop_header);
        }
        false
    }

    fn verify_dominator(&self, block: &BasicBlock) -> Result<()> {
        let handle = block.handle;
        if handle == self.entry {
            if block.dominator.is_some() {
                return Err(invariant_error!("the entry block has a dominator"));
            }
        } else {
            let mut current = block
                .dominator
                .ok_or_else(|| invariant_error!("reachable block {} has no dominator", handle))?;
            let mut steps = 0;
            while current != self.entry {
                if current == handle || steps > self.ordered.len() {
                    return Err(invariant_error!("{} lies on its own dominator chain", handle));
                }
                let data = self.block_ref(current)?;
                if !data.is_reachable() {
                    return Err(invariant_error!(
                        "{} is dominated by unreachable {}",
                        handle,
                        current
                    ));
                }
                current = data
                    .dominator
                    .ok_or_else(|| invariant_error!("dominator chain of {} is broken", handle))?;
                steps += 1;
            }
        }

        let mut previous = None;
        for &child in &block.dominated_blocks {
            let data = self.block_ref(child)?;
            if data.dominator != Some(handle) {
                return Err(invariant_error!(
                    "{} lists {} as dominated but it is not",
                    handle,
                    child
                ));
            }
            if previous.is_some_and(|id| id >= data.id) {
                return Err(invariant_error!(
                    "dominated blocks of {} are not sorted",
                    handle
                ));
            }
            previous = Some(data.id);
        }
        if let Some(dominator) = block.dominator {
            if !self.block_ref(dominator)?.dominated_blocks.contains(&handle) {
                return Err(invariant_error!(
                    "{} is missing from the children of its dominator {}",
                    handle,
                    dominator
                ));
            }
        }
        Ok(())
    }

    fn verify_reference_dominators(&self) -> Result<()> {
        let cfg = BlockCfg::new(self);
        let tree = compute_dominators(&cfg, cfg.entry());

        for &handle in &self.ordered {
            let block = self.block_ref(handle)?;
            if !block.is_reachable() {
                continue;
            }
            let expected = tree
                .immediate_dominator(cfg.node_of(handle))
                .and_then(|node| cfg.block_of(node));
            if block.dominator != expected {
                return Err(invariant_error!(
                    "{} has dominator {:?}, expected {:?}",
                    handle,
                    block.dominator,
                    expected
                ));
            }
        }
        Ok(())
    }
}
