//! Loop-contiguous block ordering.
//!
//! [`Graph::order_blocks`] computes a reverse postorder in which every loop occupies one
//! contiguous range of ids, starting at its header and ending at its last back edge. The
//! classic formulation is a set of mutually recursive visits; here it is an explicit
//! state machine over a vector of frames, so arbitrarily deep or wide graphs cannot
//! exhaust the native stack.
//!
//! # Frames
//!
//! Frames form a stack inside a `Vec`: the parent of frame `i` is `i - 1` and its child is
//! `i + 1`. Popped frames are not freed; the next push reuses them.
//!
//! | Kind | Iterates | Successors visited with loop context |
//! |------|----------|--------------------------------------|
//! | `Successors` | block successors | inherited |
//! | `SuccessorsOfLoopHeader` | header successors | the header itself |
//! | `LoopMembers` | loop members | n/a |
//! | `SuccessorsOfLoopMember` | member successors | inherited |
//!
//! A block is only entered if it is not ordered yet and its `parent_loop_header` equals
//! the loop context of the visit. Entering a loop header first flattens the loop: its
//! members' successors (the loop exits) are visited before the body, which places the
//! exits after the whole loop in the final order.

use tracing::debug;

use crate::{
    ir::{
        block::UNPLACED, BlockFlags, BlockId, BlockState, Graph, LoopId, SuccessorIter,
        Terminator,
    },
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    None,
    Successors,
    SuccessorsOfLoopHeader,
    LoopMembers,
    SuccessorsOfLoopMember,
}

#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    block: Option<BlockId>,
    /// Loop whose members are being iterated, or the loop a member belongs to.
    loop_id: Option<LoopId>,
    /// Loop context handed to successor visits.
    loop_header: Option<BlockId>,
    successors: SuccessorIter,
    member_index: usize,
    member_count: usize,
}

impl Frame {
    fn none() -> Self {
        Self {
            kind: FrameKind::None,
            block: None,
            loop_id: None,
            loop_header: None,
            successors: Terminator::Deoptimize.successors(),
            member_index: 0,
            member_count: 0,
        }
    }
}

struct PostorderProcessor<'g> {
    graph: &'g mut Graph,
    frames: Vec<Frame>,
    postorder: Vec<BlockId>,
    emitted: Vec<bool>,
}

impl<'g> PostorderProcessor<'g> {
    fn new(graph: &'g mut Graph) -> Self {
        let emitted = vec![false; graph.blocks.len()];
        Self {
            graph,
            frames: vec![Frame::none()],
            postorder: Vec::new(),
            emitted,
        }
    }

    fn run(mut self, entry: BlockId) -> Result<Vec<BlockId>> {
        let mut current = Some(self.setup_successors(0, entry, None)?);
        while let Some(frame) = current {
            current = self.perform_step(frame)?;
        }
        Ok(self.postorder)
    }

    /// Returns the child slot of `frame`, growing the pool if needed.
    fn push(&mut self, frame: usize) -> usize {
        let child = frame + 1;
        if self.frames.len() == child {
            self.frames.push(Frame::none());
        }
        child
    }

    fn parent(frame: usize) -> Option<usize> {
        frame.checked_sub(1)
    }

    fn successors_of(&self, block: BlockId) -> Result<SuccessorIter> {
        Ok(self
            .graph
            .block_ref(block)?
            .terminator
            .as_ref()
            .map_or_else(|| Terminator::Deoptimize.successors(), Terminator::successors))
    }

    fn setup_successors(
        &mut self,
        frame: usize,
        block: BlockId,
        loop_header: Option<BlockId>,
    ) -> Result<usize> {
        let data = self.graph.block_ref(block)?;
        if data.is_ordered() || data.parent_loop_header != loop_header {
            self.frames[frame] = Frame::none();
            return Ok(frame);
        }
        if data.is_open() {
            return Err(invariant_error!("cannot order open block {}", block));
        }
        let loop_id = data.loop_information;
        if let Some(loop_id) = loop_id {
            if !self.graph.loop_ref(loop_id)?.is_post_processed() {
                return Err(invariant_error!(
                    "loop header {} was never post-processed",
                    block
                ));
            }
        }

        let successors = self.successors_of(block)?;
        self.graph.block_mut(block)?.state = BlockState::Ordered;

        match loop_id {
            Some(loop_id) => {
                self.frames[frame] = Frame {
                    kind: FrameKind::SuccessorsOfLoopHeader,
                    block: Some(block),
                    loop_id: None,
                    loop_header: Some(block),
                    successors,
                    member_index: 0,
                    member_count: 0,
                };
                let child = self.push(frame);
                self.setup_loop_members(child, block, loop_id, loop_header)
            }
            None => {
                self.frames[frame] = Frame {
                    kind: FrameKind::Successors,
                    block: Some(block),
                    loop_id: None,
                    loop_header,
                    successors,
                    member_index: 0,
                    member_count: 0,
                };
                Ok(frame)
            }
        }
    }

    fn setup_loop_members(
        &mut self,
        frame: usize,
        block: BlockId,
        loop_id: LoopId,
        loop_header: Option<BlockId>,
    ) -> Result<usize> {
        let member_count = self.graph.loop_ref(loop_id)?.members().len();
        self.frames[frame] = Frame {
            kind: FrameKind::LoopMembers,
            block: Some(block),
            loop_id: Some(loop_id),
            loop_header,
            successors: Terminator::Deoptimize.successors(),
            member_index: 0,
            member_count,
        };
        Ok(frame)
    }

    fn setup_successors_of_loop_member(
        &mut self,
        frame: usize,
        block: BlockId,
        loop_id: LoopId,
        loop_header: Option<BlockId>,
    ) -> Result<usize> {
        let successors = self.successors_of(block)?;
        self.frames[frame] = Frame {
            kind: FrameKind::SuccessorsOfLoopMember,
            block: Some(block),
            loop_id: Some(loop_id),
            loop_header,
            successors,
            member_index: 0,
            member_count: 0,
        };
        Ok(frame)
    }

    fn perform_step(&mut self, frame: usize) -> Result<Option<usize>> {
        match self.perform_non_backtracking_step(frame)? {
            Some(next) => Ok(Some(next)),
            None => self.backtrack(frame),
        }
    }

    fn backtrack(&mut self, frame: usize) -> Result<Option<usize>> {
        let mut parent = self.pop(frame)?;
        while let Some(current) = parent {
            if let Some(next) = self.perform_non_backtracking_step(current)? {
                return Ok(Some(next));
            }
            parent = self.pop(current)?;
        }
        Ok(None)
    }

    fn perform_non_backtracking_step(&mut self, frame: usize) -> Result<Option<usize>> {
        let state = &mut self.frames[frame];
        match state.kind {
            FrameKind::Successors | FrameKind::SuccessorsOfLoopMember => {
                let context = state.loop_header;
                match state.successors.next() {
                    Some(next) => {
                        let child = self.push(frame);
                        self.setup_successors(child, next, context).map(Some)
                    }
                    None => Ok(None),
                }
            }
            FrameKind::SuccessorsOfLoopHeader => {
                let context = state.block;
                match state.successors.next() {
                    Some(next) => {
                        let child = self.push(frame);
                        self.setup_successors(child, next, context).map(Some)
                    }
                    None => Ok(None),
                }
            }
            FrameKind::LoopMembers => {
                if state.member_index >= state.member_count {
                    return Ok(None);
                }
                let index = state.member_index;
                state.member_index += 1;
                let context = state.loop_header;
                let loop_id = state
                    .loop_id
                    .ok_or_else(|| invariant_error!("loop-members frame without a loop"))?;
                let member = self.graph.loop_ref(loop_id)?.members()[index];
                let child = self.push(frame);
                self.setup_successors_of_loop_member(child, member, loop_id, context)
                    .map(Some)
            }
            FrameKind::None => Ok(None),
        }
    }

    /// Closes `frame` and returns the frame to continue with.
    fn pop(&mut self, frame: usize) -> Result<Option<usize>> {
        let state = self.frames[frame].clone();
        match state.kind {
            FrameKind::Successors | FrameKind::SuccessorsOfLoopHeader => {
                if let Some(block) = state.block {
                    self.close_postorder(block)?;
                }
                Ok(Self::parent(frame))
            }
            FrameKind::SuccessorsOfLoopMember => {
                let (Some(block), Some(loop_id)) = (state.block, state.loop_id) else {
                    return Ok(Self::parent(frame));
                };
                let inner = self.graph.block_ref(block)?.loop_information;
                match inner {
                    Some(inner) if block != self.graph.loop_ref(loop_id)?.header() => {
                        self.setup_loop_members(frame, block, inner, state.loop_header)
                            .map(Some)
                    }
                    _ => Ok(Self::parent(frame)),
                }
            }
            FrameKind::LoopMembers | FrameKind::None => Ok(Self::parent(frame)),
        }
    }

    fn close_postorder(&mut self, block: BlockId) -> Result<()> {
        let data = self.graph.block_ref(block)?;
        for successor in data.successors() {
            let scheduled = self.emitted.get(successor.index()).copied().unwrap_or(false);
            let is_loop_header = self.graph.block_ref(successor)?.is_loop_header();
            if !scheduled && !is_loop_header {
                return Err(Error::UnsupportedConstruct(format!(
                    "edge {block} -> {successor} enters a loop body from outside"
                )));
            }
        }
        if let Some(slot) = self.emitted.get_mut(block.index()) {
            *slot = true;
        }
        self.postorder.push(block);
        Ok(())
    }
}

impl Graph {
    /// Places the blocks reachable from the entry in loop-contiguous reverse postorder.
    ///
    /// Assigns every ordered block its final dense id (0 = entry) and marks it reachable.
    /// Blocks the scheduler never reaches lose their reachable flag, report `usize::MAX`
    /// as id and are left out of [`Graph::ordered_blocks`]; back edges from them no
    /// longer count towards their loop's extent.
    ///
    /// # Errors
    ///
    /// - [`Error::InvariantViolation`] if the graph is already ordered, a reachable block is
    ///   still open, or a reachable loop header was never post-processed.
    /// - [`Error::UnsupportedConstruct`] for irreducible control flow.
    /// - [`Error::ResourceExhaustion`] if loops nest deeper than
    ///   [`GraphConfig::max_loop_depth`](crate::GraphConfig::max_loop_depth).
    pub fn order_blocks(&mut self) -> Result<()> {
        if self.is_ordered() {
            return Err(invariant_error!("blocks are already ordered"));
        }
        let entry = self.entry;
        let mut order = PostorderProcessor::new(self).run(entry)?;
        order.reverse();

        for block in &mut self.blocks {
            block.flags.remove(BlockFlags::REACHABLE);
            block.id = UNPLACED;
        }
        for (id, handle) in order.iter().enumerate() {
            let block = &mut self.blocks[handle.index()];
            block.id = id;
            block.flags.insert(BlockFlags::REACHABLE);
        }
        self.ordered = order;

        self.check_loop_extents()?;
        debug!(
            blocks = self.ordered.len(),
            unreachable = self.blocks.len() - self.ordered.len(),
            "ordered blocks"
        );
        Ok(())
    }

    fn check_loop_extents(&self) -> Result<()> {
        for &handle in &self.ordered {
            let block = &self.blocks[handle.index()];
            let Some(loop_id) = block.loop_information else {
                continue;
            };
            for &edge in self.loop_ref(loop_id)?.back_edges() {
                if self.block_ref(edge)?.is_placed() && self.dense_id(edge) < block.id {
                    return Err(Error::UnsupportedConstruct(format!(
                        "back edge {edge} precedes its loop header {handle}"
                    )));
                }
            }
            let depth = self.loop_nesting_depth(handle);
            if depth > self.config.max_loop_depth {
                return Err(Error::ResourceExhaustion {
                    resource: "loop nesting depth",
                    limit: self.config.max_loop_depth,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GraphConfig,
        ir::{LoopMarker, Opcode},
    };

    fn branch(graph: &mut Graph, block: BlockId, if_true: BlockId, if_false: BlockId) {
        let condition = graph
            .add_instruction(block, Opcode::new("cond"), vec![])
            .unwrap();
        graph
            .finish(
                block,
                Terminator::Branch {
                    condition,
                    if_true,
                    if_false,
                },
            )
            .unwrap();
    }

    fn ids(graph: &Graph, blocks: &[BlockId]) -> Vec<usize> {
        blocks.iter().map(|b| graph[*b].id()).collect()
    }

    #[test]
    fn test_straight_line_order() {
        let mut graph = Graph::new(0, 0, 0);
        let entry = graph.entry();
        let b = graph.create_block().unwrap();
        let c = graph.create_block().unwrap();
        graph.finish(entry, Terminator::Goto(c)).unwrap();
        graph.finish(c, Terminator::Goto(b)).unwrap();
        graph.finish_exit(b, Terminator::Return(None)).unwrap();

        graph.order_blocks().unwrap();
        assert_eq!(graph.ordered_blocks(), &[entry, c, b]);
        assert_eq!(ids(&graph, &[entry, c, b]), vec![0, 1, 2]);
        assert!(graph[b].is_ordered());
    }

    #[test]
    fn test_unreachable_blocks_are_excluded() {
        let mut graph = Graph::new(0, 0, 0);
        let entry = graph.entry();
        let dead = graph.create_block().unwrap();
        graph.finish_exit(entry, Terminator::Return(None)).unwrap();

        graph.order_blocks().unwrap();
        assert_eq!(graph.ordered_blocks(), &[entry]);
        assert!(!graph[dead].is_reachable());
        assert!(graph[dead].is_open());
    }

    #[test]
    fn test_open_reachable_block_is_rejected() {
        let mut graph = Graph::new(0, 0, 0);
        let entry = graph.entry();
        let open = graph.create_block().unwrap();
        graph.finish(entry, Terminator::Goto(open)).unwrap();

        assert!(matches!(
            graph.order_blocks(),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_ordering_twice_is_rejected() {
        let mut graph = Graph::new(0, 0, 0);
        let entry = graph.entry();
        graph.finish_exit(entry, Terminator::Return(None)).unwrap();
        graph.order_blocks().unwrap();
        assert!(graph.order_blocks().is_err());
    }

    #[test]
    fn test_loop_exit_is_placed_after_body() {
        // entry -> h; h -> exit, body; body -> h
        let mut graph = Graph::new(0, 0, 1);
        let entry = graph.entry();
        let h = graph.create_loop_header(entry).unwrap();
        graph.finish(entry, Terminator::Goto(h)).unwrap();
        let exit = graph.create_block().unwrap();
        let body = graph.create_block().unwrap();
        branch(&mut graph, h, exit, body);
        graph.finish(body, Terminator::Goto(h)).unwrap();
        graph.post_process_loop_header(h, LoopMarker(0)).unwrap();
        graph.finish_exit(exit, Terminator::Return(None)).unwrap();

        graph.order_blocks().unwrap();
        assert_eq!(graph.ordered_blocks(), &[entry, h, body, exit]);
    }

    #[test]
    fn test_dead_back_edge_is_ignored() {
        // entry -> h; h -> body, exit; body -> h; dead -> h
        let mut graph = Graph::with_config(GraphConfig::strict(), 0, 0, 1);
        let entry = graph.entry();
        let h = graph.create_loop_header(entry).unwrap();
        graph.finish(entry, Terminator::Goto(h)).unwrap();
        let body = graph.create_block().unwrap();
        let exit = graph.create_block().unwrap();
        branch(&mut graph, h, body, exit);
        graph.finish(body, Terminator::Goto(h)).unwrap();
        let dead = graph.create_block().unwrap();
        let snapshot = graph.environment_snapshot(entry).unwrap();
        graph.set_environment(dead, snapshot).unwrap();
        graph.finish(dead, Terminator::Goto(h)).unwrap();
        graph.post_process_loop_header(h, LoopMarker(0)).unwrap();
        graph.finish_exit(exit, Terminator::Return(None)).unwrap();

        graph.finalize().unwrap();
        let loop_id = graph[h].loop_information().unwrap();
        assert_eq!(graph[loop_id].back_edges(), &[body, dead]);
        assert_eq!(graph.ordered_blocks(), &[entry, h, body, exit]);
        assert!(!graph[dead].is_reachable());
        assert!(!graph[dead].is_placed());
        assert_eq!(graph.last_back_edge(loop_id), Some(body));
        assert!(graph[body].is_loop_successor_dominator());
        assert!(!graph[exit].is_loop_successor_dominator());
        assert_eq!(graph[exit].dominator(), Some(h));
    }

    #[test]
    fn test_unprocessed_loop_header_is_rejected() {
        let mut graph = Graph::new(0, 0, 1);
        let entry = graph.entry();
        let h = graph.create_loop_header(entry).unwrap();
        graph.finish(entry, Terminator::Goto(h)).unwrap();
        graph.finish(h, Terminator::Goto(h)).unwrap();

        assert!(matches!(
            graph.order_blocks(),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_loop_depth_budget() {
        let config = GraphConfig::default().with_max_loop_depth(1);
        let mut graph = Graph::with_config(config, 0, 0, 1);
        let entry = graph.entry();
        let outer = graph.create_loop_header(entry).unwrap();
        graph.finish(entry, Terminator::Goto(outer)).unwrap();
        let inner_pre = graph.create_block().unwrap();
        let exit = graph.create_block().unwrap();
        branch(&mut graph, outer, inner_pre, exit);
        let inner = graph.create_loop_header(inner_pre).unwrap();
        graph.finish(inner_pre, Terminator::Goto(inner)).unwrap();
        let inner_body = graph.create_block().unwrap();
        let inner_exit = graph.create_block().unwrap();
        branch(&mut graph, inner, inner_body, inner_exit);
        graph.finish(inner_body, Terminator::Goto(inner)).unwrap();
        graph.post_process_loop_header(inner, LoopMarker(1)).unwrap();
        graph.finish(inner_exit, Terminator::Goto(outer)).unwrap();
        graph.post_process_loop_header(outer, LoopMarker(0)).unwrap();
        graph.finish_exit(exit, Terminator::Return(None)).unwrap();

        assert!(matches!(
            graph.order_blocks(),
            Err(Error::ResourceExhaustion {
                resource: "loop nesting depth",
                limit: 1
            })
        ));
    }
}
