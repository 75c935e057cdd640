//! Loop information attached to loop-header blocks.
//!
//! Loops are discovered while the graph is being built, not by a separate analysis over
//! a finished CFG. The builder creates the header eagerly (before the body exists, so
//! every environment slot gets a phi), emits the body, jumps back to the header and then
//! calls [`Graph::post_process_loop_header`]. At that point every predecessor of the header
//! beyond the first is a back edge, and the members are collected by walking predecessors
//! backwards from each back edge until the header is reached.
//!
//! # Loop Structure
//!
//! ```text
//!     [pre-header]        <- the header's first (and only forward) predecessor
//!          |
//!          v
//!     [header] <------+   <- members[0]
//!          |          |
//!          v          |
//!     [body ...]      |   <- members, tagged with parent_loop_header = header
//!          |          |
//!          v          |
//!     [back edge] ----+
//!          |
//!          v
//!     [loop successor]
//! ```
//!
//! # Nesting
//!
//! `parent_loop_header` doubles as the visited marker of the member walk. A block that is
//! already tagged with an inner loop's header is not re-tagged; the walk continues at the
//! inner header instead, so the inner loop's blocks become transitive members of the
//! outer loop without being processed twice. Inner loops are always post-processed before
//! the loops enclosing them, which is what makes this work.

use std::fmt;

use tracing::trace;

use crate::{
    ir::{BlockId, Graph, LoopId},
    Error, Result,
};

/// Opaque tag identifying the source construct that produced a loop.
///
/// The graph stores it for diagnostics and never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopMarker(pub u32);

impl fmt::Display for LoopMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt{}", self.0)
    }
}

/// Membership and back-edge record of one loop.
#[derive(Debug, Clone)]
pub struct LoopInformation {
    id: LoopId,
    header: BlockId,
    /// The only block allowed to enter the loop without a back edge.
    pre_header: BlockId,
    back_edges: Vec<BlockId>,
    /// Header first, then members in discovery order.
    members: Vec<BlockId>,
    marker: Option<LoopMarker>,
    post_processed: bool,
    detached: bool,
}

impl LoopInformation {
    pub(crate) fn new(id: LoopId, header: BlockId, pre_header: BlockId) -> Self {
        Self {
            id,
            header,
            pre_header,
            back_edges: Vec::new(),
            members: vec![header],
            marker: None,
            post_processed: false,
            detached: false,
        }
    }

    /// Returns the handle of this record.
    #[must_use]
    pub const fn id(&self) -> LoopId {
        self.id
    }

    /// Returns the loop header.
    #[must_use]
    pub const fn header(&self) -> BlockId {
        self.header
    }

    /// Returns the block the header was created from, which must be its first
    /// predecessor.
    #[must_use]
    pub const fn pre_header(&self) -> BlockId {
        self.pre_header
    }

    /// Returns the back edges in registration order.
    #[must_use]
    pub fn back_edges(&self) -> &[BlockId] {
        &self.back_edges
    }

    /// Returns the member blocks, header first.
    ///
    /// Members of nested loops are included.
    #[must_use]
    pub fn members(&self) -> &[BlockId] {
        &self.members
    }

    /// Returns `true` if `block` is a member of this loop (header included).
    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.members.contains(&block)
    }

    /// Returns the source marker passed to [`Graph::post_process_loop_header`].
    #[must_use]
    pub const fn marker(&self) -> Option<LoopMarker> {
        self.marker
    }

    /// Returns `true` once the header has been post-processed.
    #[must_use]
    pub const fn is_post_processed(&self) -> bool {
        self.post_processed
    }

    /// Returns `true` if the loop turned out never to iterate and was detached from its
    /// header.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }
}

impl Graph {
    /// Finishes the construction of a loop once all predecessors of its header are known.
    ///
    /// A header with a single predecessor never iterates: its loop information is
    /// detached and the header becomes an ordinary block. Otherwise every predecessor
    /// after the first is registered as a back edge and the loop members are collected.
    ///
    /// # Arguments
    ///
    /// * `header` - The loop header
    /// * `marker` - Tag of the source construct, kept for diagnostics
    ///
    /// # Errors
    ///
    /// - [`Error::InvariantViolation`] if `header` is not a loop header, was already
    ///   post-processed, or has no predecessors.
    /// - [`Error::UnsupportedConstruct`] if a back edge can be reached from the entry block
    ///   without passing through the header (irreducible control flow).
    pub fn post_process_loop_header(&mut self, header: BlockId, marker: LoopMarker) -> Result<()> {
        let block = self.block_ref(header)?;
        let loop_id = block
            .loop_information
            .ok_or_else(|| invariant_error!("{} is not a loop header", header))?;
        let predecessors = block.predecessors.clone();

        let info = self.loop_mut(loop_id)?;
        if info.post_processed {
            return Err(invariant_error!("loop header {} post-processed twice", header));
        }
        info.post_processed = true;
        info.marker = Some(marker);

        match predecessors.len() {
            0 => Err(invariant_error!("loop header {} has no predecessors", header)),
            1 => {
                trace!(%header, %marker, "detaching degenerate loop");
                self.loop_mut(loop_id)?.detached = true;
                self.block_mut(header)?.loop_information = None;
                Ok(())
            }
            _ => {
                for &back_edge in &predecessors[1..] {
                    self.register_back_edge(loop_id, back_edge)?;
                }
                Ok(())
            }
        }
    }

    /// Returns the back edge of `loop_id` with the largest dense id.
    ///
    /// Once blocks are ordered this is the last block of the loop's contiguous range.
    /// Back edges from blocks the ordering left out are ignored, so a loop whose back
    /// edges are all dead yields `None`.
    #[must_use]
    pub fn last_back_edge(&self, loop_id: LoopId) -> Option<BlockId> {
        let info = self.loops.get(loop_id.index())?;
        info.back_edges
            .iter()
            .filter_map(|edge| self.blocks.get(edge.index()))
            .filter(|block| block.is_placed())
            .max_by_key(|block| block.id)
            .map(|block| block.handle)
    }

    pub(crate) fn register_back_edge(&mut self, loop_id: LoopId, block: BlockId) -> Result<()> {
        let header = self.loop_ref(loop_id)?.header;
        trace!(%header, back_edge = %block, "registering back edge");
        self.loop_mut(loop_id)?.back_edges.push(block);
        self.add_loop_member(loop_id, block)
    }

    /// Adds `block` and, transitively, its predecessors to the members of `loop_id`.
    ///
    /// Walks predecessors with an explicit stack in the same order a recursive walk would.
    fn add_loop_member(&mut self, loop_id: LoopId, block: BlockId) -> Result<()> {
        let header = self.loop_ref(loop_id)?.header;
        let mut stack = vec![block];

        while let Some(current) = stack.pop() {
            if current == header {
                continue;
            }
            let data = self.block_ref(current)?;
            match data.parent_loop_header {
                Some(parent) if parent == header => continue,
                Some(inner) => {
                    stack.push(inner);
                    continue;
                }
                None => {}
            }
            if current == self.entry {
                return Err(Error::UnsupportedConstruct(format!(
                    "loop at {header} can be entered without passing through its header"
                )));
            }

            let predecessors = data.predecessors.clone();
            self.block_mut(current)?.parent_loop_header = Some(header);
            self.loop_mut(loop_id)?.members.push(current);
            stack.extend(predecessors.iter().rev());
        }
        Ok(())
    }
}
