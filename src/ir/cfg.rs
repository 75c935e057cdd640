//! Generic graph view of an ordered [`Graph`].
//!
//! [`BlockCfg`] exposes the reachable, ordered blocks through the traits in
//! [`utils::graph`](crate::utils::graph), so generic algorithms can run over the IR
//! without copying it. Node `n` is the block with dense id `n`. Edges from or to
//! unreachable blocks are hidden.

use crate::{
    ir::{BlockId, Graph},
    utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
};

/// Borrowed adapter presenting an ordered graph to generic algorithms.
///
/// # Examples
///
/// ```rust,ignore
/// let cfg = BlockCfg::new(&graph);
/// let tree = compute_dominators(&cfg, cfg.entry());
/// let idom = tree.immediate_dominator(cfg.node_of(block));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BlockCfg<'g> {
    graph: &'g Graph,
}

impl<'g> BlockCfg<'g> {
    /// Wraps an ordered graph. Before ordering the view is empty.
    #[must_use]
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Returns the node standing for `block`.
    #[must_use]
    pub fn node_of(&self, block: BlockId) -> NodeId {
        NodeId::new(self.graph.dense_id(block))
    }

    /// Returns the block behind `node`.
    #[must_use]
    pub fn block_of(&self, node: NodeId) -> Option<BlockId> {
        self.graph.ordered.get(node.index()).copied()
    }

    fn visible(&self, block: BlockId) -> Option<NodeId> {
        let data = self.graph.block(block)?;
        (data.is_ordered() && data.is_reachable()).then(|| NodeId::new(data.id()))
    }

    fn neighbours(&self, node: NodeId, forward: bool) -> impl Iterator<Item = NodeId> + 'g {
        let view = *self;
        let blocks: Vec<BlockId> = match self.block_of(node).and_then(|b| self.graph.block(b)) {
            Some(data) if data.is_reachable() => {
                if forward {
                    data.successors().collect()
                } else {
                    data.predecessors().to_vec()
                }
            }
            _ => Vec::new(),
        };
        blocks.into_iter().filter_map(move |b| view.visible(b))
    }
}

impl GraphBase for BlockCfg<'_> {
    fn node_count(&self) -> usize {
        self.graph.ordered.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId::new)
    }
}

impl Successors for BlockCfg<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.neighbours(node, true)
    }
}

impl Predecessors for BlockCfg<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.neighbours(node, false)
    }
}

impl RootedGraph for BlockCfg<'_> {
    fn entry(&self) -> NodeId {
        self.node_of(self.graph.entry())
    }
}
