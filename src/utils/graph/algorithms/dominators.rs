//! Dominator tree computation.
//!
//! A node `d` **dominates** a node `n` if every path from the entry to `n` passes through
//! `d`. The **immediate dominator** of `n` is the unique strict dominator of `n` that is
//! dominated by every other strict dominator of `n`.
//!
//! # Algorithm
//!
//! The iterative algorithm of Cooper, Harvey and Kennedy: nodes are visited in reverse
//! postorder and each node's immediate dominator is refined to the nearest common
//! ancestor of its processed predecessors until nothing changes. On reducible graphs this
//! converges in two passes. It is slower than Lengauer-Tarjan in theory but short enough
//! to serve as an obviously-correct reference.

use crate::utils::graph::{algorithms::reverse_postorder, NodeId, Predecessors, Successors};

/// Result of dominator computation.
///
/// Nodes unreachable from the entry have no dominator and are dominated by nothing.
///
/// # Examples
///
/// ```rust,ignore
/// // Diamond: entry -> a, b -> exit
/// let tree = compute_dominators(&graph, entry);
/// assert_eq!(tree.immediate_dominator(exit), Some(entry));
/// assert!(!tree.strictly_dominates(a, exit));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    /// Immediate dominator per node; `None` for the entry and unreachable nodes.
    idom: Vec<Option<NodeId>>,
    reachable: Vec<bool>,
}

impl DominatorTree {
    /// Returns the entry (root) node.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of `node`, or `None` for the entry and for
    /// unreachable nodes.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// Returns `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.reachable.get(node.index()).copied().unwrap_or(false)
    }

    /// Checks if `a` dominates `b`. A reachable node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        self.dominators(b).any(|d| d == a)
    }

    /// Checks if `a` dominates `b` and `a != b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the dominators of `node`, from `node` itself up to the entry.
    pub fn dominators(&self, node: NodeId) -> DominatorIterator<'_> {
        DominatorIterator {
            tree: self,
            current: self.is_reachable(node).then_some(node),
        }
    }

    /// Returns the depth of `node` in the tree (entry = 0).
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Returns the nodes immediately dominated by `node`, in ascending order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.idom
            .iter()
            .enumerate()
            .filter(|(_, idom)| **idom == Some(node))
            .map(|(index, _)| NodeId::new(index))
            .collect()
    }

    /// Returns the number of nodes the tree was computed over.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }
}

/// Iterator over the dominators of a node, from the node up to the entry.
pub struct DominatorIterator<'a> {
    tree: &'a DominatorTree,
    current: Option<NodeId>,
}

impl Iterator for DominatorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.immediate_dominator(current);
        Some(current)
    }
}

/// Computes the dominator tree of the nodes reachable from `entry`.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `entry` - The root of the tree
///
/// # Returns
///
/// A [`DominatorTree`] over all `graph.node_count()` nodes.
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    const UNDEFINED: usize = usize::MAX;

    let node_count = graph.node_count();
    let order = reverse_postorder(graph, entry);

    let mut rpo_index = vec![UNDEFINED; node_count];
    for (index, node) in order.iter().enumerate() {
        rpo_index[node.index()] = index;
    }

    // Works on reverse-postorder positions; idom[0] is the entry.
    let mut idom = vec![UNDEFINED; order.len()];
    if !order.is_empty() {
        idom[0] = 0;
    }

    let intersect = |idom: &[usize], mut first: usize, mut second: usize| {
        while first != second {
            while first > second {
                first = idom[first];
            }
            while second > first {
                second = idom[second];
            }
        }
        first
    };

    let mut changed = true;
    while changed {
        changed = false;
        for (position, node) in order.iter().enumerate().skip(1) {
            let mut new_idom = UNDEFINED;
            for pred in graph.predecessors(*node) {
                let Some(&pred_position) = rpo_index.get(pred.index()) else {
                    continue;
                };
                if pred_position == UNDEFINED || idom[pred_position] == UNDEFINED {
                    continue;
                }
                new_idom = if new_idom == UNDEFINED {
                    pred_position
                } else {
                    intersect(&idom, pred_position, new_idom)
                };
            }
            if new_idom != UNDEFINED && idom[position] != new_idom {
                idom[position] = new_idom;
                changed = true;
            }
        }
    }

    let mut result = vec![None; node_count];
    let mut reachable = vec![false; node_count];
    for (position, node) in order.iter().enumerate() {
        reachable[node.index()] = true;
        if position != 0 && idom[position] != UNDEFINED {
            result[node.index()] = Some(order[idom[position]]);
        }
    }

    DominatorTree {
        entry,
        idom: result,
        reachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::GraphBase;

    struct EdgeList {
        node_count: usize,
        edges: Vec<(usize, usize)>,
    }

    impl GraphBase for EdgeList {
        fn node_count(&self) -> usize {
            self.node_count
        }

        fn node_ids(&self) -> impl Iterator<Item = NodeId> {
            (0..self.node_count).map(NodeId::new)
        }
    }

    impl Successors for EdgeList {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(src, _)| *src == node.index())
                .map(|(_, dst)| NodeId::new(*dst))
        }
    }

    impl Predecessors for EdgeList {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(_, dst)| *dst == node.index())
                .map(|(src, _)| NodeId::new(*src))
        }
    }

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    #[test]
    fn test_dominators_diamond() {
        let graph = EdgeList {
            node_count: 4,
            edges: vec![(0, 1), (0, 2), (1, 3), (2, 3)],
        };
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(0)), None);
        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert_eq!(tree.immediate_dominator(n(3)), Some(n(0)));
        assert!(tree.dominates(n(0), n(3)));
        assert!(!tree.strictly_dominates(n(1), n(3)));
        assert_eq!(tree.children(n(0)), vec![n(1), n(2), n(3)]);
    }

    #[test]
    fn test_dominators_loop() {
        // 0 -> 1 -> 2 -> 1, 1 -> 3
        let graph = EdgeList {
            node_count: 4,
            edges: vec![(0, 1), (1, 2), (2, 1), (1, 3)],
        };
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(2)), Some(n(1)));
        assert_eq!(tree.immediate_dominator(n(3)), Some(n(1)));
        assert_eq!(tree.depth(n(2)), 2);
        assert_eq!(tree.dominators(n(2)).collect::<Vec<_>>(), vec![n(2), n(1), n(0)]);
    }

    #[test]
    fn test_dominators_unreachable() {
        let graph = EdgeList {
            node_count: 3,
            edges: vec![(0, 1), (2, 1)],
        };
        let tree = compute_dominators(&graph, n(0));

        assert_eq!(tree.immediate_dominator(n(1)), Some(n(0)));
        assert!(!tree.is_reachable(n(2)));
        assert_eq!(tree.immediate_dominator(n(2)), None);
        assert!(!tree.dominates(n(2), n(1)));
        assert_eq!(tree.node_count(), 3);
    }
}
