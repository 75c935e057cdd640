//! Depth-first traversal orders.
//!
//! Both functions are iterative and return collected vectors, since the order requires a
//! full traversal anyway.

use crate::utils::graph::{NodeId, Successors};

/// Computes the postorder of the nodes reachable from `start`.
///
/// Successors are explored in iteration order; a node is emitted after all of its
/// unvisited descendants.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node
///
/// # Returns
///
/// The reachable nodes in postorder, or an empty vector if `start` is not a node of the
/// graph.
///
/// # Examples
///
/// ```rust,ignore
/// // a -> b -> c
/// let order = postorder(&graph, a);
/// assert_eq!(order, vec![c, b, a]);
/// ```
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];
    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                // Reverse so the first successor is explored first
                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Computes the reverse postorder of the nodes reachable from `start`.
///
/// Every node appears before its successors, except along edges that close a cycle.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
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

    fn n(index: usize) -> NodeId {
        NodeId::new(index)
    }

    #[test]
    fn test_postorder_linear() {
        let graph = EdgeList {
            node_count: 3,
            edges: vec![(0, 1), (1, 2)],
        };
        assert_eq!(postorder(&graph, n(0)), vec![n(2), n(1), n(0)]);
        assert_eq!(reverse_postorder(&graph, n(0)), vec![n(0), n(1), n(2)]);
    }

    #[test]
    fn test_postorder_diamond() {
        let graph = EdgeList {
            node_count: 4,
            edges: vec![(0, 1), (0, 2), (1, 3), (2, 3)],
        };
        assert_eq!(postorder(&graph, n(0)), vec![n(3), n(1), n(2), n(0)]);
    }

    #[test]
    fn test_postorder_cycle_and_unreachable() {
        let graph = EdgeList {
            node_count: 4,
            edges: vec![(0, 1), (1, 2), (2, 1)],
        };
        let order = reverse_postorder(&graph, n(0));
        assert_eq!(order, vec![n(0), n(1), n(2)]);
        assert!(!order.contains(&n(3)));
    }

    #[test]
    fn test_postorder_invalid_start() {
        let graph = EdgeList {
            node_count: 1,
            edges: vec![],
        };
        assert!(postorder(&graph, n(5)).is_empty());
    }
}
