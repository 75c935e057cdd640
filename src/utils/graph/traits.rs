//! Adjacency traits for generic graph algorithms.
//!
//! The hierarchy is minimal and composable:
//!
//! - [`GraphBase`] - Node count and node iteration
//! - [`Successors`] - Outgoing edges
//! - [`Predecessors`] - Incoming edges
//! - [`RootedGraph`] - A designated entry node
//!
//! All adjacency queries return iterators, so adapters over existing structures do not
//! need to allocate.

use crate::utils::graph::NodeId;

/// Core properties every graph provides.
pub trait GraphBase {
    /// Returns the number of nodes. Node ids are `0..node_count()`.
    fn node_count(&self) -> usize;

    /// Returns every node id in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns the successors of `node`.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a node of the graph.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns the predecessors of `node`.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a node of the graph.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a designated entry node, the root for dominator computation.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}
