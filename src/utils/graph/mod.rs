//! Generic directed-graph abstractions.
//!
//! The IR keeps its own block arena and never builds a separate graph structure. The
//! traits in this module let generic algorithms run over any structure that can answer
//! "how many nodes" and "what are the successors of this node", which is how
//! [`Graph::verify`](crate::ir::Graph::verify) recomputes dominators independently of
//! the incremental assignment.
//!
//! # Key Components
//!
//! - [`NodeId`] - Dense node identifier
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - Adjacency traits
//! - [`algorithms`] - Traversal orders and dominator computation
//!
//! # Examples
//!
//! ```rust
//! use irgraph::utils::graph::{algorithms, GraphBase, NodeId, Successors};
//!
//! struct Chain(usize);
//!
//! impl GraphBase for Chain {
//!     fn node_count(&self) -> usize { self.0 }
//!     fn node_ids(&self) -> impl Iterator<Item = NodeId> { (0..self.0).map(NodeId::new) }
//! }
//!
//! impl Successors for Chain {
//!     fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
//!         let next = node.index() + 1;
//!         (next < self.0).then(|| NodeId::new(next)).into_iter()
//!     }
//! }
//!
//! let order = algorithms::reverse_postorder(&Chain(3), NodeId::new(0));
//! assert_eq!(order, vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]);
//! ```

pub mod algorithms;
mod node;
mod traits;

pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
