//! Graph algorithms over the adjacency traits.
//!
//! # Available Algorithms
//!
//! - [`postorder`] / [`reverse_postorder`] - Iterative depth-first orders
//! - [`compute_dominators`] - Iterative dominator computation, returning a
//!   [`DominatorTree`]
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | Postorder / RPO | O(V + E) | Forward data flow, reference orders |
//! | Dominators | O(V + E) per iteration, few iterations on reducible graphs | Verification |

mod dominators;
mod traversal;

pub use dominators::{compute_dominators, DominatorIterator, DominatorTree};
pub use traversal::{postorder, reverse_postorder};
