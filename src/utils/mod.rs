//! Shared utilities.
//!
//! - [`graph`] - Graph traits and reference algorithms used to cross-check the IR.

pub mod graph;
