//! # irgraph Prelude
//!
//! Glob-import this module to get the types needed to build and finalize a graph.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all irgraph operations
pub use crate::Error;

/// The result type used throughout irgraph
pub use crate::Result;

/// Budgets and checks for construction and finalization
pub use crate::GraphConfig;

// ================================================================================================
// Construction
// ================================================================================================

/// The graph arena and structured builder
pub use crate::ir::{Graph, GraphBuilder};

/// Instructions and block terminators
pub use crate::ir::{Opcode, Terminator};

/// Tag identifying the source construct of a loop
pub use crate::ir::LoopMarker;

// ================================================================================================
// Inspection
// ================================================================================================

/// Entity handles
pub use crate::ir::{BlockId, LoopId, PhiId, ValueId};

/// Blocks, environments, phis and loops
pub use crate::ir::{BasicBlock, Environment, LoopInformation, Phi, ValueKind};
