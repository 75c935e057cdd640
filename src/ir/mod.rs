//! Control-flow graph IR for an optimizing compiler.
//!
//! This module holds the graph a front end builds while translating one compilation unit,
//! together with the passes that turn a freshly built graph into one later optimization
//! passes can rely on.
//!
//! # Architecture
//!
//! ```text
//!  front end ──> GraphBuilder / Graph ──> finish: merge environments, create phis
//!                                    ──> post_process_loop_header: loop membership
//!                     finalize ──> order_blocks ──> assign_dominators ──> verify
//! ```
//!
//! # Key Components
//!
//! - [`Graph`] - Arena owning blocks, values, phis and loops
//! - [`GraphBuilder`] - Structured construction (branches, joins, loops, inlining)
//! - [`BasicBlock`] - A straight-line sequence of instructions ending in a [`Terminator`]
//! - [`Environment`] - Abstract interpreter state: parameters, specials, locals, stack
//! - [`Phi`] - Merge of one environment slot at a join or loop header
//! - [`LoopInformation`] - Back edges and members of a natural loop
//! - [`BlockCfg`] - Read-only view of an ordered graph for generic graph algorithms
//!
//! # Identity
//!
//! Blocks are addressed by stable [`BlockId`] handles. Each block also carries a dense
//! numeric id: its creation number until [`Graph::order_blocks`] runs, its position in
//! the reverse-postorder afterwards.

mod block;
mod builder;
mod cfg;
mod dominators;
mod environment;
mod graph;
pub mod ids;
mod instruction;
mod loops;
mod order;
mod phi;
mod value;
mod verify;

pub use block::{BasicBlock, BlockFlags, BlockState};
pub use builder::GraphBuilder;
pub use cfg::BlockCfg;
pub use environment::Environment;
pub use graph::Graph;
pub use ids::{BlockId, LoopId, PhiId, ValueId};
pub use instruction::{Instruction, Opcode, SuccessorIter, Terminator};
pub use loops::{LoopInformation, LoopMarker};
pub use phi::Phi;
pub use value::ValueKind;
