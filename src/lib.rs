// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # irgraph
//!
//! Control-flow graph construction for an SSA-based optimizing compiler.
//!
//! A front end walks the source of one compilation unit and feeds `irgraph` basic blocks,
//! instructions and control-flow edges. While it does so, `irgraph` keeps an abstract
//! interpreter state (the [`Environment`](ir::Environment)) per block, merges states where
//! control flow joins and inserts phi nodes for every slot whose value differs between
//! incoming paths. Once construction is complete, [`Graph::finalize`](ir::Graph::finalize)
//! turns the graph into the canonical form later passes depend on:
//!
//! - **Block order** - reverse postorder in which every loop occupies a contiguous range,
//!   header first, with the loop exits placed after the body
//! - **Dominators** - immediate dominator and sorted dominated-children per block
//! - **Loop-successor dominators** - blocks executed on every iteration that reaches the
//!   back edge are flagged for loop-invariant code motion
//!
//! ## Quick Start
//!
//! ```rust
//! use irgraph::prelude::*;
//!
//! // if (p0) { x = 1 } else { x = 2 }; return x
//! let mut builder = GraphBuilder::new(1, 0, 1);
//! let p0 = builder.environment()?.parameter(0)?;
//! let (then_block, else_block) = builder.branch(p0)?;
//!
//! builder.set_current_block(Some(then_block));
//! let one = builder.constant(1);
//! builder.environment_mut()?.bind_local(0, one)?;
//!
//! builder.set_current_block(Some(else_block));
//! let two = builder.constant(2);
//! builder.environment_mut()?.bind_local(0, two)?;
//!
//! let join = builder.create_join(Some(then_block), Some(else_block))?;
//! builder.set_current_block(join);
//! let x = builder.environment()?.local(0)?;
//! builder.return_value(Some(x))?;
//!
//! let graph = builder.finalize()?;
//! assert_eq!(graph.ordered_blocks().len(), 4);
//! # Ok::<(), irgraph::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). An error always means the
//! graph under construction must be abandoned:
//!
//! ```rust
//! use irgraph::{Error, ir::Graph};
//!
//! let mut graph = Graph::new(0, 0, 0);
//! match graph.order_blocks() {
//!     Err(Error::InvariantViolation { message, .. }) => println!("builder bug: {message}"),
//!     Err(Error::UnsupportedConstruct(what)) => println!("cannot optimize: {what}"),
//!     Err(e) => println!("other error: {e}"),
//!     Ok(()) => unreachable!(),
//! }
//! ```
//!
//! ## Logging
//!
//! Passes emit [`tracing`] events: `debug` summaries when ordering, dominator assignment
//! and verification complete, `trace` events for every phi created and every loop member
//! added. Install any `tracing` subscriber to see them.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench --bench finalize
//! cargo +nightly fuzz run builder_script --release
//! ```

#[macro_use]
pub(crate) mod error;

/// Budgets and checks applied during construction and finalization.
pub mod config;

/// The control-flow graph IR: blocks, environments, phis, loops and the passes over them.
pub mod ir;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use irgraph::prelude::*;
///
/// let mut graph = Graph::new(0, 0, 0);
/// let entry = graph.entry();
/// graph.finish_exit(entry, Terminator::Return(None))?;
/// graph.finalize()?;
/// # Ok::<(), irgraph::Error>(())
/// ```
pub mod prelude;

/// Shared utilities, most notably generic graph traits and algorithms.
pub mod utils;

/// `irgraph` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `irgraph` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the individual
/// categories.
pub use error::Error;

/// Construction configuration.
pub use config::GraphConfig;
