//! Structured construction on top of [`Graph`].
//!
//! [`GraphBuilder`] tracks the *current block*, the open block the front end is
//! emitting into, and offers the handful of shapes structured source code needs:
//! two-way branches into fresh blocks, joins, loops with breaks, exits and inlined call
//! scopes. Every shape it produces is in edge-split form, because branch targets are
//! always fresh blocks and joins are only ever entered through `goto`.
//!
//! When control cannot continue (after a return, a deoptimization, or a `goto`), the
//! current block becomes `None`; code emitted there would be dead, and the front end is
//! expected to skip it.
//!
//! # Examples
//!
//! ```rust
//! use irgraph::prelude::*;
//!
//! // i = 0; while (i < p0) { i = i + 1 }; return i
//! let mut builder = GraphBuilder::new(1, 0, 1);
//! let zero = builder.constant(0);
//! builder.environment_mut()?.bind_local(0, zero)?;
//!
//! let header = builder.loop_entry()?;
//! let i = builder.environment()?.local(0)?;
//! let p0 = builder.environment()?.parameter(0)?;
//! let cond = builder.add_instruction(Opcode::new("lt"), vec![i, p0])?;
//! let (body, exit) = builder.branch(cond)?;
//!
//! builder.set_current_block(Some(body));
//! let one = builder.constant(1);
//! let i = builder.environment()?.local(0)?;
//! let next = builder.add_instruction(Opcode::new("add"), vec![i, one])?;
//! builder.environment_mut()?.bind_local(0, next)?;
//! let body_exit = builder.current_block();
//!
//! let after = builder.create_loop(header, body_exit, Some(exit), None, LoopMarker(1))?;
//! builder.set_current_block(after);
//! let result = builder.environment()?.local(0)?;
//! builder.return_value(Some(result))?;
//!
//! let graph = builder.finalize()?;
//! assert_eq!(graph.loop_nesting_depth(body), 1);
//! # Ok::<(), irgraph::Error>(())
//! ```

use crate::{
    config::GraphConfig,
    ir::{BlockId, Environment, Graph, LoopMarker, Opcode, Terminator, ValueId},
    Result,
};

/// Front-end facing construction helper owning a [`Graph`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    graph: Graph,
    current: Option<BlockId>,
}

impl GraphBuilder {
    /// Creates a builder positioned at the entry block of a fresh graph.
    #[must_use]
    pub fn new(parameter_count: usize, specials_count: usize, local_count: usize) -> Self {
        Self::with_config(
            GraphConfig::default(),
            parameter_count,
            specials_count,
            local_count,
        )
    }

    /// Creates a builder over a graph with an explicit configuration.
    #[must_use]
    pub fn with_config(
        config: GraphConfig,
        parameter_count: usize,
        specials_count: usize,
        local_count: usize,
    ) -> Self {
        let graph = Graph::with_config(config, parameter_count, specials_count, local_count);
        let entry = graph.entry();
        Self {
            graph,
            current: Some(entry),
        }
    }

    /// Returns the graph under construction.
    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the graph under construction for direct manipulation.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Returns the block currently emitted into, or `None` if control cannot reach this
    /// point.
    #[must_use]
    pub const fn current_block(&self) -> Option<BlockId> {
        self.current
    }

    /// Moves emission to `block`.
    pub fn set_current_block(&mut self, block: Option<BlockId>) {
        self.current = block;
    }

    fn current(&self) -> Result<BlockId> {
        self.current
            .ok_or_else(|| invariant_error!("no current block to emit into"))
    }

    /// Returns the environment of the current block.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if there is no current block or it has no
    /// environment.
    pub fn environment(&self) -> Result<&Environment> {
        let block = self.current()?;
        self.graph
            .environment(block)
            .ok_or_else(|| invariant_error!("current block {} has no environment", block))
    }

    /// Returns the environment of the current block for modification.
    ///
    /// # Errors
    ///
    /// See [`GraphBuilder::environment`].
    pub fn environment_mut(&mut self) -> Result<&mut Environment> {
        let block = self.current()?;
        self.graph.environment_mut(block)
    }

    /// Returns the interned value of the constant `value`.
    pub fn constant(&mut self, value: i64) -> ValueId {
        self.graph.constant(value)
    }

    /// Opens a new block without making it current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhaustion`](crate::Error::ResourceExhaustion) if the
    /// block budget is exhausted.
    pub fn create_block(&mut self) -> Result<BlockId> {
        self.graph.create_block()
    }

    /// Appends an instruction to the current block.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if there is no current block.
    pub fn add_instruction(&mut self, opcode: Opcode, operands: Vec<ValueId>) -> Result<ValueId> {
        let block = self.current()?;
        self.graph.add_instruction(block, opcode, operands)
    }

    /// Jumps from the current block to `target`. The current block becomes `None`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::finish`].
    pub fn goto(&mut self, target: BlockId) -> Result<()> {
        let block = self.current()?;
        self.graph.finish(block, Terminator::Goto(target))?;
        self.current = None;
        Ok(())
    }

    /// Branches on `condition` into two fresh blocks and returns them as
    /// `(if_true, if_false)`. The current block becomes `None`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::create_block`] and [`Graph::finish`].
    pub fn branch(&mut self, condition: ValueId) -> Result<(BlockId, BlockId)> {
        let block = self.current()?;
        let if_true = self.graph.create_block()?;
        let if_false = self.graph.create_block()?;
        self.graph.finish(
            block,
            Terminator::Branch {
                condition,
                if_true,
                if_false,
            },
        )?;
        self.current = None;
        Ok((if_true, if_false))
    }

    /// Leaves the compilation unit from the current block.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::finish_exit`].
    pub fn return_value(&mut self, value: Option<ValueId>) -> Result<()> {
        let block = self.current()?;
        self.graph.finish_exit(block, Terminator::Return(value))?;
        self.current = None;
        Ok(())
    }

    /// Abandons optimized execution at the current block.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::finish_exit`].
    pub fn deoptimize(&mut self) -> Result<()> {
        let block = self.current()?;
        self.graph.finish_exit(block, Terminator::Deoptimize)?;
        self.current = None;
        Ok(())
    }

    /// Joins two control-flow paths, either of which may be dead.
    ///
    /// With two live paths a fresh join block is created and both jump to it. With one
    /// live path that path is returned unchanged; with none, `None`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::create_block`] and [`Graph::finish`].
    pub fn create_join(
        &mut self,
        first: Option<BlockId>,
        second: Option<BlockId>,
    ) -> Result<Option<BlockId>> {
        match (first, second) {
            (None, other) | (other, None) => Ok(other),
            (Some(first), Some(second)) => {
                let join = self.graph.create_block()?;
                self.graph.finish(first, Terminator::Goto(join))?;
                self.graph.finish(second, Terminator::Goto(join))?;
                Ok(Some(join))
            }
        }
    }

    /// Opens a loop header fed by the current block, jumps to it and makes it current.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::create_loop_header`] and [`Graph::finish`].
    pub fn loop_entry(&mut self) -> Result<BlockId> {
        let pre_header = self.current()?;
        let header = self.graph.create_loop_header(pre_header)?;
        self.graph.finish(pre_header, Terminator::Goto(header))?;
        self.current = Some(header);
        Ok(header)
    }

    /// Closes a loop opened with [`GraphBuilder::loop_entry`].
    ///
    /// Jumps from `body_exit` (if the body falls through) back to `header`, post-processes
    /// the header, and merges the normal loop exit into `break_block` when the loop has
    /// `break`s.
    ///
    /// # Arguments
    ///
    /// * `header` - The loop header returned by `loop_entry`
    /// * `body_exit` - The open block at the end of the body, if reachable
    /// * `loop_successor` - The open block reached when the loop condition fails
    /// * `break_block` - The block every `break` jumped to, if any
    /// * `marker` - Tag of the source construct
    ///
    /// # Returns
    ///
    /// The block following the loop, or `None` if the loop never exits normally.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::finish`] and
    /// [`Graph::post_process_loop_header`].
    pub fn create_loop(
        &mut self,
        header: BlockId,
        body_exit: Option<BlockId>,
        loop_successor: Option<BlockId>,
        break_block: Option<BlockId>,
        marker: LoopMarker,
    ) -> Result<Option<BlockId>> {
        if let Some(body_exit) = body_exit {
            self.graph.finish(body_exit, Terminator::Goto(header))?;
        }
        self.graph.post_process_loop_header(header, marker)?;

        match break_block {
            Some(break_block) => {
                if let Some(loop_successor) = loop_successor {
                    self.graph
                        .finish(loop_successor, Terminator::Goto(break_block))?;
                }
                Ok(Some(break_block))
            }
            None => Ok(loop_successor),
        }
    }

    /// Enters the scope of an inlined call.
    ///
    /// The top `argument_count` expression-stack entries of the current environment
    /// become the callee's parameters; the rest of the caller environment is kept as the
    /// outer scope.
    ///
    /// # Errors
    ///
    /// See [`Environment::copy_for_inlining`].
    pub fn enter_inlined(&mut self, argument_count: usize, local_count: usize) -> Result<()> {
        let undefined = self.graph.undefined();
        let inner = self
            .environment()?
            .copy_for_inlining(argument_count, local_count, undefined)?;
        *self.environment_mut()? = inner;
        Ok(())
    }

    /// Leaves the scope of an inlined call in the current block.
    ///
    /// Restores the caller environment, drops `drop_extra` further caller stack entries
    /// and pushes `result` if the call produced one.
    ///
    /// # Errors
    ///
    /// See [`Environment::discard_inlined`].
    pub fn leave_inlined(&mut self, result: Option<ValueId>, drop_extra: usize) -> Result<()> {
        let inner = self.environment()?.copy();
        let mut outer = inner.discard_inlined(drop_extra)?;
        if let Some(value) = result {
            outer.push(value);
        }
        *self.environment_mut()? = outer;
        Ok(())
    }

    /// Finalizes the graph and returns it.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the current block is still open, and otherwise
    /// propagates the errors of [`Graph::finalize`].
    pub fn finalize(mut self) -> Result<Graph> {
        if let Some(block) = self.current {
            return Err(invariant_error!(
                "current block {} is still open at finalization",
                block
            ));
        }
        self.graph.finalize()?;
        Ok(self.graph)
    }
}
