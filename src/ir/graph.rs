//! The control-flow graph of one compilation unit.
//!
//! [`Graph`] is the arena that owns every block, value, phi and loop record created for a
//! compilation unit. Entities refer to each other through the handles in
//! [`ids`](crate::ir::ids); nothing is reference-counted and nothing outlives the graph.
//!
//! # Construction
//!
//! The front end drives construction through a small set of calls:
//!
//! 1. [`Graph::create_block`] / [`Graph::create_loop_header`] open new blocks.
//! 2. [`Graph::add_instruction`] appends to an open block; the block's environment is
//!    reachable through [`Graph::environment_mut`].
//! 3. [`Graph::finish`] / [`Graph::finish_exit`] close a block. Closing registers the block
//!    as a predecessor of each successor, which is where environments are merged and phis
//!    are created.
//! 4. [`Graph::post_process_loop_header`] closes a loop once its back edges exist.
//!
//! Once the front end is done, [`Graph::finalize`] orders the blocks, assigns dominators
//! and (optionally) verifies the result.
//!
//! # Merging
//!
//! ```text
//!   first predecessor   -> adopt a copy of its environment
//!   further predecessor -> per slot: extend an existing phi of this block, or create a
//!                          phi when the incoming value differs from the current one
//!   loop header         -> phis exist for every slot; each edge appends one input
//! ```

use std::{collections::HashMap, fmt, ops::Index};

use tracing::trace;

use crate::{
    config::GraphConfig,
    ir::{
        ids::next_index, BasicBlock, BlockId, BlockState, Environment, Instruction,
        LoopId, LoopInformation, Opcode, Phi, PhiId, Terminator, ValueId, ValueKind,
    },
    Error, Result,
};

/// Blocks, values, phis and loops of one compilation unit.
///
/// # Examples
///
/// ```rust
/// use irgraph::prelude::*;
///
/// // if (p0) { x = 1 } else { x = 2 }; return x
/// let mut graph = Graph::new(1, 0, 1);
/// let entry = graph.entry();
/// let then_block = graph.create_block()?;
/// let else_block = graph.create_block()?;
/// let join = graph.create_block()?;
///
/// let p0 = graph.environment(entry).unwrap().parameter(0)?;
/// graph.finish(entry, Terminator::Branch { condition: p0, if_true: then_block, if_false: else_block })?;
///
/// let one = graph.constant(1);
/// graph.environment_mut(then_block)?.bind_local(0, one)?;
/// graph.finish(then_block, Terminator::Goto(join))?;
///
/// let two = graph.constant(2);
/// graph.environment_mut(else_block)?.bind_local(0, two)?;
/// graph.finish(else_block, Terminator::Goto(join))?;
///
/// let x = graph.environment(join).unwrap().local(0)?;
/// assert!(graph.value_kind(x).unwrap().is_phi());
/// graph.finish_exit(join, Terminator::Return(Some(x)))?;
///
/// graph.finalize()?;
/// assert_eq!(graph[join].dominator(), Some(entry));
/// # Ok::<(), irgraph::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) config: GraphConfig,
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) values: Vec<ValueKind>,
    pub(crate) phis: Vec<Phi>,
    pub(crate) loops: Vec<LoopInformation>,
    pub(crate) entry: BlockId,
    /// Final block order; empty until [`Graph::order_blocks`] ran.
    pub(crate) ordered: Vec<BlockId>,
    /// Dense id handed to the next created block.
    next_id: usize,
    undefined: ValueId,
    constants: HashMap<i64, ValueId>,
}

impl Graph {
    /// Creates a graph with the default configuration.
    ///
    /// The entry block is created immediately. Its environment binds every parameter slot
    /// to a fresh [`ValueKind::Parameter`] value and every other slot to the graph's
    /// `undefined` value.
    ///
    /// # Arguments
    ///
    /// * `parameter_count` - Number of formal parameters
    /// * `specials_count` - Number of special slots (receiver, context, ...)
    /// * `local_count` - Number of local variables
    #[must_use]
    pub fn new(parameter_count: usize, specials_count: usize, local_count: usize) -> Self {
        Self::with_config(
            GraphConfig::default(),
            parameter_count,
            specials_count,
            local_count,
        )
    }

    /// Creates a graph with an explicit configuration.
    ///
    /// See [`Graph::new`].
    #[must_use]
    pub fn with_config(
        config: GraphConfig,
        parameter_count: usize,
        specials_count: usize,
        local_count: usize,
    ) -> Self {
        let undefined = ValueId::new(0);
        let mut graph = Self {
            config,
            blocks: Vec::new(),
            values: vec![ValueKind::Undefined],
            phis: Vec::new(),
            loops: Vec::new(),
            entry: BlockId::new(0),
            ordered: Vec::new(),
            next_id: 0,
            undefined,
            constants: HashMap::new(),
        };

        let mut environment =
            Environment::new(parameter_count, specials_count, local_count, undefined);
        for (n, slot) in environment.values_mut()[..parameter_count]
            .iter_mut()
            .enumerate()
        {
            let index = u32::try_from(n).unwrap_or(u32::MAX);
            *slot = graph.new_value(ValueKind::Parameter(index));
        }

        let entry = graph.allocate_block();
        graph.blocks[entry.index()].environment = Some(environment);
        graph.entry = entry;
        graph
    }

    /// Returns the configuration this graph was created with.
    #[must_use]
    pub const fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Returns the entry block.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Returns the number of blocks ever created, reachable or not.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block behind `id`, if it belongs to this graph.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Returns every block in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    /// Returns the phi behind `id`.
    #[must_use]
    pub fn phi(&self, id: PhiId) -> Option<&Phi> {
        self.phis.get(id.index())
    }

    /// Returns the loop-information record behind `id`.
    ///
    /// Records of detached (degenerate) loops stay accessible.
    #[must_use]
    pub fn loop_information(&self, id: LoopId) -> Option<&LoopInformation> {
        self.loops.get(id.index())
    }

    /// Returns every loop-information record in creation order.
    pub fn loops(&self) -> impl Iterator<Item = &LoopInformation> {
        self.loops.iter()
    }

    /// Returns the origin of `value`.
    #[must_use]
    pub fn value_kind(&self, value: ValueId) -> Option<ValueKind> {
        self.values.get(value.index()).copied()
    }

    /// Returns the number of values.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Returns the value shared by every unassigned slot.
    #[must_use]
    pub const fn undefined(&self) -> ValueId {
        self.undefined
    }

    /// Returns the interned value of the constant `value`.
    pub fn constant(&mut self, value: i64) -> ValueId {
        if let Some(&id) = self.constants.get(&value) {
            return id;
        }
        let id = self.new_value(ValueKind::Constant(value));
        self.constants.insert(value, id);
        id
    }

    /// Returns the value defined by parameter `n`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the graph has fewer than `n + 1` parameters.
    pub fn parameter(&self, n: usize) -> Result<ValueId> {
        let wanted = u32::try_from(n).unwrap_or(u32::MAX);
        self.values
            .iter()
            .position(|kind| *kind == ValueKind::Parameter(wanted))
            .map(|index| ValueId::new(next_index(index)))
            .ok_or_else(|| invariant_error!("parameter {} does not exist", n))
    }

    /// Opens a new, empty block.
    ///
    /// The block has no environment until its first predecessor is registered (or one is
    /// installed with [`Graph::set_environment`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhaustion`] if the graph already holds
    /// [`GraphConfig::max_blocks`] blocks.
    pub fn create_block(&mut self) -> Result<BlockId> {
        if self.blocks.len() >= self.config.max_blocks {
            return Err(Error::ResourceExhaustion {
                resource: "blocks",
                limit: self.config.max_blocks,
            });
        }
        Ok(self.allocate_block())
    }

    /// Opens a loop header whose environment is a copy of `pre_header`'s.
    ///
    /// Every slot of the new environment is replaced by a phi, so the loop body sees the
    /// phis and the back edges only have to append their inputs. Each phi's first input is
    /// the value the slot has in `pre_header`; it is refreshed when `pre_header` actually
    /// jumps to the header, so the pre-header may keep rebinding slots until then. The
    /// caller still has to jump from `pre_header` to the header, and to call
    /// [`Graph::post_process_loop_header`] once the body is built.
    ///
    /// # Errors
    ///
    /// - [`Error::InvariantViolation`] if `pre_header` has no environment.
    /// - [`Error::ResourceExhaustion`] if the block budget is exhausted.
    pub fn create_loop_header(&mut self, pre_header: BlockId) -> Result<BlockId> {
        let mut environment = self
            .block_ref(pre_header)?
            .environment
            .as_ref()
            .ok_or_else(|| invariant_error!("loop pre-header {} has no environment", pre_header))?
            .copy_without_history();
        let header = self.create_block()?;

        for index in 0..environment.length() {
            let phi = self.add_phi(header, index);
            let incoming = environment.values()[index];
            self.phis[phi.index()].add_input(incoming);
            environment.values_mut()[index] = self.phis[phi.index()].value();
        }

        let loop_id = LoopId::new(next_index(self.loops.len()));
        self.loops
            .push(LoopInformation::new(loop_id, header, pre_header));
        let block = &mut self.blocks[header.index()];
        block.environment = Some(environment);
        block.loop_information = Some(loop_id);
        trace!(%header, %pre_header, "created loop header");
        Ok(header)
    }

    /// Appends an instruction to an open block and returns the value it defines.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBlock`] / [`Error::InvalidValue`] for foreign handles.
    /// - [`Error::InvariantViolation`] if the block is already finished.
    pub fn add_instruction(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        operands: Vec<ValueId>,
    ) -> Result<ValueId> {
        let target = self.block_ref(block)?;
        if !target.is_open() {
            return Err(invariant_error!(
                "cannot add {} to finished block {}",
                opcode,
                block
            ));
        }
        let position = next_index(target.instructions.len());
        for &operand in &operands {
            self.check_value(operand)?;
        }

        let result = self.new_value(ValueKind::Instruction { block, position });
        self.blocks[block.index()]
            .instructions
            .push(Instruction::new(result, opcode, operands));
        Ok(result)
    }

    /// Closes `block` with `terminator` and registers it as a predecessor of each
    /// successor, merging its environment into theirs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidBlock`] / [`Error::InvalidValue`] for foreign handles.
    /// - [`Error::InvariantViolation`] if the block is already finished, branches to the
    ///   same block twice, or a successor cannot accept another predecessor. A loop header
    ///   accepts its pre-header as first predecessor and further predecessors only until
    ///   it is post-processed.
    pub fn finish(&mut self, block: BlockId, terminator: Terminator) -> Result<()> {
        if !self.block_ref(block)?.is_open() {
            return Err(invariant_error!("block {} finished twice", block));
        }
        if let Some(operand) = terminator.operand() {
            self.check_value(operand)?;
        }
        let mut successors = terminator.successors();
        if let (Some(first), Some(second)) = (successors.next(), successors.next()) {
            if first == second {
                return Err(invariant_error!(
                    "block {} branches to {} on both edges",
                    block,
                    first
                ));
            }
        }
        for successor in terminator.successors() {
            self.block_ref(successor)?;
        }

        let target = &mut self.blocks[block.index()];
        target.terminator = Some(terminator);
        target.state = BlockState::Finished;

        for successor in terminator.successors() {
            self.register_predecessor(successor, block)?;
        }
        Ok(())
    }

    /// Closes `block` like [`Graph::finish`] and discards its environment.
    ///
    /// Used for blocks leaving the compilation unit, where no dataflow continues.
    ///
    /// # Errors
    ///
    /// See [`Graph::finish`].
    pub fn finish_exit(&mut self, block: BlockId, terminator: Terminator) -> Result<()> {
        self.finish(block, terminator)?;
        self.blocks[block.index()].environment = None;
        Ok(())
    }

    /// Returns the working environment of `block`.
    #[must_use]
    pub fn environment(&self, block: BlockId) -> Option<&Environment> {
        self.blocks.get(block.index())?.environment.as_ref()
    }

    /// Returns a deep copy of the working environment of `block`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the block has no environment.
    pub fn environment_snapshot(&self, block: BlockId) -> Result<Environment> {
        self.block_ref(block)?
            .environment
            .as_ref()
            .map(Environment::copy)
            .ok_or_else(|| invariant_error!("block {} has no environment", block))
    }

    /// Returns the working environment of an open block for modification.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the block is finished or has no environment.
    pub fn environment_mut(&mut self, block: BlockId) -> Result<&mut Environment> {
        let target = self.block_mut(block)?;
        if !target.is_open() {
            return Err(invariant_error!(
                "environment of finished block {} is frozen",
                block
            ));
        }
        target
            .environment
            .as_mut()
            .ok_or_else(|| invariant_error!("block {} has no environment", block))
    }

    /// Installs the initial environment of an open block that has no predecessors yet.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the block is finished, already has predecessors,
    /// or the environment references unknown values.
    pub fn set_environment(&mut self, block: BlockId, environment: Environment) -> Result<()> {
        for &value in environment.values() {
            self.check_value(value)?;
        }
        let target = self.block_mut(block)?;
        if !target.is_open() || !target.predecessors.is_empty() {
            return Err(invariant_error!(
                "initial environment of {} set after construction started",
                block
            ));
        }
        target.environment = Some(environment);
        Ok(())
    }

    /// Returns `true` if `dominator` strictly dominates `block`.
    ///
    /// Only meaningful after dominator assignment.
    #[must_use]
    pub fn dominates(&self, dominator: BlockId, block: BlockId) -> bool {
        let mut current = self.block(block).and_then(BasicBlock::dominator);
        while let Some(candidate) = current {
            if candidate == dominator {
                return true;
            }
            current = self.block(candidate).and_then(BasicBlock::dominator);
        }
        false
    }

    /// Returns `true` if `dominator == block` or `dominator` dominates `block`.
    #[must_use]
    pub fn equal_to_or_dominates(&self, dominator: BlockId, block: BlockId) -> bool {
        dominator == block || self.dominates(dominator, block)
    }

    /// Returns the number of loops enclosing `block`, counting `block` itself if it is a
    /// loop header.
    #[must_use]
    pub fn loop_nesting_depth(&self, block: BlockId) -> usize {
        let Some(data) = self.block(block) else {
            return 0;
        };
        let mut depth = usize::from(data.is_loop_header());
        let mut current = data.parent_loop_header;
        while let Some(header) = current {
            depth += 1;
            current = self.block(header).and_then(BasicBlock::parent_loop_header);
        }
        depth
    }

    /// Returns the blocks in final order, or an empty slice before ordering.
    #[must_use]
    pub fn ordered_blocks(&self) -> &[BlockId] {
        &self.ordered
    }

    /// Returns `true` once [`Graph::order_blocks`] has run.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        !self.ordered.is_empty()
    }

    /// Orders the blocks, assigns dominators and, when [`GraphConfig::verify`] is set,
    /// verifies the result.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Graph::order_blocks`], [`Graph::assign_dominators`] and
    /// [`Graph::verify`].
    pub fn finalize(&mut self) -> Result<()> {
        self.order_blocks()?;
        self.assign_dominators()?;
        if self.config.verify {
            self.verify()?;
        }
        Ok(())
    }

    pub(crate) fn block_ref(&self, id: BlockId) -> Result<&BasicBlock> {
        self.blocks.get(id.index()).ok_or(Error::InvalidBlock(id))
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock> {
        self.blocks.get_mut(id.index()).ok_or(Error::InvalidBlock(id))
    }

    pub(crate) fn loop_ref(&self, id: LoopId) -> Result<&LoopInformation> {
        self.loops
            .get(id.index())
            .ok_or_else(|| invariant_error!("unknown loop {}", id))
    }

    pub(crate) fn loop_mut(&mut self, id: LoopId) -> Result<&mut LoopInformation> {
        self.loops
            .get_mut(id.index())
            .ok_or_else(|| invariant_error!("unknown loop {}", id))
    }

    /// Dense id of a block known to exist.
    pub(crate) fn dense_id(&self, id: BlockId) -> usize {
        self.blocks.get(id.index()).map_or(usize::MAX, |b| b.id)
    }

    fn check_value(&self, value: ValueId) -> Result<()> {
        if value.index() < self.values.len() {
            Ok(())
        } else {
            Err(Error::InvalidValue(value))
        }
    }

    fn new_value(&mut self, kind: ValueKind) -> ValueId {
        let id = ValueId::new(next_index(self.values.len()));
        self.values.push(kind);
        id
    }

    fn allocate_block(&mut self) -> BlockId {
        let handle = BlockId::new(next_index(self.blocks.len()));
        self.blocks.push(BasicBlock::new(handle, self.next_id));
        self.next_id += 1;
        handle
    }

    /// Creates an empty phi for environment slot `index` of `block`.
    fn add_phi(&mut self, block: BlockId, index: usize) -> PhiId {
        let id = PhiId::new(next_index(self.phis.len()));
        let value = self.new_value(ValueKind::Phi(id));
        self.phis.push(Phi::new(id, value, block, index));
        self.blocks[block.index()].phis.push(id);
        id
    }

    /// Returns the phi behind `value` if it is owned by `block`.
    fn phi_owned_by(&self, value: ValueId, block: BlockId) -> Option<PhiId> {
        let phi = self.values.get(value.index())?.as_phi()?;
        (self.phis.get(phi.index())?.block() == block).then_some(phi)
    }

    /// Records `pred` as a new predecessor of `block` and merges its environment.
    pub(crate) fn register_predecessor(&mut self, block: BlockId, pred: BlockId) -> Result<()> {
        let target = self.block_ref(block)?;
        if target.is_ordered() {
            return Err(invariant_error!(
                "predecessor {} registered on ordered block {}",
                pred,
                block
            ));
        }
        if target.is_finished() && !target.is_loop_header() {
            return Err(invariant_error!(
                "predecessor {} registered on finished block {}",
                pred,
                block
            ));
        }
        if let Some(loop_id) = target.loop_information {
            if self.loop_ref(loop_id)?.is_post_processed() {
                return Err(invariant_error!(
                    "predecessor {} registered on loop header {} after post-processing",
                    pred,
                    block
                ));
            }
        }
        let loop_id = target.loop_information;
        let has_predecessor = !target.predecessors.is_empty();
        let has_instructions = !target.instructions.is_empty();

        let incoming = self
            .block_ref(pred)?
            .environment
            .clone()
            .ok_or_else(|| invariant_error!("predecessor {} of {} has no environment", pred, block))?;

        match (loop_id, has_predecessor) {
            (Some(_), true) => self.append_loop_phi_inputs(block, &incoming)?,
            (Some(loop_id), false) => {
                let pre_header = self.loop_ref(loop_id)?.pre_header();
                if pred != pre_header {
                    return Err(invariant_error!(
                        "loop header {} entered from {} before its pre-header {}",
                        block,
                        pred,
                        pre_header
                    ));
                }
                self.bind_loop_entry_inputs(block, &incoming)?;
            }
            (None, true) => {
                if has_instructions {
                    return Err(invariant_error!(
                        "join block {} gained predecessor {} after instructions were added",
                        block,
                        pred
                    ));
                }
                self.add_incoming_edge(block, &incoming)?;
            }
            (None, false) => {
                let agrees = self.blocks[block.index()]
                    .environment
                    .as_ref()
                    .map(|installed| installed.values() == incoming.values());
                match agrees {
                    None => {
                        self.blocks[block.index()].environment =
                            Some(incoming.copy_without_history());
                    }
                    Some(false) => {
                        return Err(invariant_error!(
                            "installed environment of {} disagrees with its first predecessor {}",
                            block,
                            pred
                        ));
                    }
                    Some(true) => {}
                }
            }
        }

        self.blocks[block.index()].predecessors.push(pred);
        Ok(())
    }

    /// Merges `incoming` into the environment of join block `block`.
    fn add_incoming_edge(&mut self, block: BlockId, incoming: &Environment) -> Result<()> {
        let mut environment = self.blocks[block.index()]
            .environment
            .take()
            .ok_or_else(|| invariant_error!("join block {} has no environment", block))?;
        let result = self.merge_environment(block, &mut environment, incoming);
        self.blocks[block.index()].environment = Some(environment);
        result
    }

    fn merge_environment(
        &mut self,
        block: BlockId,
        environment: &mut Environment,
        incoming: &Environment,
    ) -> Result<()> {
        if !environment.structurally_matches(incoming) {
            return Err(invariant_error!(
                "environment length mismatch at {}: {} vs {}",
                block,
                environment.length(),
                incoming.length()
            ));
        }
        let edges = self.blocks[block.index()].predecessors.len();

        for (index, &new_value) in incoming.values().iter().enumerate() {
            let old_value = environment.values()[index];
            if let Some(phi) = self.phi_owned_by(old_value, block) {
                let inputs = self.phis[phi.index()].input_count();
                if inputs != edges {
                    return Err(invariant_error!(
                        "phi {} at {} has {} inputs for {} predecessors",
                        phi,
                        block,
                        inputs,
                        edges
                    ));
                }
                self.phis[phi.index()].add_input(new_value);
            } else if old_value != new_value {
                let phi = self.add_phi(block, index);
                let data = &mut self.phis[phi.index()];
                for _ in 0..edges {
                    data.add_input(old_value);
                }
                data.add_input(new_value);
                environment.values_mut()[index] = data.value();
                trace!(%block, slot = index, %phi, "created phi");
            }
        }
        Ok(())
    }

    /// Rebinds the first input of every slot phi of `header` to the value arriving from
    /// its pre-header.
    fn bind_loop_entry_inputs(&mut self, header: BlockId, incoming: &Environment) -> Result<()> {
        let phis = self.blocks[header.index()].phis.clone();
        if phis.len() != incoming.length() {
            return Err(invariant_error!(
                "loop header {} has {} phis but its pre-header environment has {} slots",
                header,
                phis.len(),
                incoming.length()
            ));
        }
        for phi in phis {
            let data = &mut self.phis[phi.index()];
            let slot = data
                .merged_index()
                .ok_or_else(|| invariant_error!("loop phi {} lost its slot", phi))?;
            data.set_input(0, incoming.lookup(slot)?)?;
        }
        Ok(())
    }

    /// Appends the values of a further edge into a loop header to its slot phis.
    fn append_loop_phi_inputs(&mut self, header: BlockId, incoming: &Environment) -> Result<()> {
        let phis = self.blocks[header.index()].phis.clone();
        let edges = self.blocks[header.index()].predecessors.len();
        if phis.len() != incoming.length() {
            return Err(invariant_error!(
                "loop header {} has {} phis but incoming environment has {} slots",
                header,
                phis.len(),
                incoming.length()
            ));
        }
        for phi in phis {
            let data = &mut self.phis[phi.index()];
            let slot = data
                .merged_index()
                .ok_or_else(|| invariant_error!("loop phi {} lost its slot", phi))?;
            if data.input_count() != edges {
                return Err(invariant_error!(
                    "loop phi {} has {} inputs for {} predecessors",
                    phi,
                    data.input_count(),
                    edges
                ));
            }
            data.add_input(incoming.lookup(slot)?);
        }
        Ok(())
    }
}

impl Index<BlockId> for Graph {
    type Output = BasicBlock;

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    fn index(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }
}

impl Index<PhiId> for Graph {
    type Output = Phi;

    fn index(&self, id: PhiId) -> &Phi {
        &self.phis[id.index()]
    }
}

impl Index<LoopId> for Graph {
    type Output = LoopInformation;

    fn index(&self, id: LoopId) -> &LoopInformation {
        &self.loops[id.index()]
    }
}

impl Graph {
    /// Writes `B<id>` for placed blocks and the arena handle otherwise.
    fn write_block_ref(&self, f: &mut fmt::Formatter<'_>, block: BlockId) -> fmt::Result {
        match self.block(block) {
            Some(data) if data.is_placed() => write!(f, "B{}", data.id),
            _ => write!(f, "{block}"),
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order: Vec<BlockId> = if self.ordered.is_empty() {
            self.blocks.iter().map(BasicBlock::handle).collect()
        } else {
            self.ordered.clone()
        };

        for handle in order {
            let block = &self.blocks[handle.index()];
            write!(f, "{block}")?;
            if !block.predecessors.is_empty() {
                write!(f, " <-")?;
                for &pred in &block.predecessors {
                    write!(f, " ")?;
                    self.write_block_ref(f, pred)?;
                }
            }
            if let Some(dominator) = block.dominator {
                write!(f, " idom=")?;
                self.write_block_ref(f, dominator)?;
            }
            if let Some(header) = block.parent_loop_header {
                write!(f, " loop=")?;
                self.write_block_ref(f, header)?;
            }
            writeln!(f)?;
            for phi in &block.phis {
                writeln!(f, "    {}", self.phis[phi.index()])?;
            }
            for instruction in &block.instructions {
                writeln!(f, "    {instruction}")?;
            }
            if let Some(terminator) = &block.terminator {
                writeln!(f, "    {terminator}")?;
            }
        }
        Ok(())
    }
}
