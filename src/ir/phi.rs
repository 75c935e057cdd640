//! Phi (merge) nodes.
//!
//! A phi lives at the entry of a block with several predecessors and selects one of its
//! inputs depending on which predecessor control arrived from. Unlike classic SSA
//! construction from a finished CFG, phis here are created *while* the graph is being
//! built: a phi appears the first time two different values reach the same environment
//! slot of a join block (or eagerly, for every slot, when a loop header is created).
//!
//! # Input Alignment
//!
//! Inputs are positional. Input `i` is the value live on the edge from the block's
//! `i`-th registered predecessor. Once the owning block's predecessor list is complete,
//! `inputs().len() == predecessors().len()`.

use std::fmt;

use crate::{
    ir::{BlockId, PhiId, ValueId},
    Result,
};

/// A phi node merging one environment slot at a join block.
///
/// # Examples
///
/// ```rust,ignore
/// // v7 = phi(v1, v4) at b3, merging slot 2
/// let phi = graph.phi(phi_id);
/// assert_eq!(phi.merged_index(), Some(2));
/// assert_eq!(phi.inputs().len(), graph.block(phi.block()).predecessors().len());
/// ```
#[derive(Debug, Clone)]
pub struct Phi {
    /// Handle of this phi.
    id: PhiId,
    /// Value defined by this phi.
    value: ValueId,
    /// Block owning this phi.
    block: BlockId,
    /// Environment slot this phi stands for.
    merged_index: Option<usize>,
    /// One input per predecessor edge, in predecessor-registration order.
    inputs: Vec<ValueId>,
}

impl Phi {
    pub(crate) fn new(id: PhiId, value: ValueId, block: BlockId, merged_index: usize) -> Self {
        Self {
            id,
            value,
            block,
            merged_index: Some(merged_index),
            inputs: Vec::new(),
        }
    }

    /// Returns the handle of this phi.
    #[must_use]
    pub const fn id(&self) -> PhiId {
        self.id
    }

    /// Returns the value defined by this phi.
    #[must_use]
    pub const fn value(&self) -> ValueId {
        self.value
    }

    /// Returns the block owning this phi.
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// Returns the environment slot this phi merges.
    ///
    /// Passes that reuse a phi for something other than an environment slot may clear
    /// the index with [`Phi::clear_merged_index`].
    #[must_use]
    pub const fn merged_index(&self) -> Option<usize> {
        self.merged_index
    }

    /// Forgets the environment slot association.
    pub fn clear_merged_index(&mut self) {
        self.merged_index = None;
    }

    /// Returns the inputs, one per predecessor edge.
    #[must_use]
    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    /// Returns the input arriving over predecessor edge `index`.
    #[must_use]
    pub fn input_at(&self, index: usize) -> Option<ValueId> {
        self.inputs.get(index).copied()
    }

    /// Returns the number of inputs.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Returns `true` if every input is the same value, ignoring self-references.
    ///
    /// Such a phi is redundant: it always evaluates to that single value. Loop-header
    /// phis for slots the loop never assigns look like this after the back edge is added.
    #[must_use]
    pub fn is_redundant(&self) -> bool {
        let mut distinct = self.inputs.iter().filter(|&&input| input != self.value);
        match distinct.next() {
            Some(first) => distinct.all(|input| input == first),
            None => true,
        }
    }

    pub(crate) fn add_input(&mut self, value: ValueId) {
        self.inputs.push(value);
    }

    pub(crate) fn set_input(&mut self, index: usize, value: ValueId) -> Result<()> {
        let (id, count) = (self.id, self.inputs.len());
        let slot = self.inputs.get_mut(index).ok_or_else(|| {
            invariant_error!("phi {} has no input {} ({} inputs)", id, index, count)
        })?;
        *slot = value;
        Ok(())
    }
}

impl fmt::Display for Phi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = phi(", self.value)?;
        for (i, input) in self.inputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{input}")?;
        }
        write!(f, ")")?;
        if let Some(index) = self.merged_index {
            write!(f, " [slot {index}]")?;
        }
        Ok(())
    }
}
