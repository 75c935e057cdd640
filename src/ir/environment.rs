//! Environments: the slot-to-value binding at a point during graph construction.
//!
//! An [`Environment`] is a flat vector of values indexed by slot. The slots are laid out
//! in four consecutive regions:
//!
//! ```text
//! [ parameters | specials | locals | expression stack ... ]
//!   0..p         p..p+s     ..+l     grows with push/pop
//! ```
//!
//! Every open block under construction owns one environment. When a block is closed its
//! environment is handed to its successors: the first predecessor of a join donates a
//! copy, later predecessors are merged slot by slot, creating phis where the values
//! differ. Merging therefore requires both environments to have the same length, which is
//! the structural invariant checked at every join.
//!
//! # Inlining
//!
//! An inlined call gets its own nested environment. [`Environment::copy_for_inlining`]
//! moves the call arguments from the caller's expression stack into the callee's parameter
//! slots and keeps a copy of the caller's remaining environment as the `outer` scope.
//! [`Environment::discard_inlined`] returns to that outer scope when the callee is done.
//!
//! # History
//!
//! Each environment records which slots were assigned since the last
//! [`Environment::clear_history`]. Copies made for a new block usually start with a clean
//! history ([`Environment::copy_without_history`]).

use std::fmt;

use crate::{ir::ValueId, Result};

/// Slot-to-value binding for one scope, optionally nested in an outer (caller) scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Current value of every slot.
    values: Vec<ValueId>,
    /// Number of parameter slots.
    parameter_count: usize,
    /// Number of special slots (receiver, context, ...).
    specials_count: usize,
    /// Number of local variable slots.
    local_count: usize,
    /// Slots bound since the last history reset, in first-assignment order.
    assigned_variables: Vec<usize>,
    /// Values pushed since the last history reset.
    push_count: usize,
    /// Values popped since the last history reset.
    pop_count: usize,
    /// Caller scope when this environment belongs to an inlined call.
    outer: Option<Box<Environment>>,
}

impl Environment {
    /// Creates an environment with every slot bound to `fill` and an empty expression stack.
    ///
    /// # Arguments
    ///
    /// * `parameter_count` - Number of parameter slots
    /// * `specials_count` - Number of special slots
    /// * `local_count` - Number of local variable slots
    /// * `fill` - Initial value of every slot
    #[must_use]
    pub fn new(
        parameter_count: usize,
        specials_count: usize,
        local_count: usize,
        fill: ValueId,
    ) -> Self {
        Self {
            values: vec![fill; parameter_count + specials_count + local_count],
            parameter_count,
            specials_count,
            local_count,
            assigned_variables: Vec::new(),
            push_count: 0,
            pop_count: 0,
            outer: None,
        }
    }

    /// Returns the total number of slots, including the expression stack.
    #[must_use]
    pub fn length(&self) -> usize {
        self.values.len()
    }

    /// Returns all slot values.
    #[must_use]
    pub fn values(&self) -> &[ValueId] {
        &self.values
    }

    /// Returns the number of parameter slots.
    #[must_use]
    pub const fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Returns the number of special slots.
    #[must_use]
    pub const fn specials_count(&self) -> usize {
        self.specials_count
    }

    /// Returns the number of local variable slots.
    #[must_use]
    pub const fn local_count(&self) -> usize {
        self.local_count
    }

    /// Returns the slot index of the first expression-stack entry.
    #[must_use]
    pub const fn first_expression_index(&self) -> usize {
        self.parameter_count + self.specials_count + self.local_count
    }

    /// Returns the current height of the expression stack.
    #[must_use]
    pub fn expression_height(&self) -> usize {
        self.values.len() - self.first_expression_index()
    }

    /// Returns the slot index of parameter `n`.
    #[must_use]
    pub const fn parameter_index(&self, n: usize) -> usize {
        n
    }

    /// Returns the slot index of special slot `n`.
    #[must_use]
    pub const fn special_index(&self, n: usize) -> usize {
        self.parameter_count + n
    }

    /// Returns the slot index of local `n`.
    #[must_use]
    pub const fn local_index(&self, n: usize) -> usize {
        self.parameter_count + self.specials_count + n
    }

    /// Returns the value bound to `index`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `index` is out of range.
    pub fn lookup(&self, index: usize) -> Result<ValueId> {
        self.values.get(index).copied().ok_or_else(|| {
            invariant_error!(
                "lookup of slot {} in environment of length {}",
                index,
                self.values.len()
            )
        })
    }

    /// Binds `value` to slot `index`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `index` is out of range.
    pub fn bind(&mut self, index: usize, value: ValueId) -> Result<()> {
        let length = self.values.len();
        let slot = self.values.get_mut(index).ok_or_else(|| {
            invariant_error!("bind of slot {} in environment of length {}", index, length)
        })?;
        *slot = value;
        if !self.assigned_variables.contains(&index) {
            self.assigned_variables.push(index);
        }
        Ok(())
    }

    /// Binds `value` to local `n`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `n` is not a local of this environment.
    pub fn bind_local(&mut self, n: usize, value: ValueId) -> Result<()> {
        if n >= self.local_count {
            return Err(invariant_error!(
                "local {} out of range ({} locals)",
                n,
                self.local_count
            ));
        }
        self.bind(self.local_index(n), value)
    }

    /// Returns the value of local `n`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `n` is not a local of this environment.
    pub fn local(&self, n: usize) -> Result<ValueId> {
        if n >= self.local_count {
            return Err(invariant_error!(
                "local {} out of range ({} locals)",
                n,
                self.local_count
            ));
        }
        self.lookup(self.local_index(n))
    }

    /// Returns the value of parameter `n`.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `n` is not a parameter of this environment.
    pub fn parameter(&self, n: usize) -> Result<ValueId> {
        if n >= self.parameter_count {
            return Err(invariant_error!(
                "parameter {} out of range ({} parameters)",
                n,
                self.parameter_count
            ));
        }
        self.lookup(self.parameter_index(n))
    }

    /// Pushes `value` onto the expression stack.
    pub fn push(&mut self, value: ValueId) {
        self.push_count += 1;
        self.values.push(value);
    }

    /// Pops the top of the expression stack.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the expression stack is empty.
    pub fn pop(&mut self) -> Result<ValueId> {
        if self.expression_height() == 0 {
            return Err(invariant_error!("pop from empty expression stack"));
        }
        self.pop_count += 1;
        self.values
            .pop()
            .ok_or_else(|| invariant_error!("pop from empty expression stack"))
    }

    /// Returns the top of the expression stack without removing it.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the expression stack is empty.
    pub fn top(&self) -> Result<ValueId> {
        self.expression_at(0)
    }

    /// Returns the expression-stack entry `depth` positions below the top.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the stack is not that deep.
    pub fn expression_at(&self, depth: usize) -> Result<ValueId> {
        if depth >= self.expression_height() {
            return Err(invariant_error!(
                "expression stack access at depth {} with height {}",
                depth,
                self.expression_height()
            ));
        }
        Ok(self.values[self.values.len() - 1 - depth])
    }

    /// Removes `count` entries from the expression stack.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the stack holds fewer than `count` entries.
    pub fn drop_values(&mut self, count: usize) -> Result<()> {
        if count > self.expression_height() {
            return Err(invariant_error!(
                "drop of {} values with expression height {}",
                count,
                self.expression_height()
            ));
        }
        self.pop_count += count;
        self.values.truncate(self.values.len() - count);
        Ok(())
    }

    /// Returns the slots assigned since the last history reset.
    #[must_use]
    pub fn assigned_variables(&self) -> &[usize] {
        &self.assigned_variables
    }

    /// Returns the number of values pushed since the last history reset.
    #[must_use]
    pub const fn push_count(&self) -> usize {
        self.push_count
    }

    /// Returns the number of values popped since the last history reset.
    #[must_use]
    pub const fn pop_count(&self) -> usize {
        self.pop_count
    }

    /// Forgets the assignment and push/pop history.
    pub fn clear_history(&mut self) {
        self.assigned_variables.clear();
        self.push_count = 0;
        self.pop_count = 0;
    }

    /// Returns a deep copy of this environment, including its outer scopes and history.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Returns a deep copy with an empty history.
    #[must_use]
    pub fn copy_without_history(&self) -> Self {
        let mut result = self.clone();
        result.clear_history();
        result
    }

    /// Returns `true` if `other` has the same shape, so the two can be merged at a join.
    #[must_use]
    pub fn structurally_matches(&self, other: &Environment) -> bool {
        self.values.len() == other.values.len()
            && self.parameter_count == other.parameter_count
            && self.specials_count == other.specials_count
            && self.local_count == other.local_count
    }

    pub(crate) fn values_mut(&mut self) -> &mut [ValueId] {
        &mut self.values
    }

    /// Creates the environment of an inlined callee.
    ///
    /// The top `argument_count` expression-stack entries become the callee's parameters
    /// (in push order). The caller's environment, minus those entries, is kept as the
    /// callee's outer scope. Callee locals start out bound to `undefined`.
    ///
    /// # Arguments
    ///
    /// * `argument_count` - Number of call arguments on the expression stack
    /// * `local_count` - Number of callee locals
    /// * `undefined` - Initial value of the callee locals
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the expression stack holds fewer than
    /// `argument_count` entries.
    pub fn copy_for_inlining(
        &self,
        argument_count: usize,
        local_count: usize,
        undefined: ValueId,
    ) -> Result<Self> {
        let mut outer = self.copy_without_history();
        if argument_count > outer.expression_height() {
            return Err(invariant_error!(
                "inlined call expects {} arguments, expression height is {}",
                argument_count,
                outer.expression_height()
            ));
        }
        let split = outer.values.len() - argument_count;
        let arguments = outer.values.split_off(split);

        let mut inner = Environment::new(argument_count, 0, local_count, undefined);
        inner.values[..argument_count].copy_from_slice(&arguments);
        inner.outer = Some(Box::new(outer));
        Ok(inner)
    }

    /// Leaves an inlined scope, returning the caller environment.
    ///
    /// # Arguments
    ///
    /// * `drop_extra` - Number of additional caller expression-stack entries to discard
    ///   (for example the callee function pushed before its arguments)
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if this environment is not an inlined scope, or the
    /// caller stack holds fewer than `drop_extra` entries.
    pub fn discard_inlined(self, drop_extra: usize) -> Result<Self> {
        let mut outer = self
            .outer
            .ok_or_else(|| invariant_error!("discard_inlined on an outermost environment"))?;
        outer.drop_values(drop_extra)?;
        Ok(*outer)
    }

    /// Returns the caller scope, if this environment belongs to an inlined call.
    #[must_use]
    pub fn outer(&self) -> Option<&Environment> {
        self.outer.as_deref()
    }

    /// Returns the number of enclosing scopes.
    #[must_use]
    pub fn inlining_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.outer.as_deref();
        while let Some(env) = current {
            depth += 1;
            current = env.outer.as_deref();
        }
        depth
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let regions = [
            ("p", 0, self.parameter_count),
            (
                "s",
                self.parameter_count,
                self.parameter_count + self.specials_count,
            ),
            (
                "l",
                self.parameter_count + self.specials_count,
                self.first_expression_index(),
            ),
            ("e", self.first_expression_index(), self.values.len()),
        ];
        write!(f, "[")?;
        for (i, (name, start, end)) in regions.iter().enumerate() {
            if i > 0 {
                write!(f, " |")?;
            }
            write!(f, " {name}:")?;
            for value in &self.values[*start..*end] {
                write!(f, " {value}")?;
            }
        }
        write!(f, " ]")?;
        if let Some(outer) = &self.outer {
            write!(f, " <- {outer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn v(n: u32) -> ValueId {
        ValueId::new(n)
    }

    #[test]
    fn test_environment_layout() {
        let env = Environment::new(2, 1, 3, v(0));
        assert_eq!(env.length(), 6);
        assert_eq!(env.first_expression_index(), 6);
        assert_eq!(env.expression_height(), 0);
        assert_eq!(env.parameter_index(1), 1);
        assert_eq!(env.special_index(0), 2);
        assert_eq!(env.local_index(0), 3);
        assert_eq!(env.local_index(2), 5);
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut env = Environment::new(1, 0, 2, v(0));
        env.bind_local(1, v(7)).unwrap();
        assert_eq!(env.local(1).unwrap(), v(7));
        assert_eq!(env.lookup(2).unwrap(), v(7));
        assert_eq!(env.assigned_variables(), &[2]);

        env.bind_local(1, v(8)).unwrap();
        assert_eq!(env.assigned_variables(), &[2], "history records each slot once");
    }

    #[test]
    fn test_out_of_range_slots() {
        let mut env = Environment::new(1, 0, 1, v(0));
        assert!(matches!(
            env.bind(5, v(1)),
            Err(Error::InvariantViolation { .. })
        ));
        assert!(env.lookup(2).is_err());
        assert!(env.local(1).is_err());
        assert!(env.parameter(1).is_err());
    }

    #[test]
    fn test_expression_stack() {
        let mut env = Environment::new(0, 0, 1, v(0));
        env.push(v(1));
        env.push(v(2));
        assert_eq!(env.expression_height(), 2);
        assert_eq!(env.top().unwrap(), v(2));
        assert_eq!(env.expression_at(1).unwrap(), v(1));
        assert_eq!(env.pop().unwrap(), v(2));
        assert_eq!(env.pop().unwrap(), v(1));
        assert!(env.pop().is_err(), "locals are not part of the expression stack");
        assert_eq!(env.push_count(), 2);
        assert_eq!(env.pop_count(), 2);
    }

    #[test]
    fn test_drop_values() {
        let mut env = Environment::new(0, 0, 0, v(0));
        env.push(v(1));
        env.push(v(2));
        env.push(v(3));
        env.drop_values(2).unwrap();
        assert_eq!(env.expression_height(), 1);
        assert!(env.drop_values(2).is_err());
    }

    #[test]
    fn test_copy_without_history() {
        let mut env = Environment::new(0, 0, 1, v(0));
        env.bind_local(0, v(4)).unwrap();
        env.push(v(5));

        let copy = env.copy();
        assert_eq!(copy, env);

        let fresh = env.copy_without_history();
        assert!(fresh.assigned_variables().is_empty());
        assert_eq!(fresh.push_count(), 0);
        assert_eq!(fresh.values(), env.values());
        assert!(fresh.structurally_matches(&env));
    }

    #[test]
    fn test_structural_mismatch() {
        let mut a = Environment::new(1, 0, 1, v(0));
        let b = Environment::new(1, 0, 1, v(0));
        assert!(a.structurally_matches(&b));
        a.push(v(1));
        assert!(!a.structurally_matches(&b));
    }

    #[test]
    fn test_inlining_round_trip() {
        let mut caller = Environment::new(1, 0, 1, v(0));
        caller.push(v(10)); // callee
        caller.push(v(11)); // argument 0
        caller.push(v(12)); // argument 1

        let callee = caller.copy_for_inlining(2, 3, v(99)).unwrap();
        assert_eq!(callee.parameter_count(), 2);
        assert_eq!(callee.local_count(), 3);
        assert_eq!(callee.parameter(0).unwrap(), v(11));
        assert_eq!(callee.parameter(1).unwrap(), v(12));
        assert_eq!(callee.local(2).unwrap(), v(99));
        assert_eq!(callee.inlining_depth(), 1);
        assert_eq!(callee.outer().map(Environment::expression_height), Some(1));

        let back = callee.discard_inlined(1).unwrap();
        assert_eq!(back.expression_height(), 0);
        assert_eq!(back.inlining_depth(), 0);
        assert_eq!(back.length(), caller.length() - 3);
    }

    #[test]
    fn test_inlining_errors() {
        let caller = Environment::new(0, 0, 0, v(0));
        assert!(caller.copy_for_inlining(1, 0, v(0)).is_err());
        assert!(caller.discard_inlined(0).is_err());
    }

    #[test]
    fn test_display() {
        let mut env = Environment::new(1, 1, 1, v(0));
        env.push(v(3));
        assert_eq!(format!("{env}"), "[ p: v0 | s: v0 | l: v0 | e: v3 ]");
    }
}
