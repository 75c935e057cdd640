//! Shared helpers for the integration tests: a tiny structured language lowered through
//! [`GraphBuilder`], and checks for the properties every finalized graph must satisfy.

#![allow(dead_code)]

use irgraph::prelude::*;

/// Number of locals every generated program uses.
pub const LOCALS: usize = 3;

/// A statement of the structured test language.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `local = constant`
    Assign(usize, i64),
    /// `local = op(local)`
    Compute(usize),
    /// `if (p0) { .. } else { .. }`
    If(Vec<Stmt>, Vec<Stmt>),
    /// `while (test(local0)) { .. }`
    While(Vec<Stmt>),
    /// Leaves the innermost loop; ignored outside loops.
    Break,
    /// Jumps back to the innermost loop header; ignored outside loops.
    Continue,
    /// `return local0`
    Return,
}

/// An enclosing loop during lowering.
struct LoopScope {
    header: BlockId,
    /// Break target, created on the first `break`.
    break_block: Option<BlockId>,
}

/// Lowers statements into a graph, one builder call per construct.
pub struct Lowering {
    builder: GraphBuilder,
    loops: Vec<LoopScope>,
    next_marker: u32,
}

impl Lowering {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            builder: GraphBuilder::with_config(config, 1, 0, LOCALS),
            loops: Vec::new(),
            next_marker: 0,
        }
    }

    /// Lowers a whole program and finalizes the graph.
    pub fn build(config: GraphConfig, program: &[Stmt]) -> Result<Graph> {
        let mut lowering = Self::new(config);
        lowering.lower_block(program)?;
        if lowering.builder.current_block().is_some() {
            lowering.builder.return_value(None)?;
        }
        lowering.builder.finalize()
    }

    fn lower_block(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            if self.builder.current_block().is_none() {
                break;
            }
            self.lower(stmt)?;
        }
        Ok(())
    }

    fn lower(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign(local, value) => {
                let constant = self.builder.constant(*value);
                self.builder
                    .environment_mut()?
                    .bind_local(local % LOCALS, constant)?;
            }
            Stmt::Compute(local) => {
                let input = self.builder.environment()?.local(local % LOCALS)?;
                let result = self
                    .builder
                    .add_instruction(Opcode::new("op"), vec![input])?;
                self.builder
                    .environment_mut()?
                    .bind_local(local % LOCALS, result)?;
            }
            Stmt::If(then_branch, else_branch) => {
                let condition = self.builder.environment()?.parameter(0)?;
                let (if_true, if_false) = self.builder.branch(condition)?;
                self.builder.set_current_block(Some(if_true));
                self.lower_block(then_branch)?;
                let then_end = self.builder.current_block();
                self.builder.set_current_block(Some(if_false));
                self.lower_block(else_branch)?;
                let else_end = self.builder.current_block();
                let join = self.builder.create_join(then_end, else_end)?;
                self.builder.set_current_block(join);
            }
            Stmt::While(body) => {
                let header = self.builder.loop_entry()?;
                let counter = self.builder.environment()?.local(0)?;
                let condition = self
                    .builder
                    .add_instruction(Opcode::new("test"), vec![counter])?;
                let (body_entry, exit) = self.builder.branch(condition)?;

                self.loops.push(LoopScope {
                    header,
                    break_block: None,
                });
                self.builder.set_current_block(Some(body_entry));
                self.lower_block(body)?;
                let body_exit = self.builder.current_block();
                let break_block = self.loops.pop().and_then(|scope| scope.break_block);

                self.next_marker += 1;
                let after = self.builder.create_loop(
                    header,
                    body_exit,
                    Some(exit),
                    break_block,
                    LoopMarker(self.next_marker),
                )?;
                self.builder.set_current_block(after);
            }
            Stmt::Break => {
                let Some(scope) = self.loops.last() else {
                    return Ok(());
                };
                let target = match scope.break_block {
                    Some(block) => block,
                    None => {
                        let block = self.builder.create_block()?;
                        if let Some(scope) = self.loops.last_mut() {
                            scope.break_block = Some(block);
                        }
                        block
                    }
                };
                self.builder.goto(target)?;
            }
            Stmt::Continue => {
                if let Some(scope) = self.loops.last() {
                    let header = scope.header;
                    self.builder.goto(header)?;
                }
            }
            Stmt::Return => {
                let value = self.builder.environment()?.local(0)?;
                self.builder.return_value(Some(value))?;
            }
        }
        Ok(())
    }
}

/// Asserts every structural property of a finalized graph, independently of
/// [`Graph::verify`].
pub fn check_properties(graph: &Graph) {
    let ordered = graph.ordered_blocks();
    let id = |block: BlockId| graph[block].id();
    let is_back_edge = |from: BlockId, to: BlockId| {
        graph[to]
            .loop_information()
            .is_some_and(|l| graph[l].back_edges().contains(&from))
    };

    assert_eq!(ordered.first(), Some(&graph.entry()));
    for (position, &block) in ordered.iter().enumerate() {
        assert_eq!(id(block), position, "dense id of {block}");
    }

    for &block in ordered {
        let data = &graph[block];
        if !data.is_reachable() {
            continue;
        }

        // Dominance soundness.
        if block == graph.entry() {
            assert_eq!(data.dominator(), None);
        } else {
            let dominator = data.dominator().expect("reachable block without dominator");
            assert!(graph.equal_to_or_dominates(dominator, block));
            let mut current = Some(dominator);
            let mut steps = 0;
            while let Some(candidate) = current {
                assert_ne!(candidate, block, "{block} on its own dominator chain");
                current = graph[candidate].dominator();
                steps += 1;
                assert!(steps <= ordered.len());
            }
        }

        // Reverse postorder.
        for successor in data.successors() {
            if !is_back_edge(block, successor) {
                assert!(id(block) < id(successor), "edge {block} -> {successor}");
            }
        }

        // Phi alignment.
        for &phi in data.phis() {
            let phi = &graph[phi];
            assert_eq!(phi.input_count(), data.predecessors().len());
            let slot = phi.merged_index().expect("phi without slot");
            for (&pred, &input) in data.predecessors().iter().zip(phi.inputs()) {
                if let Some(environment) = graph[pred].environment() {
                    assert_eq!(environment.lookup(slot).ok(), Some(input), "{pred} -> {block}");
                }
            }
        }

        // Loop header well-formedness and contiguity.
        if let Some(loop_id) = data.loop_information() {
            let info = &graph[loop_id];
            let forward = data
                .predecessors()
                .iter()
                .filter(|&&pred| !info.back_edges().contains(&pred))
                .count();
            assert_eq!(forward, 1, "loop header {block}");
            assert_eq!(&data.predecessors()[1..], info.back_edges());

            let last = graph.last_back_edge(loop_id).expect("loop without back edge");
            for &inside in &ordered[id(block)..=id(last)] {
                let mut current = Some(inside);
                while current.is_some_and(|c| c != block) {
                    current = current.and_then(|c| graph[c].parent_loop_header());
                }
                assert_eq!(current, Some(block), "{inside} breaks contiguity of {block}");
            }
        }
    }
}

/// Snapshot of everything dominator assignment writes.
pub fn dominator_snapshot(graph: &Graph) -> Vec<(Option<BlockId>, Vec<BlockId>, bool)> {
    graph
        .blocks()
        .map(|block| {
            (
                block.dominator(),
                block.dominated_blocks().to_vec(),
                block.is_loop_successor_dominator(),
            )
        })
        .collect()
}
