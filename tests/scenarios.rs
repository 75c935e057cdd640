//! End-to-end construction scenarios.
//!
//! Each test builds a small program shape through the public API, finalizes it and checks
//! dominators, loop structure and phi placement:
//! 1. Diamond (if/else with a join)
//! 2. Simple loop
//! 3. Nested loops
//! 4. Three-way join
//! 5. Pruning and re-analysis

use irgraph::prelude::*;

/// Ends `block` with a two-way branch on a fresh condition value.
fn branch(graph: &mut Graph, block: BlockId, if_true: BlockId, if_false: BlockId) -> Result<()> {
    let condition = graph.add_instruction(block, Opcode::new("cond"), vec![])?;
    graph.finish(
        block,
        Terminator::Branch {
            condition,
            if_true,
            if_false,
        },
    )
}

/// Binds local 0 of `block` to the constant `value`.
fn assign(graph: &mut Graph, block: BlockId, value: i64) -> Result<ValueId> {
    let constant = graph.constant(value);
    graph.environment_mut(block)?.bind_local(0, constant)?;
    Ok(constant)
}

#[test]
fn test_diamond() -> Result<()> {
    let mut graph = Graph::with_config(GraphConfig::strict(), 0, 0, 1);
    let entry = graph.entry();
    let t = graph.create_block()?;
    let f = graph.create_block()?;
    let j = graph.create_block()?;

    branch(&mut graph, entry, t, f)?;
    let one = assign(&mut graph, t, 1)?;
    let two = assign(&mut graph, f, 2)?;
    graph.finish(t, Terminator::Goto(j))?;
    graph.finish(f, Terminator::Goto(j))?;

    let merged = graph.environment(j).unwrap().local(0)?;
    graph.finish_exit(j, Terminator::Return(Some(merged)))?;
    graph.finalize()?;

    assert_eq!(graph[j].dominator(), Some(entry));
    assert_eq!(graph[t].dominator(), Some(entry));
    assert_eq!(graph[f].dominator(), Some(entry));
    assert_eq!(graph[entry].dominated_blocks().len(), 3);

    assert_eq!(graph[j].phis().len(), 1);
    let phi = &graph[graph[j].phis()[0]];
    assert_eq!(phi.value(), merged);
    assert_eq!(phi.inputs(), &[one, two]);
    assert_eq!(graph[j].predecessors(), &[t, f]);
    Ok(())
}

#[test]
fn test_diamond_without_assignment_has_no_phi() -> Result<()> {
    let mut graph = Graph::new(0, 0, 1);
    let entry = graph.entry();
    let t = graph.create_block()?;
    let f = graph.create_block()?;
    let j = graph.create_block()?;

    assign(&mut graph, entry, 7)?;
    branch(&mut graph, entry, t, f)?;
    graph.finish(t, Terminator::Goto(j))?;
    graph.finish(f, Terminator::Goto(j))?;
    graph.finish_exit(j, Terminator::Return(None))?;
    graph.finalize()?;

    assert!(graph[j].phis().is_empty());
    Ok(())
}

#[test]
fn test_simple_loop() -> Result<()> {
    let mut graph = Graph::with_config(GraphConfig::strict(), 0, 0, 1);
    let entry = graph.entry();
    let h = graph.create_loop_header(entry)?;
    graph.finish(entry, Terminator::Goto(h))?;
    let body = graph.create_block()?;
    let exit = graph.create_block()?;
    branch(&mut graph, h, body, exit)?;
    graph.finish(body, Terminator::Goto(h))?;
    graph.post_process_loop_header(h, LoopMarker(1))?;
    graph.finish_exit(exit, Terminator::Return(None))?;
    graph.finalize()?;

    let loop_id = graph[h].loop_information().unwrap();
    assert_eq!(graph[loop_id].back_edges(), &[body]);
    assert_eq!(graph[loop_id].marker(), Some(LoopMarker(1)));
    assert_eq!(graph.last_back_edge(loop_id), Some(body));
    assert_eq!(graph[body].dominator(), Some(h));
    assert_eq!(graph[exit].dominator(), Some(h));
    assert_eq!(graph.loop_nesting_depth(body), 1);
    assert_eq!(graph.loop_nesting_depth(exit), 0);
    assert_eq!(graph.ordered_blocks(), &[entry, h, body, exit]);

    // One phi per environment slot, one input per predecessor.
    for &phi in graph[h].phis() {
        assert_eq!(graph[phi].input_count(), 2);
    }
    Ok(())
}

#[test]
fn test_nested_loops() -> Result<()> {
    // while (p0) { while (p1) { x = x + 1 } y = x }
    let mut builder = GraphBuilder::with_config(GraphConfig::strict(), 2, 0, 1);
    let outer = builder.loop_entry()?;
    let p0 = builder.environment()?.parameter(0)?;
    let (outer_body, outer_exit) = builder.branch(p0)?;

    builder.set_current_block(Some(outer_body));
    let inner = builder.loop_entry()?;
    let p1 = builder.environment()?.parameter(1)?;
    let (inner_body, inner_exit) = builder.branch(p1)?;

    builder.set_current_block(Some(inner_body));
    let x = builder.environment()?.local(0)?;
    let one = builder.constant(1);
    let sum = builder.add_instruction(Opcode::new("add"), vec![x, one])?;
    builder.environment_mut()?.bind_local(0, sum)?;
    let inner_after = builder.create_loop(
        inner,
        builder.current_block(),
        Some(inner_exit),
        None,
        LoopMarker(2),
    )?;
    assert_eq!(inner_after, Some(inner_exit));

    builder.set_current_block(inner_after);
    let x = builder.environment()?.local(0)?;
    builder.add_instruction(Opcode::new("use"), vec![x])?;
    let after = builder.create_loop(
        outer,
        builder.current_block(),
        Some(outer_exit),
        None,
        LoopMarker(1),
    )?;

    builder.set_current_block(after);
    builder.return_value(None)?;
    let graph = builder.finalize()?;

    assert_eq!(graph.loop_nesting_depth(inner_body), 2);
    assert_eq!(graph.loop_nesting_depth(inner), 2);
    assert_eq!(graph.loop_nesting_depth(outer_body), 1);
    assert_eq!(graph.loop_nesting_depth(inner_exit), 1);
    assert_eq!(graph.loop_nesting_depth(outer_exit), 0);
    assert_eq!(graph[inner].parent_loop_header(), Some(outer));
    assert_eq!(graph[outer].parent_loop_header(), None);

    let outer_loop = graph[outer].loop_information().unwrap();
    let inner_loop = graph[inner].loop_information().unwrap();
    assert!(graph[outer_loop].contains(inner));
    assert!(!graph[outer_loop].contains(inner_body));
    assert!(graph[inner_loop].contains(inner_body));

    // Both loops are contiguous and the inner range nests inside the outer one.
    let id = |block: BlockId| graph[block].id();
    let outer_last = graph.last_back_edge(outer_loop).unwrap();
    let inner_last = graph.last_back_edge(inner_loop).unwrap();
    assert!(id(outer) < id(inner));
    assert!(id(inner_last) < id(outer_last));
    assert!(id(outer_exit) > id(outer_last));
    Ok(())
}

#[test]
fn test_three_way_join() -> Result<()> {
    let mut graph = Graph::with_config(GraphConfig::strict(), 0, 0, 1);
    let entry = graph.entry();
    let a = graph.create_block()?;
    let rest = graph.create_block()?;
    let b = graph.create_block()?;
    let c = graph.create_block()?;
    let j = graph.create_block()?;

    branch(&mut graph, entry, a, rest)?;
    branch(&mut graph, rest, b, c)?;
    let one = assign(&mut graph, a, 1)?;
    let two = assign(&mut graph, b, 2)?;
    let three = assign(&mut graph, c, 3)?;
    graph.finish(a, Terminator::Goto(j))?;
    graph.finish(b, Terminator::Goto(j))?;
    graph.finish(c, Terminator::Goto(j))?;
    graph.finish_exit(j, Terminator::Return(None))?;
    graph.finalize()?;

    assert_eq!(graph[j].predecessors(), &[a, b, c]);
    assert_eq!(graph[j].phis().len(), 1);
    let phi = &graph[graph[j].phis()[0]];
    assert_eq!(phi.inputs(), &[one, two, three]);
    assert_eq!(phi.merged_index(), Some(0));
    assert_eq!(graph[j].dominator(), Some(entry));
    Ok(())
}

#[test]
fn test_pruned_branch_reanalysis() -> Result<()> {
    let mut graph = Graph::with_config(GraphConfig::strict(), 0, 0, 0);
    let entry = graph.entry();
    let t = graph.create_block()?;
    let f = graph.create_block()?;
    let j = graph.create_block()?;
    branch(&mut graph, entry, t, f)?;
    graph.finish(t, Terminator::Goto(j))?;
    graph.finish(f, Terminator::Goto(j))?;
    graph.finish_exit(j, Terminator::Return(None))?;
    graph.finalize()?;
    assert_eq!(graph[j].dominator(), Some(entry));

    graph.mark_unreachable(f)?;
    graph.rerun_reachability()?;
    graph.rerun_dominators()?;
    graph.verify()?;

    assert!(!graph[f].is_reachable());
    assert_eq!(graph[f].dominator(), None);
    assert_eq!(graph[j].dominator(), Some(t));
    assert!(graph.dominates(t, j));
    Ok(())
}

#[test]
fn test_unprocessed_loop_is_rejected() -> Result<()> {
    let mut graph = Graph::new(0, 0, 0);
    let entry = graph.entry();
    let h = graph.create_loop_header(entry)?;
    graph.finish(entry, Terminator::Goto(h))?;
    graph.finish(h, Terminator::Goto(h))?;

    assert!(matches!(
        graph.finalize(),
        Err(Error::InvariantViolation { .. })
    ));
    Ok(())
}

#[test]
fn test_graph_display() -> Result<()> {
    let mut builder = GraphBuilder::new(1, 0, 0);
    let p0 = builder.environment()?.parameter(0)?;
    builder.return_value(Some(p0))?;
    let graph = builder.finalize()?;

    let text = graph.to_string();
    assert!(text.contains("B0"), "{text}");
    assert!(text.contains("return"), "{text}");
    Ok(())
}
