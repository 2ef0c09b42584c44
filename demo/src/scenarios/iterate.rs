//! Scenario 2: Filtered Iteration
//!
//! Alice reads a graph with statements about r1, r2 and r3. Everything about
//! r1 is silently skipped; `size` and `contains` agree with what she sees.
//! Carol cannot delete at all, so her attempt fails before the store is hit.

use std::rc::Rc;

use graphward_contracts::{
    error::{SecurityError, SecurityResult},
    term::{Statement, Term},
};
use graphward_core::{MemGraph, SecuredGraph};

use super::{data_graph, ex, show, statement, DemoContext};

pub fn run_scenario(ctx: &DemoContext) -> SecurityResult<()> {
    println!("=== Scenario 2: Filtered Iteration ===");
    println!();

    let base = Rc::new(MemGraph::from_statements(vec![
        statement("r1", "name", Term::literal("one")),
        statement("r1", "rank", Term::literal("7")),
        statement("r2", "name", Term::literal("two")),
        statement("r3", "name", Term::literal("three")),
    ]));
    let graph = SecuredGraph::new(base.clone(), ctx.evaluator.clone(), data_graph(), ctx.scope()?);

    ctx.run_as("alice");
    println!("  Principal: alice (cannot read ex:r1)");

    let mut found = graph.find(&Statement::ANY)?;
    for s in found.by_ref() {
        println!("    {}", show(&s));
    }
    println!("  Skipped:   {} statement(s)", found.skipped());
    drop(found);

    let about_r1 = Statement::new(ex("r1"), Term::Any, Term::Any);
    println!("  size():    {} (store holds {})", graph.size()?, base.snapshot().len());
    println!("  contains(r1 ANY ANY): {}", graph.contains(&about_r1)?);
    println!();

    ctx.run_as("carol");
    println!("  Principal: carol (no delete grant)");
    match graph.delete(&statement("r2", "name", Term::literal("two"))) {
        Err(e @ SecurityError::PermissionDenied { .. }) => println!("  DENIED:    {}", e),
        Err(e) => return Err(e),
        Ok(()) => println!("  Unexpectedly deleted"),
    }
    println!("  Store still holds {} statement(s)", base.snapshot().len());
    println!();
    Ok(())
}
