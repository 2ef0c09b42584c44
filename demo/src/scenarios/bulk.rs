//! Scenario 3: Fail-fast Bulk Add
//!
//! Carol may create statements, but not about ex:secret. A batch of
//! [ok1, secret, ok2] is rejected at `secret`; nothing is written. Without
//! the offending statement the batch goes through. Bob has no restrictions,
//! so his batch is authorized by the blanket probe alone.

use std::rc::Rc;

use graphward_contracts::{
    error::{SecurityError, SecurityResult},
    term::Term,
};
use graphward_core::{Graph, MemGraph, SecuredGraph};

use super::{data_graph, statement, DemoContext};

pub fn run_scenario(ctx: &DemoContext) -> SecurityResult<()> {
    println!("=== Scenario 3: Fail-fast Bulk Add ===");
    println!();

    let base = Rc::new(MemGraph::new());
    let graph = SecuredGraph::new(base.clone(), ctx.evaluator.clone(), data_graph(), ctx.scope()?);

    ctx.run_as("carol");
    println!("  Principal: carol (cannot create about ex:secret)");

    let batch = vec![
        statement("ok1", "label", Term::literal("first")),
        statement("secret", "label", Term::literal("hidden")),
        statement("ok2", "label", Term::literal("second")),
    ];
    match graph.add_all(batch) {
        Err(e @ SecurityError::PermissionDenied { .. }) => println!("  DENIED:    {}", e),
        Err(e) => return Err(e),
        Ok(()) => println!("  Unexpectedly accepted"),
    }
    println!("  Store size after rejected batch: {}", base.size()?);

    graph.add_all(vec![
        statement("ok1", "label", Term::literal("first")),
        statement("ok2", "label", Term::literal("second")),
    ])?;
    println!("  Store size after clean batch:    {}", base.size()?);
    println!();

    ctx.run_as("bob");
    println!("  Principal: bob (no restrictions)");
    graph.add_all((0..5).map(|i| statement(&format!("item{}", i), "label", Term::literal(i.to_string()))))?;
    println!("  Store size after bob's batch:    {}", base.size()?);
    println!();
    Ok(())
}
