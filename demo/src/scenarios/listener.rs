//! Scenario 4: Listener Identity Capture
//!
//! Alice registers a listener, then bob makes changes. Deliveries are
//! filtered with alice's rights: the statement about ex:r1 never reaches
//! her listener, even though bob was allowed to write it.

use std::cell::RefCell;
use std::rc::Rc;

use graphward_contracts::{error::SecurityResult, term::Term};
use graphward_core::{GraphEvent, GraphListener, MemGraph, SecuredGraph};

use super::{data_graph, show, statement, DemoContext};

/// Prints and remembers every event it receives.
struct PrintingListener {
    received: RefCell<usize>,
}

impl GraphListener for PrintingListener {
    fn notify(&self, event: &GraphEvent) {
        let kind = match event {
            GraphEvent::Added(_) => "added",
            GraphEvent::Deleted(_) => "deleted",
        };
        for s in event.statements() {
            println!("    alice's listener: {} {}", kind, show(s));
        }
        *self.received.borrow_mut() += event.statements().len();
    }
}

pub fn run_scenario(ctx: &DemoContext) -> SecurityResult<()> {
    println!("=== Scenario 4: Listener Identity Capture ===");
    println!();

    let graph = SecuredGraph::new(Rc::new(MemGraph::new()), ctx.evaluator.clone(), data_graph(), ctx.scope()?);

    ctx.run_as("alice");
    let listener = Rc::new(PrintingListener {
        received: RefCell::new(0),
    });
    let id = graph.register_listener(listener.clone());
    println!("  Listener registered as alice (cannot read ex:r1)");

    ctx.run_as("bob");
    println!("  Bob adds statements about r1 and r4");
    graph.add_all(vec![
        statement("r1", "name", Term::literal("one")),
        statement("r4", "name", Term::literal("four")),
    ])?;
    println!("  Bob deletes the statement about r1");
    graph.delete(&statement("r1", "name", Term::literal("one")))?;

    println!("  Delivered to alice: {} statement(s)", listener.received.borrow());
    graph.unregister_listener(id);
    println!();
    Ok(())
}
