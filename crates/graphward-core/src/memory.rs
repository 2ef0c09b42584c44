//! In-memory implementation of `Graph`.
//!
//! `MemGraph` is the reference store used by the demo and tests. Statements
//! live in a `BTreeSet` so iteration order is deterministic. Every add or
//! delete call that changes the set raises one batch `GraphEvent` carrying
//! exactly the statements that changed.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use graphward_contracts::{
    error::{SecurityError, SecurityResult},
    term::Statement,
};

use crate::traits::{Capabilities, Graph, GraphEvent, GraphListener, ListenerId, StatementIter};

#[derive(Default)]
pub struct MemGraph {
    statements: RefCell<BTreeSet<Statement>>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn GraphListener>)>>,
    next_listener: Cell<u64>,
    capabilities: Capabilities,
}

impl MemGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `statements`. No events are raised.
    pub fn from_statements(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            statements: RefCell::new(statements.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Override what the store reports (and enforces) as supported.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// A snapshot of the stored statements, in order.
    pub fn snapshot(&self) -> Vec<Statement> {
        self.statements.borrow().iter().cloned().collect()
    }

    fn notify(&self, event: GraphEvent) {
        if event.statements().is_empty() {
            return;
        }
        // Clone the handles first so listeners may (un)register re-entrantly.
        let listeners: Vec<Rc<dyn GraphListener>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener.notify(&event);
        }
    }

    fn require_add(&self) -> SecurityResult<()> {
        if self.capabilities.add_allowed {
            Ok(())
        } else {
            Err(SecurityError::Store {
                reason: "store does not support add".to_string(),
            })
        }
    }

    fn require_delete(&self) -> SecurityResult<()> {
        if self.capabilities.delete_allowed {
            Ok(())
        } else {
            Err(SecurityError::Store {
                reason: "store does not support delete".to_string(),
            })
        }
    }
}

impl Graph for MemGraph {
    fn add(&self, statement: Statement) -> SecurityResult<()> {
        self.add_all(vec![statement])
    }

    fn delete(&self, statement: &Statement) -> SecurityResult<()> {
        self.delete_all(std::slice::from_ref(statement))
    }

    fn add_all(&self, statements: Vec<Statement>) -> SecurityResult<()> {
        self.require_add()?;
        let added: Vec<Statement> = {
            let mut set = self.statements.borrow_mut();
            statements
                .into_iter()
                .filter(|s| set.insert(s.clone()))
                .collect()
        };
        self.notify(GraphEvent::Added(added));
        Ok(())
    }

    fn delete_all(&self, statements: &[Statement]) -> SecurityResult<()> {
        self.require_delete()?;
        let deleted: Vec<Statement> = {
            let mut set = self.statements.borrow_mut();
            statements
                .iter()
                .filter(|s| set.remove(*s))
                .cloned()
                .collect()
        };
        self.notify(GraphEvent::Deleted(deleted));
        Ok(())
    }

    fn find(&self, pattern: &Statement) -> SecurityResult<StatementIter> {
        let matches: Vec<Statement> = self
            .statements
            .borrow()
            .iter()
            .filter(|s| pattern.matches(s))
            .cloned()
            .collect();
        Ok(Box::new(matches.into_iter()))
    }

    fn contains(&self, pattern: &Statement) -> SecurityResult<bool> {
        Ok(self.statements.borrow().iter().any(|s| pattern.matches(s)))
    }

    fn size(&self) -> SecurityResult<usize> {
        Ok(self.statements.borrow().len())
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn register_listener(&self, listener: Rc<dyn GraphListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn unregister_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
