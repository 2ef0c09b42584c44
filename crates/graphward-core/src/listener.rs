//! Permission-filtered change notifications.
//!
//! A `SecuredListener` is created when a consumer registers through a
//! secured graph. It captures the principal active at registration and uses
//! that identity for every later delivery, whoever made the change. So
//! notification filtering reflects the registrant's rights, not the actor's.

use std::rc::Rc;

use tracing::{debug, warn};

use graphward_contracts::{
    action::{Action, ActionSet},
    error::SecurityResult,
    identity::Principal,
    term::Statement,
    triple::Triple,
};

use crate::{
    item::SecuredItem,
    traits::{GraphEvent, GraphListener},
};

pub struct SecuredListener {
    item: SecuredItem,
    inner: Rc<dyn GraphListener>,
}

impl SecuredListener {
    /// Wrap `inner`, evaluating every delivery as the principal `item`
    /// currently resolves to.
    pub fn capture(item: &SecuredItem, inner: Rc<dyn GraphListener>) -> Self {
        let principal = item.principal();
        debug!(graph = %item.graph_id(), principal = ?principal, "listener identity captured");
        Self {
            item: item.run_as(principal),
            inner,
        }
    }

    /// The identity deliveries are evaluated as.
    pub fn principal(&self) -> Option<Principal> {
        self.item.principal()
    }

    /// The part of `event` the captured identity may see, or `None` when
    /// nothing should be delivered.
    fn visible(&self, event: &GraphEvent) -> SecurityResult<Option<GraphEvent>> {
        if !self.item.can_any(&visibility())? {
            return Ok(None);
        }
        if self.item.can_read_triple(&Triple::ANY)? {
            return Ok(Some(event.clone()));
        }
        let mut kept: Vec<Statement> = Vec::with_capacity(event.statements().len());
        for statement in event.statements() {
            if self.item.can_read_statement(statement)? {
                kept.push(statement.clone());
            }
        }
        if kept.is_empty() {
            Ok(None)
        } else {
            Ok(Some(event.with_statements(kept)))
        }
    }
}

/// Rights, any one of which lets a registrant learn that a change happened.
fn visibility() -> ActionSet {
    ActionSet::single(Action::Read)
}

impl GraphListener for SecuredListener {
    fn notify(&self, event: &GraphEvent) {
        let _unit = self.item.scope().enter();
        match self.visible(event) {
            Ok(Some(filtered)) => self.inner.notify(&filtered),
            Ok(None) => {
                debug!(graph = %self.item.graph_id(), "notification suppressed for listener");
            }
            Err(e) => {
                warn!(graph = %self.item.graph_id(), error = %e, "notification filtering failed; suppressed");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    use graphward_contracts::{
        identity::GraphId,
        node::Node,
        term::Term,
    };

    use super::*;
    use crate::{cache::DecisionScope, traits::SecurityEvaluator};

    /// Grants graph visibility only through `evaluate_any` and counts how
    /// often that path is taken.
    struct AnyOnly {
        visible: bool,
        hidden: Vec<&'static str>,
        any_calls: Mutex<u32>,
    }

    impl SecurityEvaluator for AnyOnly {
        fn evaluate(&self, _p: Option<&Principal>, _a: Action, _g: &GraphId) -> bool {
            false
        }

        fn evaluate_any(&self, _p: Option<&Principal>, actions: &ActionSet, _g: &GraphId) -> bool {
            *self.any_calls.lock().unwrap() += 1;
            self.visible && actions.contains(Action::Read)
        }

        fn evaluate_triple(&self, _p: Option<&Principal>, _a: Action, _g: &GraphId, t: &Triple) -> bool {
            if !t.subject.is_concrete() {
                return self.hidden.is_empty();
            }
            !self.hidden.iter().any(|h| t.subject == Node::uri(*h))
        }

        fn evaluate_update(&self, _p: Option<&Principal>, _g: &GraphId, _f: &Triple, _t: &Triple) -> bool {
            false
        }

        fn principal(&self) -> Option<Principal> {
            None
        }
    }

    struct Recorder {
        events: RefCell<Vec<GraphEvent>>,
    }

    impl GraphListener for Recorder {
        fn notify(&self, event: &GraphEvent) {
            self.events.borrow_mut().push(event.clone());
        }
    }

    fn st(s: &str) -> Statement {
        Statement::new(Term::iri(s), Term::iri("p"), Term::iri("o"))
    }

    fn listen(eval: Arc<AnyOnly>) -> (SecuredListener, Rc<Recorder>) {
        let item = SecuredItem::new(eval, GraphId::new("urn:g"), DecisionScope::default());
        let rec = Rc::new(Recorder {
            events: RefCell::new(vec![]),
        });
        (SecuredListener::capture(&item, rec.clone()), rec)
    }

    #[test]
    fn visibility_is_decided_by_evaluate_any() {
        let eval = Arc::new(AnyOnly {
            visible: true,
            hidden: vec!["r2"],
            any_calls: Mutex::new(0),
        });
        let (listener, rec) = listen(eval.clone());

        listener.notify(&GraphEvent::Added(vec![st("r1"), st("r2")]));
        assert_eq!(*rec.events.borrow(), vec![GraphEvent::Added(vec![st("r1")])]);
        assert_eq!(*eval.any_calls.lock().unwrap(), 1);
    }

    #[test]
    fn invisible_graph_delivers_nothing() {
        let eval = Arc::new(AnyOnly {
            visible: false,
            hidden: vec![],
            any_calls: Mutex::new(0),
        });
        let (listener, rec) = listen(eval);

        listener.notify(&GraphEvent::Deleted(vec![st("r1")]));
        assert!(rec.events.borrow().is_empty());
    }
}
