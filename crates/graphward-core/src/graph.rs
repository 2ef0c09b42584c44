//! The secured graph: an explicit decorator over any `Graph`.
//!
//! Every operation follows the same order:
//!
//!   enter unit of work → graph-level check → triple-level check(s) → store
//!
//! The store is never touched until every required check has passed. Each
//! public method opens its own unit of work on the injected scope. Callers
//! that want one cache across several calls (a request) hold an outer
//! `UnitOfWork` themselves; the inner ones then share it.

use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use graphward_contracts::{
    action::Action,
    error::{SecurityError, SecurityResult},
    identity::GraphId,
    term::Statement,
    triple::Triple,
};

use crate::{
    bulk::BulkAuthorizer,
    cache::DecisionScope,
    item::SecuredItem,
    iter::SecuredIter,
    listener::SecuredListener,
    traits::{Capabilities, Graph, GraphListener, ListenerId, SecurityEvaluator, StatementIter},
};

/// A `Graph` wrapped with mandatory access control.
pub struct SecuredGraph<G: Graph> {
    base: Rc<G>,
    item: SecuredItem,
}

impl<G: Graph> SecuredGraph<G> {
    pub fn new(
        base: Rc<G>,
        evaluator: Arc<dyn SecurityEvaluator>,
        graph_id: GraphId,
        scope: DecisionScope,
    ) -> Self {
        Self {
            base,
            item: SecuredItem::new(evaluator, graph_id, scope),
        }
    }

    /// The authorization facade for this graph.
    pub fn item(&self) -> &SecuredItem {
        &self.item
    }

    pub fn graph_id(&self) -> &GraphId {
        self.item.graph_id()
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// Statements matching `pattern` that the principal may read.
    ///
    /// Fails eagerly without graph-level read; filters silently otherwise.
    pub fn find(&self, pattern: &Statement) -> SecurityResult<SecuredIter<StatementIter>> {
        let _unit = self.item.scope().enter();
        self.item.check_read()?;
        SecuredIter::new(&self.item, self.base.find(pattern)?)
    }

    /// True if a readable statement matches `pattern`.
    ///
    /// When the pattern itself is readable the store answers directly.
    /// Otherwise matching statements are scanned and filtered, so a caller
    /// with partial rights gets `false` rather than a denial.
    pub fn contains(&self, pattern: &Statement) -> SecurityResult<bool> {
        let _unit = self.item.scope().enter();
        self.item.check_read()?;
        if self.item.can_read_triple(&pattern.to_triple())? {
            return self.base.contains(pattern);
        }
        debug!(graph = %self.graph_id(), "contains falling back to scan-and-filter");
        Ok(self.find(pattern)?.next().is_some())
    }

    /// Number of statements the principal may read.
    pub fn size(&self) -> SecurityResult<usize> {
        let _unit = self.item.scope().enter();
        self.item.check_read()?;
        if self.item.can_read_triple(&Triple::ANY)? {
            return self.base.size();
        }
        Ok(self.find(&Statement::ANY)?.count())
    }

    pub fn is_empty(&self) -> SecurityResult<bool> {
        let _unit = self.item.scope().enter();
        self.item.check_read()?;
        if self.item.can_read_triple(&Triple::ANY)? {
            return Ok(self.base.size()? == 0);
        }
        Ok(self.find(&Statement::ANY)?.next().is_none())
    }

    /// The store's capabilities intersected with the principal's rights.
    pub fn capabilities(&self) -> SecurityResult<Capabilities> {
        let _unit = self.item.scope().enter();
        let base = self.base.capabilities();
        let update = self.item.can_update()?;
        Ok(Capabilities {
            add_allowed: base.add_allowed && update && self.item.can_create()?,
            delete_allowed: base.delete_allowed && update && self.item.can_delete()?,
        })
    }

    // ── Single-statement writes ──────────────────────────────────────────────

    pub fn add(&self, statement: Statement) -> SecurityResult<()> {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Create)?;
        self.item.check_update()?;
        self.item.check_create_triple(&statement.to_triple())?;
        self.base.add(statement)
    }

    pub fn delete(&self, statement: &Statement) -> SecurityResult<()> {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Delete)?;
        self.item.check_update()?;
        self.item.check_delete_triple(&statement.to_triple())?;
        self.base.delete(statement)
    }

    /// Replace `from` with `to`, governed by the evaluator's update decision.
    pub fn update(&self, from: &Statement, to: Statement) -> SecurityResult<()> {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Delete)?;
        self.require_capability(Action::Create)?;
        self.item.check_update()?;
        self.item
            .check_update_triple(&from.to_triple(), &to.to_triple())?;
        self.base.delete(from)?;
        self.base.add(to)
    }

    // ── Bulk writes ──────────────────────────────────────────────────────────

    /// Add every statement, authorizing all of them before the store sees any.
    pub fn add_all<I>(&self, statements: I) -> SecurityResult<()>
    where
        I: IntoIterator<Item = Statement>,
    {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Create)?;
        let batch = BulkAuthorizer::new(&self.item).collect_authorized(Action::Create, statements)?;
        self.base.add_all(batch)
    }

    /// Delete every statement, authorizing all of them before the store sees any.
    pub fn delete_all<I>(&self, statements: I) -> SecurityResult<()>
    where
        I: IntoIterator<Item = Statement>,
    {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Delete)?;
        let batch = BulkAuthorizer::new(&self.item).collect_authorized(Action::Delete, statements)?;
        self.base.delete_all(&batch)
    }

    /// Remove `removed` and then add `added`.
    ///
    /// Every deletion and every creation is authorized before the store sees
    /// either batch; one denied statement leaves the store untouched.
    pub fn replace_all<R, A>(&self, removed: R, added: A) -> SecurityResult<()>
    where
        R: IntoIterator<Item = Statement>,
        A: IntoIterator<Item = Statement>,
    {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Delete)?;
        self.require_capability(Action::Create)?;
        let removed: Vec<Statement> = removed.into_iter().collect();
        let added: Vec<Statement> = added.into_iter().collect();
        BulkAuthorizer::new(&self.item).authorize_replace(&removed, &added)?;
        self.base.delete_all(&removed)?;
        self.base.add_all(added)
    }

    /// Copy every statement of `other` into this graph.
    ///
    /// `other` may itself be secured, in which case only what it lets the
    /// current principal read is copied.
    pub fn add_graph(&self, other: &dyn Graph) -> SecurityResult<()> {
        self.add_all(other.find(&Statement::ANY)?)
    }

    /// Delete every statement matching `pattern`.
    ///
    /// If deleting the pattern itself is permitted the matches are removed
    /// without per-statement checks; otherwise each match must be deletable
    /// and the first that is not aborts the whole removal.
    pub fn remove(&self, pattern: &Statement) -> SecurityResult<()> {
        let _unit = self.item.scope().enter();
        self.require_capability(Action::Delete)?;
        self.item.check_update()?;
        let matches: Vec<Statement> = self.base.find(pattern)?.collect();
        if !self.item.can_delete_triple(&pattern.to_triple())? {
            BulkAuthorizer::new(&self.item).authorize_delete(&matches)?;
        }
        self.base.delete_all(&matches)
    }

    /// Delete everything.
    pub fn clear(&self) -> SecurityResult<()> {
        self.remove(&Statement::ANY)
    }

    // ── Events ───────────────────────────────────────────────────────────────

    /// Register `listener`, capturing the current principal.
    ///
    /// Later notifications are filtered with the captured principal's read
    /// rights, not those of whoever makes the change.
    pub fn register_listener(&self, listener: Rc<dyn GraphListener>) -> ListenerId {
        let secured = SecuredListener::capture(&self.item, listener);
        self.base.register_listener(Rc::new(secured))
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.base.unregister_listener(id)
    }

    /// A store without the capability denies as firmly as a policy would.
    fn require_capability(&self, action: Action) -> SecurityResult<()> {
        let caps = self.base.capabilities();
        let supported = match action {
            Action::Create => caps.add_allowed,
            Action::Delete => caps.delete_allowed,
            Action::Read | Action::Update => true,
        };
        if supported {
            Ok(())
        } else {
            Err(SecurityError::denied_with(
                self.graph_id(),
                action,
                "not supported by the underlying store",
            ))
        }
    }
}

/// A secured graph is itself a `Graph`, so it substitutes for its store:
/// it can be wrapped again, copied from, or queried.
impl<G: Graph> Graph for SecuredGraph<G> {
    fn add(&self, statement: Statement) -> SecurityResult<()> {
        SecuredGraph::add(self, statement)
    }

    fn delete(&self, statement: &Statement) -> SecurityResult<()> {
        SecuredGraph::delete(self, statement)
    }

    fn add_all(&self, statements: Vec<Statement>) -> SecurityResult<()> {
        SecuredGraph::add_all(self, statements)
    }

    fn delete_all(&self, statements: &[Statement]) -> SecurityResult<()> {
        SecuredGraph::delete_all(self, statements.iter().cloned())
    }

    fn find(&self, pattern: &Statement) -> SecurityResult<StatementIter> {
        Ok(Box::new(SecuredGraph::find(self, pattern)?))
    }

    fn contains(&self, pattern: &Statement) -> SecurityResult<bool> {
        SecuredGraph::contains(self, pattern)
    }

    fn size(&self) -> SecurityResult<usize> {
        SecuredGraph::size(self)
    }

    /// Missing rights read as missing capabilities.
    fn capabilities(&self) -> Capabilities {
        SecuredGraph::capabilities(self).unwrap_or(Capabilities {
            add_allowed: false,
            delete_allowed: false,
        })
    }

    fn register_listener(&self, listener: Rc<dyn GraphListener>) -> ListenerId {
        SecuredGraph::register_listener(self, listener)
    }

    fn unregister_listener(&self, id: ListenerId) -> bool {
        SecuredGraph::unregister_listener(self, id)
    }
}

/// Two secured graphs are equal when they wrap the same store instance with
/// the same evaluator instance under the same graph identity.
impl<G: Graph> PartialEq for SecuredGraph<G> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.base, &other.base)
            && evaluator_addr(&self.item) == evaluator_addr(&other.item)
            && self.graph_id() == other.graph_id()
    }
}

impl<G: Graph> Eq for SecuredGraph<G> {}

impl<G: Graph> Hash for SecuredGraph<G> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.base) as *const ()).hash(state);
        evaluator_addr(&self.item).hash(state);
        self.graph_id().hash(state);
    }
}

impl<G: Graph> std::fmt::Debug for SecuredGraph<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuredGraph")
            .field("graph_id", self.graph_id())
            .field("item", &self.item)
            .finish()
    }
}

fn evaluator_addr(item: &SecuredItem) -> *const () {
    Arc::as_ptr(item.evaluator()) as *const ()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use graphward_contracts::{identity::Principal, node::Node, term::Term};

    use super::*;
    use crate::{memory::MemGraph, traits::GraphEvent};

    /// Per-principal policy: which subjects each principal may not touch,
    /// and whether they may write at all.
    #[derive(Default)]
    struct PrincipalPolicy {
        current: Mutex<Option<Principal>>,
        hidden: HashMap<&'static str, Vec<&'static str>>,
        writers: Vec<&'static str>,
        update_triple: bool,
        triple_calls: Mutex<u32>,
    }

    impl PrincipalPolicy {
        fn login(&self, who: &str) {
            *self.current.lock().unwrap() = Some(Principal::new(who));
        }

        fn hidden_for(&self, p: Option<&Principal>) -> &[&'static str] {
            p.and_then(|p| self.hidden.get(p.name()))
                .map(Vec::as_slice)
                .unwrap_or(&[])
        }
    }

    impl SecurityEvaluator for PrincipalPolicy {
        fn evaluate(&self, p: Option<&Principal>, a: Action, _g: &GraphId) -> bool {
            match a {
                Action::Read => p.is_some(),
                _ => p.map(|p| self.writers.iter().any(|w| *w == p.name())).unwrap_or(false),
            }
        }

        fn evaluate_triple(&self, p: Option<&Principal>, _a: Action, _g: &GraphId, t: &Triple) -> bool {
            *self.triple_calls.lock().unwrap() += 1;
            let hidden = self.hidden_for(p);
            if !t.subject.is_concrete() {
                return hidden.is_empty();
            }
            !hidden.iter().any(|h| t.subject == Node::uri(*h))
        }

        fn evaluate_update(&self, _p: Option<&Principal>, _g: &GraphId, _f: &Triple, _t: &Triple) -> bool {
            self.update_triple
        }

        fn principal(&self) -> Option<Principal> {
            self.current.lock().unwrap().clone()
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
        Statement::new(Term::iri(s), Term::iri("type"), Term::iri("C"))
    }

    fn seeded() -> Rc<MemGraph> {
        Rc::new(MemGraph::from_statements(vec![st("r1"), st("r2"), st("r3")]))
    }

    fn secured(base: Rc<MemGraph>, policy: Arc<PrincipalPolicy>) -> SecuredGraph<MemGraph> {
        SecuredGraph::new(base, policy, GraphId::new("urn:g"), DecisionScope::default())
    }

    fn alice_hides_r2() -> Arc<PrincipalPolicy> {
        let policy = PrincipalPolicy {
            hidden: HashMap::from([("alice", vec!["r2"])]),
            writers: vec!["alice", "bob"],
            ..Default::default()
        };
        policy.login("alice");
        Arc::new(policy)
    }

    #[test]
    fn equality_is_store_evaluator_and_graph() {
        let base = seeded();
        let policy = alice_hides_r2();
        let a = secured(base.clone(), policy.clone());
        let b = secured(base.clone(), policy.clone());
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));

        let other_store = secured(seeded(), policy.clone());
        assert_ne!(b, other_store, "equal contents, different store instance");

        let other_eval = secured(base.clone(), alice_hides_r2());
        assert_ne!(b, other_eval);

        let other_graph = SecuredGraph::new(base, policy, GraphId::new("urn:h"), DecisionScope::default());
        assert_ne!(b, other_graph);
    }

    #[test]
    fn find_size_and_contains_see_only_readable_statements() {
        let g = secured(seeded(), alice_hides_r2());

        let subjects: Vec<Term> = g.find(&Statement::ANY).unwrap().map(|s| s.subject).collect();
        assert_eq!(subjects, vec![Term::iri("r1"), Term::iri("r3")]);
        assert_eq!(g.size().unwrap(), 2);
        assert!(!g.is_empty().unwrap());

        assert!(g.contains(&st("r1")).unwrap());
        assert!(!g.contains(&st("r2")).unwrap(), "hidden statement reads as absent");
    }

    #[test]
    fn anonymous_caller_is_denied_eagerly() {
        let g = secured(seeded(), Arc::new(PrincipalPolicy::default()));
        match g.size() {
            Err(SecurityError::PermissionDenied { action, .. }) => assert_eq!(action, Action::Read),
            other => panic!("expected Read denial, got {:?}", other),
        }
        assert!(g.find(&Statement::ANY).is_err());
    }

    #[test]
    fn add_checks_update_and_create_before_the_store() {
        let base = seeded();
        let g = secured(base.clone(), alice_hides_r2());

        g.add(st("r4")).unwrap();
        assert!(base.contains(&st("r4")).unwrap());

        let err = g.add(Statement::new(Term::iri("r2"), Term::iri("p"), Term::literal("x")));
        assert!(err.unwrap_err().is_permission_denied());
        assert_eq!(base.size().unwrap(), 4, "denied add never reached the store");
    }

    #[test]
    fn bulk_add_is_all_or_nothing() {
        let base = Rc::new(MemGraph::new());
        let g = secured(base.clone(), alice_hides_r2());

        let result = g.add_all(vec![st("r1"), st("r2"), st("r3")]);
        assert!(result.unwrap_err().is_permission_denied());
        assert_eq!(base.size().unwrap(), 0);

        g.add_all(vec![st("r1"), st("r3")]).unwrap();
        assert_eq!(base.size().unwrap(), 2);
    }

    #[test]
    fn remove_pattern_fails_on_any_protected_match() {
        let base = seeded();
        let g = secured(base.clone(), alice_hides_r2());

        assert!(g.clear().unwrap_err().is_permission_denied());
        assert_eq!(base.size().unwrap(), 3);

        g.remove(&Statement::new(Term::iri("r1"), Term::Any, Term::Any)).unwrap();
        assert_eq!(base.snapshot(), vec![st("r2"), st("r3")]);
    }

    #[test]
    fn update_is_governed_by_the_update_decision() {
        let base = seeded();
        let mut policy = PrincipalPolicy {
            writers: vec!["alice"],
            ..Default::default()
        };
        policy.login("alice");
        let denied = secured(base.clone(), Arc::new(policy));
        assert!(denied.update(&st("r1"), st("r9")).unwrap_err().is_permission_denied());
        assert!(base.contains(&st("r1")).unwrap());

        policy = PrincipalPolicy {
            writers: vec!["alice"],
            update_triple: true,
            ..Default::default()
        };
        policy.login("alice");
        let allowed = secured(base.clone(), Arc::new(policy));
        allowed.update(&st("r1"), st("r9")).unwrap();
        assert!(!base.contains(&st("r1")).unwrap());
        assert!(base.contains(&st("r9")).unwrap());
    }

    #[test]
    fn read_only_store_denies_writes_and_reports_capabilities() {
        let base = Rc::new(MemGraph::new().with_capabilities(Capabilities {
            add_allowed: false,
            delete_allowed: true,
        }));
        let g = secured(base, alice_hides_r2());

        match g.add(st("r1")) {
            Err(SecurityError::PermissionDenied { action, detail, .. }) => {
                assert_eq!(action, Action::Create);
                assert!(detail.is_some());
            }
            other => panic!("expected Create denial, got {:?}", other),
        }
        let caps = g.capabilities().unwrap();
        assert!(!caps.add_allowed);
        assert!(caps.delete_allowed);
    }

    #[test]
    fn each_operation_releases_its_unit_of_work() {
        let g = secured(seeded(), alice_hides_r2());
        g.size().unwrap();
        g.contains(&st("r1")).unwrap();
        g.add(st("r4")).unwrap();
        assert!(!g.item().scope().is_active());
    }

    #[test]
    fn outer_unit_of_work_shares_decisions_across_calls() {
        let policy = alice_hides_r2();
        let g = secured(seeded(), policy.clone());

        let _unit = g.item().scope().enter();
        g.size().unwrap();
        let after_first = *policy.triple_calls.lock().unwrap();
        g.size().unwrap();
        assert_eq!(*policy.triple_calls.lock().unwrap(), after_first);
    }

    #[test]
    fn listener_keeps_the_registrants_identity() {
        let policy = PrincipalPolicy {
            hidden: HashMap::from([("alice", vec!["r2"])]),
            writers: vec!["alice", "bob"],
            ..Default::default()
        };
        policy.login("alice");
        let policy = Arc::new(policy);
        let g = secured(Rc::new(MemGraph::new()), policy.clone());

        let rec = Rc::new(Recorder {
            events: RefCell::new(vec![]),
        });
        let id = g.register_listener(rec.clone());

        // Bob may see and write everything; alice's filter must still apply.
        policy.login("bob");
        g.add_all(vec![st("r1"), st("r2"), st("r3")]).unwrap();
        g.add(st("r2b")).unwrap();
        g.delete(&st("r2")).unwrap();

        {
            let events = rec.events.borrow();
            assert_eq!(
                *events,
                vec![
                    GraphEvent::Added(vec![st("r1"), st("r3")]),
                    GraphEvent::Added(vec![st("r2b")]),
                ],
                "the r2 deletion is invisible to alice and not delivered"
            );
        }

        assert!(g.unregister_listener(id));
        g.add(st("r5")).unwrap();
        assert_eq!(rec.events.borrow().len(), 2);
    }

    #[test]
    fn listener_without_graph_read_receives_nothing() {
        let policy = Arc::new(PrincipalPolicy {
            writers: vec!["bob"],
            ..Default::default()
        });
        let g = secured(Rc::new(MemGraph::new()), policy.clone());
        let rec = Rc::new(Recorder {
            events: RefCell::new(vec![]),
        });
        // Registered anonymously.
        g.register_listener(rec.clone());

        policy.login("bob");
        g.add(st("r1")).unwrap();
        assert!(rec.events.borrow().is_empty());
    }

    #[test]
    fn replace_all_authorizes_both_batches_before_writing() {
        let base = seeded();
        let g = secured(base.clone(), alice_hides_r2());

        let denied = g.replace_all(vec![st("r1")], vec![st("r4"), st("r2")]);
        assert!(denied.unwrap_err().is_permission_denied());
        assert_eq!(base.snapshot(), vec![st("r1"), st("r2"), st("r3")], "nothing removed or added");

        g.replace_all(vec![st("r1")], vec![st("r4")]).unwrap();
        assert_eq!(base.snapshot(), vec![st("r2"), st("r3"), st("r4")]);
    }

    #[test]
    fn secured_graph_copies_only_what_it_lets_the_caller_read() {
        let policy = alice_hides_r2();
        let source = secured(seeded(), policy.clone());
        let target_base = Rc::new(MemGraph::new());
        let target = secured(target_base.clone(), policy);

        target.add_graph(&source).unwrap();
        assert_eq!(target_base.snapshot(), vec![st("r1"), st("r3")]);
    }

    #[test]
    fn secured_graph_stands_in_for_its_store() {
        let policy = alice_hides_r2();
        let inner = Rc::new(secured(seeded(), policy.clone()));
        let outer = SecuredGraph::new(inner, policy, GraphId::new("urn:g"), DecisionScope::default());

        let as_store: &dyn Graph = &outer;
        let seen: Vec<Statement> = as_store.find(&Statement::ANY).unwrap().collect();
        assert_eq!(seen, vec![st("r1"), st("r3")]);
        assert_eq!(as_store.size().unwrap(), 2);
        assert!(as_store.capabilities().add_allowed);

        let anonymous = secured(seeded(), Arc::new(PrincipalPolicy::default()));
        let as_store: &dyn Graph = &anonymous;
        assert!(as_store.find(&Statement::ANY).is_err());
        assert_eq!(
            as_store.capabilities(),
            Capabilities {
                add_allowed: false,
                delete_allowed: false
            }
        );
    }
}
