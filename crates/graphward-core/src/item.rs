//! The authorization facade every secured wrapper delegates to.
//!
//! `SecuredItem` exposes the full action × granularity matrix:
//!
//! - `can_*`   → consult the decision cache, else the evaluator, cache the answer
//! - `check_*` → call the matching `can_*` and turn `false` into
//!   `SecurityError::PermissionDenied`
//!
//! Graph-level forms take no triple. Triple-level forms take a `Triple`, or
//! a from/to pair for updates. Bulk forms consume a lazy sequence and drop it
//! on every exit path so store resources are released even on denial.
//!
//! All cache access requires an active unit of work on the item's
//! [`DecisionScope`]; the secured wrappers open one per operation.

use std::sync::Arc;

use tracing::warn;

use graphward_contracts::{
    action::{Action, ActionSet},
    error::{SecurityError, SecurityResult},
    identity::{GraphId, Principal},
    term::Statement,
    triple::Triple,
};

use crate::{
    cache::{CacheKey, DecisionScope, Quantifier},
    traits::SecurityEvaluator,
};

/// Whose permissions an item evaluates.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Identity {
    /// Ask the evaluator for its principal at each check.
    Current,
    /// A principal fixed when the item was derived (listener registration).
    Captured(Option<Principal>),
}

/// The security context of one protected graph: evaluator, graph identity,
/// decision scope and the identity checks run as.
#[derive(Clone)]
pub struct SecuredItem {
    evaluator: Arc<dyn SecurityEvaluator>,
    graph_id: GraphId,
    scope: DecisionScope,
    identity: Identity,
}

impl SecuredItem {
    pub fn new(evaluator: Arc<dyn SecurityEvaluator>, graph_id: GraphId, scope: DecisionScope) -> Self {
        Self {
            evaluator,
            graph_id,
            scope,
            identity: Identity::Current,
        }
    }

    /// A copy of this item that always evaluates as `principal`.
    pub fn run_as(&self, principal: Option<Principal>) -> Self {
        Self {
            identity: Identity::Captured(principal),
            ..self.clone()
        }
    }

    /// A copy of this item scoped to another graph.
    pub fn for_graph(&self, graph_id: GraphId) -> Self {
        Self {
            graph_id,
            ..self.clone()
        }
    }

    /// The principal checks are evaluated for.
    pub fn principal(&self) -> Option<Principal> {
        match &self.identity {
            Identity::Current => self.evaluator.principal(),
            Identity::Captured(p) => p.clone(),
        }
    }

    pub fn evaluator(&self) -> &Arc<dyn SecurityEvaluator> {
        &self.evaluator
    }

    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    pub fn scope(&self) -> &DecisionScope {
        &self.scope
    }

    // ── Graph level ──────────────────────────────────────────────────────────

    /// May the principal perform `action` on this graph at all?
    pub fn can(&self, action: Action) -> SecurityResult<bool> {
        self.can_all(&ActionSet::single(action))
    }

    /// True iff every action in `actions` is permitted on this graph.
    pub fn can_all(&self, actions: &ActionSet) -> SecurityResult<bool> {
        let principal = self.principal();
        let key = CacheKey::graph(actions.clone(), Quantifier::All, &self.graph_id, principal.as_ref());
        self.scope.get_or_evaluate(key, || {
            self.evaluator
                .evaluate_all(principal.as_ref(), actions, &self.graph_id)
        })
    }

    /// True iff at least one action in `actions` is permitted on this graph.
    pub fn can_any(&self, actions: &ActionSet) -> SecurityResult<bool> {
        let principal = self.principal();
        let key = CacheKey::graph(actions.clone(), Quantifier::Any, &self.graph_id, principal.as_ref());
        self.scope.get_or_evaluate(key, || {
            self.evaluator
                .evaluate_any(principal.as_ref(), actions, &self.graph_id)
        })
    }

    pub fn can_create(&self) -> SecurityResult<bool> {
        self.can(Action::Create)
    }

    pub fn can_read(&self) -> SecurityResult<bool> {
        self.can(Action::Read)
    }

    pub fn can_update(&self) -> SecurityResult<bool> {
        self.can(Action::Update)
    }

    pub fn can_delete(&self) -> SecurityResult<bool> {
        self.can(Action::Delete)
    }

    pub fn check(&self, action: Action) -> SecurityResult<()> {
        if self.can(action)? {
            Ok(())
        } else {
            warn!(graph = %self.graph_id, action = %action, "graph-level permission denied");
            Err(SecurityError::denied(&self.graph_id, action))
        }
    }

    pub fn check_create(&self) -> SecurityResult<()> {
        self.check(Action::Create)
    }

    pub fn check_read(&self) -> SecurityResult<()> {
        self.check(Action::Read)
    }

    pub fn check_update(&self) -> SecurityResult<()> {
        self.check(Action::Update)
    }

    pub fn check_delete(&self) -> SecurityResult<()> {
        self.check(Action::Delete)
    }

    // ── Triple level ─────────────────────────────────────────────────────────

    /// May the principal perform `action` on `triple`?
    pub fn can_triple(&self, action: Action, triple: &Triple) -> SecurityResult<bool> {
        self.can_all_triple(&ActionSet::single(action), triple)
    }

    pub fn can_all_triple(&self, actions: &ActionSet, triple: &Triple) -> SecurityResult<bool> {
        let principal = self.principal();
        let key = CacheKey::triple(
            actions.clone(),
            Quantifier::All,
            &self.graph_id,
            principal.as_ref(),
            triple,
        );
        self.scope.get_or_evaluate(key, || {
            self.evaluator
                .evaluate_all_triple(principal.as_ref(), actions, &self.graph_id, triple)
        })
    }

    pub fn can_any_triple(&self, actions: &ActionSet, triple: &Triple) -> SecurityResult<bool> {
        let principal = self.principal();
        let key = CacheKey::triple(
            actions.clone(),
            Quantifier::Any,
            &self.graph_id,
            principal.as_ref(),
            triple,
        );
        self.scope.get_or_evaluate(key, || {
            self.evaluator
                .evaluate_any_triple(principal.as_ref(), actions, &self.graph_id, triple)
        })
    }

    pub fn can_create_triple(&self, triple: &Triple) -> SecurityResult<bool> {
        self.can_triple(Action::Create, triple)
    }

    pub fn can_read_triple(&self, triple: &Triple) -> SecurityResult<bool> {
        self.can_triple(Action::Read, triple)
    }

    pub fn can_delete_triple(&self, triple: &Triple) -> SecurityResult<bool> {
        self.can_triple(Action::Delete, triple)
    }

    /// May `from` be replaced by `to`?
    ///
    /// Governed solely by `SecurityEvaluator::evaluate_update`, never by
    /// combining delete and create answers.
    pub fn can_update_triple(&self, from: &Triple, to: &Triple) -> SecurityResult<bool> {
        let principal = self.principal();
        let key = CacheKey::update(&self.graph_id, principal.as_ref(), from, to);
        self.scope.get_or_evaluate(key, || {
            self.evaluator
                .evaluate_update(principal.as_ref(), &self.graph_id, from, to)
        })
    }

    /// Store-native convenience for `can_read_triple`.
    pub fn can_read_statement(&self, statement: &Statement) -> SecurityResult<bool> {
        self.can_read_triple(&statement.to_triple())
    }

    pub fn check_triple(&self, action: Action, triple: &Triple) -> SecurityResult<()> {
        if self.can_triple(action, triple)? {
            Ok(())
        } else {
            warn!(graph = %self.graph_id, action = %action, triple = %triple, "triple-level permission denied");
            Err(SecurityError::denied_with(&self.graph_id, action, triple.to_string()))
        }
    }

    pub fn check_create_triple(&self, triple: &Triple) -> SecurityResult<()> {
        self.check_triple(Action::Create, triple)
    }

    pub fn check_read_triple(&self, triple: &Triple) -> SecurityResult<()> {
        self.check_triple(Action::Read, triple)
    }

    pub fn check_delete_triple(&self, triple: &Triple) -> SecurityResult<()> {
        self.check_triple(Action::Delete, triple)
    }

    pub fn check_update_triple(&self, from: &Triple, to: &Triple) -> SecurityResult<()> {
        if self.can_update_triple(from, to)? {
            Ok(())
        } else {
            let detail = format!("from {} to {}", from, to);
            warn!(graph = %self.graph_id, detail = %detail, "update permission denied");
            Err(SecurityError::denied_with(&self.graph_id, Action::Update, detail))
        }
    }

    // ── Bulk ─────────────────────────────────────────────────────────────────

    /// Check `action` on every triple of `triples`, in order, stopping at the
    /// first denial.
    ///
    /// The sequence is consumed and dropped before this returns, whether it
    /// was exhausted, abandoned on a denial, or abandoned on another error.
    pub fn check_each<I>(&self, action: Action, triples: I) -> SecurityResult<()>
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut iter = triples.into_iter();
        iter.try_for_each(|t| self.check_triple(action, &t))
    }

    /// True iff `action` is permitted on every triple of `triples`.
    ///
    /// Stops at the first refusal; the sequence is dropped on every path.
    pub fn can_each<I>(&self, action: Action, triples: I) -> SecurityResult<bool>
    where
        I: IntoIterator<Item = Triple>,
    {
        for t in triples {
            if !self.can_triple(action, &t)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_create_each<I>(&self, triples: I) -> SecurityResult<()>
    where
        I: IntoIterator<Item = Triple>,
    {
        self.check_each(Action::Create, triples)
    }

    pub fn check_delete_each<I>(&self, triples: I) -> SecurityResult<()>
    where
        I: IntoIterator<Item = Triple>,
    {
        self.check_each(Action::Delete, triples)
    }

    pub fn can_read_each<I>(&self, triples: I) -> SecurityResult<bool>
    where
        I: IntoIterator<Item = Triple>,
    {
        self.can_each(Action::Read, triples)
    }
}

impl std::fmt::Debug for SecuredItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuredItem")
            .field("graph_id", &self.graph_id)
            .field("identity", &self.identity)
            .field("scope", &self.scope)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Mutex;

    use graphward_contracts::node::Node;

    use super::*;

    /// An evaluator that records every call and answers from closures.
    struct MockEvaluator {
        graph_allowed: bool,
        triple_allowed: Box<dyn Fn(Action, &Triple) -> bool + Send + Sync>,
        update_allowed: bool,
        triple_calls: Mutex<Vec<(Action, Triple)>>,
        update_calls: Mutex<u32>,
        principal: Mutex<Option<Principal>>,
    }

    impl MockEvaluator {
        fn new(triple_allowed: impl Fn(Action, &Triple) -> bool + Send + Sync + 'static) -> Self {
            Self {
                graph_allowed: true,
                triple_allowed: Box::new(triple_allowed),
                update_allowed: true,
                triple_calls: Mutex::new(vec![]),
                update_calls: Mutex::new(0),
                principal: Mutex::new(None),
            }
        }

        fn calls_for(&self, triple: &Triple) -> usize {
            self.triple_calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, t)| t == triple)
                .count()
        }
    }

    impl SecurityEvaluator for MockEvaluator {
        fn evaluate(&self, _p: Option<&Principal>, _a: Action, _g: &GraphId) -> bool {
            self.graph_allowed
        }

        fn evaluate_triple(&self, _p: Option<&Principal>, a: Action, _g: &GraphId, t: &Triple) -> bool {
            self.triple_calls.lock().unwrap().push((a, t.clone()));
            (self.triple_allowed)(a, t)
        }

        fn evaluate_update(&self, _p: Option<&Principal>, _g: &GraphId, _f: &Triple, _t: &Triple) -> bool {
            *self.update_calls.lock().unwrap() += 1;
            self.update_allowed
        }

        fn principal(&self) -> Option<Principal> {
            self.principal.lock().unwrap().clone()
        }
    }

    fn t(s: &str) -> Triple {
        Triple::new(Node::uri(s), Node::uri("p"), Node::literal("o"))
    }

    fn item(evaluator: Arc<MockEvaluator>) -> SecuredItem {
        SecuredItem::new(evaluator, GraphId::new("urn:g"), DecisionScope::default())
    }

    #[test]
    fn repeated_can_read_hits_evaluator_once() {
        let eval = Arc::new(MockEvaluator::new(|_, _| true));
        let item = item(eval.clone());
        let _unit = item.scope().enter();

        for _ in 0..10 {
            assert!(item.can_read_triple(&t("s1")).unwrap());
        }
        assert_eq!(eval.calls_for(&t("s1")), 1, "cached decision must not re-query the oracle");
    }

    #[test]
    fn cache_does_not_outlive_the_unit_of_work() {
        let eval = Arc::new(MockEvaluator::new(|_, _| true));
        let item = item(eval.clone());
        {
            let _unit = item.scope().enter();
            item.can_read_triple(&t("s1")).unwrap();
        }
        {
            let _unit = item.scope().enter();
            item.can_read_triple(&t("s1")).unwrap();
        }
        assert_eq!(eval.calls_for(&t("s1")), 2);
    }

    #[test]
    fn can_without_unit_of_work_is_scope_misuse() {
        let item = item(Arc::new(MockEvaluator::new(|_, _| true)));
        assert!(matches!(
            item.can_read(),
            Err(SecurityError::ScopeMisuse { .. })
        ));
    }

    #[test]
    fn check_raises_typed_denial() {
        let eval = Arc::new(MockEvaluator::new(|a, _| a != Action::Delete));
        let item = item(eval);
        let _unit = item.scope().enter();

        item.check_create_triple(&t("s1")).unwrap();
        match item.check_delete_triple(&t("s1")) {
            Err(SecurityError::PermissionDenied { graph, action, detail }) => {
                assert_eq!(graph, GraphId::new("urn:g"));
                assert_eq!(action, Action::Delete);
                assert!(detail.unwrap().contains("<s1>"));
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
    }

    #[test]
    fn graph_level_denial_has_no_detail() {
        let mut eval = MockEvaluator::new(|_, _| true);
        eval.graph_allowed = false;
        let item = item(Arc::new(eval));
        let _unit = item.scope().enter();

        match item.check_read() {
            Err(SecurityError::PermissionDenied { action, detail, .. }) => {
                assert_eq!(action, Action::Read);
                assert!(detail.is_none());
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
    }

    #[test]
    fn update_uses_evaluate_update_exclusively() {
        // Delete and create are both refused, yet update is granted.
        let eval = Arc::new(MockEvaluator::new(|a, _| {
            !matches!(a, Action::Delete | Action::Create)
        }));
        let item = item(eval.clone());
        let _unit = item.scope().enter();

        assert!(item.can_update_triple(&t("old"), &t("new")).unwrap());
        assert_eq!(*eval.update_calls.lock().unwrap(), 1);
        assert!(
            eval.triple_calls.lock().unwrap().is_empty(),
            "update must not consult delete/create"
        );
    }

    #[test]
    fn update_denial_renders_from_and_to() {
        let mut eval = MockEvaluator::new(|_, _| true);
        eval.update_allowed = false;
        let item = item(Arc::new(eval));
        let _unit = item.scope().enter();

        match item.check_update_triple(&t("old"), &t("new")) {
            Err(SecurityError::PermissionDenied { action, detail, .. }) => {
                assert_eq!(action, Action::Update);
                let detail = detail.unwrap();
                assert!(detail.contains("from [<old>"));
                assert!(detail.contains("to [<new>"));
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
    }

    #[test]
    fn all_and_any_semantics() {
        let eval = Arc::new(MockEvaluator::new(|a, _| a == Action::Read));
        let item = item(eval);
        let _unit = item.scope().enter();
        let both: ActionSet = [Action::Read, Action::Create].into();

        assert!(!item.can_all_triple(&both, &t("s")).unwrap());
        assert!(item.can_any_triple(&both, &t("s")).unwrap());
    }

    #[test]
    fn run_as_fixes_the_principal() {
        let eval = Arc::new(MockEvaluator::new(|_, _| true));
        *eval.principal.lock().unwrap() = Some(Principal::new("alice"));
        let base = item(eval.clone());
        let captured = base.run_as(base.principal());

        *eval.principal.lock().unwrap() = Some(Principal::new("bob"));

        assert_eq!(base.principal(), Some(Principal::new("bob")));
        assert_eq!(captured.principal(), Some(Principal::new("alice")));
    }

    /// An iterator that records whether it was dropped.
    struct TrackedIter {
        items: std::vec::IntoIter<Triple>,
        released: Rc<Cell<bool>>,
        yielded: Rc<Cell<usize>>,
    }

    impl Iterator for TrackedIter {
        type Item = Triple;

        fn next(&mut self) -> Option<Triple> {
            let next = self.items.next();
            if next.is_some() {
                self.yielded.set(self.yielded.get() + 1);
            }
            next
        }
    }

    impl Drop for TrackedIter {
        fn drop(&mut self) {
            self.released.set(true);
        }
    }

    #[test]
    fn bulk_check_stops_at_first_denial_and_releases_sequence() {
        let eval = Arc::new(MockEvaluator::new(|_, t| t.subject != Node::uri("t2")));
        let item = item(eval.clone());
        let _unit = item.scope().enter();

        let released = Rc::new(Cell::new(false));
        let yielded = Rc::new(Cell::new(0));
        let iter = TrackedIter {
            items: vec![t("t1"), t("t2"), t("t3")].into_iter(),
            released: released.clone(),
            yielded: yielded.clone(),
        };

        let result = item.check_create_each(iter);

        assert!(result.unwrap_err().is_permission_denied());
        assert!(released.get(), "sequence must be released on denial");
        assert_eq!(yielded.get(), 2, "t3 must never be pulled");
        assert_eq!(eval.calls_for(&t("t3")), 0);
    }

    #[test]
    fn bulk_check_releases_sequence_on_success() {
        let eval = Arc::new(MockEvaluator::new(|_, _| true));
        let item = item(eval);
        let _unit = item.scope().enter();

        let released = Rc::new(Cell::new(false));
        let iter = TrackedIter {
            items: vec![t("a"), t("b")].into_iter(),
            released: released.clone(),
            yielded: Rc::new(Cell::new(0)),
        };
        item.check_create_each(iter).unwrap();
        assert!(released.get());
    }

    #[test]
    fn can_read_each_short_circuits() {
        let eval = Arc::new(MockEvaluator::new(|_, t| t.subject != Node::uri("x")));
        let item = item(eval.clone());
        let _unit = item.scope().enter();

        assert!(!item.can_read_each(vec![t("x"), t("y")]).unwrap());
        assert_eq!(eval.calls_for(&t("y")), 0);
        assert!(item.can_read_each(vec![t("y"), t("z")]).unwrap());
    }
}
