//! Core trait definitions for the graphward authorization layer.
//!
//! Two collaborators sit on either side of the trust boundary:
//!
//! - `SecurityEvaluator`: the trusted policy oracle, injected by the host
//! - `Graph`: the store, unaware of security
//!
//! Secured wrappers never call a `Graph` mutator or reader until the
//! evaluator has allowed the operation. `SecuredGraph` implements `Graph`
//! itself, so secured graphs nest and substitute for plain stores.

use std::rc::Rc;

use graphward_contracts::{
    action::{Action, ActionSet},
    error::SecurityResult,
    identity::{GraphId, Principal},
    term::Statement,
    triple::Triple,
};

/// The policy oracle.
///
/// Implementations answer "may `principal` perform `action` on `graph`
/// (optionally restricted to `triple`)". They never raise a denial: a
/// refusal is `false`. Only the secured wrappers turn `false` into
/// `SecurityError::PermissionDenied`.
///
/// Implementations may perform I/O, but must answer consistently for the
/// duration of one unit of work; answers are cached for that long.
pub trait SecurityEvaluator: Send + Sync {
    /// Graph-level permission.
    fn evaluate(&self, principal: Option<&Principal>, action: Action, graph: &GraphId) -> bool;

    /// Triple-level permission.
    ///
    /// When any position of `triple` is `Node::ANY`, the answer must hold for
    /// every value that position could take: return `true` only if no
    /// restriction depends on a concrete value there. In particular
    /// `evaluate_triple(.., &Triple::ANY)` is `true` iff there are no
    /// triple-level restrictions at all for `action`.
    fn evaluate_triple(
        &self,
        principal: Option<&Principal>,
        action: Action,
        graph: &GraphId,
        triple: &Triple,
    ) -> bool;

    /// True iff every action in `actions` is permitted on the graph.
    fn evaluate_all(&self, principal: Option<&Principal>, actions: &ActionSet, graph: &GraphId) -> bool {
        actions.iter().all(|a| self.evaluate(principal, a, graph))
    }

    /// True iff every action in `actions` is permitted on `triple`.
    fn evaluate_all_triple(
        &self,
        principal: Option<&Principal>,
        actions: &ActionSet,
        graph: &GraphId,
        triple: &Triple,
    ) -> bool {
        actions
            .iter()
            .all(|a| self.evaluate_triple(principal, a, graph, triple))
    }

    /// True iff at least one action in `actions` is permitted on the graph.
    fn evaluate_any(&self, principal: Option<&Principal>, actions: &ActionSet, graph: &GraphId) -> bool {
        actions.iter().any(|a| self.evaluate(principal, a, graph))
    }

    /// True iff at least one action in `actions` is permitted on `triple`.
    fn evaluate_any_triple(
        &self,
        principal: Option<&Principal>,
        actions: &ActionSet,
        graph: &GraphId,
        triple: &Triple,
    ) -> bool {
        actions
            .iter()
            .any(|a| self.evaluate_triple(principal, a, graph, triple))
    }

    /// Permission to replace `from` with `to` in one step.
    ///
    /// Independent of `Delete(from)` and `Create(to)`: an
    /// implementation may grant atomic update rights that differ from the
    /// two halves.
    fn evaluate_update(
        &self,
        principal: Option<&Principal>,
        graph: &GraphId,
        from: &Triple,
        to: &Triple,
    ) -> bool;

    /// The identity currently driving evaluation, if any.
    fn principal(&self) -> Option<Principal>;
}

/// A lazy sequence of store statements. Dropping it releases whatever the
/// store holds for it.
pub type StatementIter = Box<dyn Iterator<Item = Statement>>;

/// What the underlying store supports, independent of permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub add_allowed: bool,
    pub delete_allowed: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            add_allowed: true,
            delete_allowed: true,
        }
    }
}

/// A batch change notification raised by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    Added(Vec<Statement>),
    Deleted(Vec<Statement>),
}

impl GraphEvent {
    pub fn statements(&self) -> &[Statement] {
        match self {
            GraphEvent::Added(s) | GraphEvent::Deleted(s) => s,
        }
    }

    /// The same kind of event carrying a different batch.
    pub fn with_statements(&self, statements: Vec<Statement>) -> GraphEvent {
        match self {
            GraphEvent::Added(_) => GraphEvent::Added(statements),
            GraphEvent::Deleted(_) => GraphEvent::Deleted(statements),
        }
    }
}

/// Receives change notifications from a store's event manager.
pub trait GraphListener {
    fn notify(&self, event: &GraphEvent);
}

/// Handle returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The minimal store contract the secured wrappers need.
///
/// Store errors are reported as `SecurityError::Store` and passed through
/// the secured layer unchanged.
pub trait Graph {
    fn add(&self, statement: Statement) -> SecurityResult<()>;

    fn delete(&self, statement: &Statement) -> SecurityResult<()>;

    /// Add a batch, preserving input order.
    fn add_all(&self, statements: Vec<Statement>) -> SecurityResult<()> {
        for statement in statements {
            self.add(statement)?;
        }
        Ok(())
    }

    /// Delete a batch, preserving input order.
    fn delete_all(&self, statements: &[Statement]) -> SecurityResult<()> {
        for statement in statements {
            self.delete(statement)?;
        }
        Ok(())
    }

    /// All statements matching `pattern` (`Term::Any`/variables match anything).
    ///
    /// Fails with `PermissionDenied` when the graph is itself secured.
    fn find(&self, pattern: &Statement) -> SecurityResult<StatementIter>;

    fn contains(&self, pattern: &Statement) -> SecurityResult<bool> {
        Ok(self.find(pattern)?.next().is_some())
    }

    fn size(&self) -> SecurityResult<usize>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn register_listener(&self, listener: Rc<dyn GraphListener>) -> ListenerId;

    /// Returns false if `id` was not registered.
    fn unregister_listener(&self, id: ListenerId) -> bool;
}
