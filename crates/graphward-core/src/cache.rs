//! The decision cache and its unit-of-work scoping.
//!
//! Per-triple checks inside iteration would be unaffordable if every one
//! reached the evaluator. A `DecisionScope` memoizes answers for the
//! duration of one logical unit of work (typically one request):
//!
//! - `begin()`/`enter()` increments a reference count, creating an empty LRU
//!   cache when the count leaves zero
//! - `exit()` decrements it, dropping the cache when the count returns to zero
//! - nested units of work share the one cache
//!
//! The scope is passed explicitly to every secured wrapper. It is
//! single-thread-affine (`Rc<RefCell<_>>`), like the thread-local state it
//! replaces, so no locking is needed inside it.
//!
//! Reading or writing the cache with no active unit of work, and exiting more
//! often than entering, are `SecurityError::ScopeMisuse`.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use tracing::{debug, error, info};
use uuid::Uuid;

use graphward_contracts::{
    action::{Action, ActionSet},
    error::{SecurityError, SecurityResult},
    identity::{GraphId, Principal},
    triple::Triple,
};

use crate::config::{SecurityConfig, DEFAULT_CACHE_CAPACITY};

/// How the actions of a key combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// Every action must be permitted.
    All,
    /// At least one action must be permitted.
    Any,
}

/// A pure-value cache key.
///
/// Two keys with equal fields are interchangeable. The principal is part of
/// the key so that a listener evaluating as its captured identity never
/// reads a decision made for the active one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub actions: ActionSet,
    pub quantifier: Quantifier,
    pub graph: GraphId,
    pub principal: Option<Principal>,
    pub to: Option<Triple>,
    pub from: Option<Triple>,
}

impl CacheKey {
    /// Key for a graph-level decision.
    pub fn graph(
        actions: ActionSet,
        quantifier: Quantifier,
        graph: &GraphId,
        principal: Option<&Principal>,
    ) -> Self {
        Self {
            actions,
            quantifier,
            graph: graph.clone(),
            principal: principal.cloned(),
            to: None,
            from: None,
        }
    }

    /// Key for a triple-level decision.
    pub fn triple(
        actions: ActionSet,
        quantifier: Quantifier,
        graph: &GraphId,
        principal: Option<&Principal>,
        triple: &Triple,
    ) -> Self {
        Self {
            to: Some(triple.clone()),
            ..Self::graph(actions, quantifier, graph, principal)
        }
    }

    /// Key for an update (from → to) decision.
    pub fn update(graph: &GraphId, principal: Option<&Principal>, from: &Triple, to: &Triple) -> Self {
        Self {
            actions: ActionSet::single(Action::Update),
            quantifier: Quantifier::All,
            graph: graph.clone(),
            principal: principal.cloned(),
            to: Some(to.clone()),
            from: Some(from.clone()),
        }
    }
}

struct ScopeState {
    depth: usize,
    capacity: NonZeroUsize,
    cache: Option<LruCache<CacheKey, bool>>,
    scope_id: Option<Uuid>,
}

/// A reference-counted decision cache shared by one unit of work.
///
/// Cloning the scope yields another handle to the same state.
#[derive(Clone)]
pub struct DecisionScope {
    state: Rc<RefCell<ScopeState>>,
}

impl DecisionScope {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Rc::new(RefCell::new(ScopeState {
                depth: 0,
                capacity,
                cache: None,
                scope_id: None,
            })),
        }
    }

    /// Build a scope sized by `config.cache_capacity`.
    pub fn from_config(config: &SecurityConfig) -> SecurityResult<Self> {
        Ok(Self::new(config.cache_capacity()?))
    }

    /// Open a unit of work, released when the returned guard drops.
    pub fn enter(&self) -> UnitOfWork {
        self.begin();
        UnitOfWork {
            scope: self.clone(),
        }
    }

    /// Increment the reference count without a guard.
    ///
    /// Must be paired with exactly one [`DecisionScope::exit`].
    pub fn begin(&self) {
        let mut state = self.state.borrow_mut();
        if state.depth == 0 {
            let scope_id = Uuid::new_v4();
            info!(scope_id = %scope_id, capacity = state.capacity.get(), "decision cache opened");
            state.cache = Some(LruCache::new(state.capacity));
            state.scope_id = Some(scope_id);
        }
        state.depth += 1;
    }

    /// Decrement the reference count, dropping the cache at zero.
    pub fn exit(&self) -> SecurityResult<()> {
        let mut state = self.state.borrow_mut();
        if state.depth == 0 {
            return Err(SecurityError::ScopeMisuse {
                reason: "exit() called with no matching enter()".to_string(),
            });
        }
        state.depth -= 1;
        if state.depth == 0 {
            let entries = state.cache.as_ref().map(|c| c.len()).unwrap_or(0);
            if let Some(scope_id) = state.scope_id.take() {
                info!(scope_id = %scope_id, entries, "decision cache closed");
            }
            state.cache = None;
        }
        Ok(())
    }

    /// Current reference count.
    pub fn depth(&self) -> usize {
        self.state.borrow().depth
    }

    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Number of cached decisions; zero when no unit of work is active.
    pub fn cached_len(&self) -> usize {
        self.state.borrow().cache.as_ref().map(|c| c.len()).unwrap_or(0)
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.state.borrow().capacity
    }

    /// Look up a decision, refreshing its recency.
    pub fn get(&self, key: &CacheKey) -> SecurityResult<Option<bool>> {
        let mut state = self.state.borrow_mut();
        let cache = state.cache.as_mut().ok_or_else(outside_scope)?;
        Ok(cache.get(key).copied())
    }

    pub fn put(&self, key: CacheKey, allowed: bool) -> SecurityResult<()> {
        let mut state = self.state.borrow_mut();
        let cache = state.cache.as_mut().ok_or_else(outside_scope)?;
        cache.put(key, allowed);
        Ok(())
    }

    /// Return the cached decision for `key`, or compute it with `evaluate`
    /// and cache the result.
    ///
    /// `evaluate` runs with no borrow held, so it may itself use the scope.
    pub fn get_or_evaluate(
        &self,
        key: CacheKey,
        evaluate: impl FnOnce() -> bool,
    ) -> SecurityResult<bool> {
        if let Some(allowed) = self.get(&key)? {
            debug!(actions = %key.actions, graph = %key.graph, allowed, "decision cache hit");
            return Ok(allowed);
        }
        let allowed = evaluate();
        debug!(actions = %key.actions, graph = %key.graph, allowed, "decision cache miss");
        self.put(key, allowed)?;
        Ok(allowed)
    }
}

impl Default for DecisionScope {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl std::fmt::Debug for DecisionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("DecisionScope")
            .field("depth", &state.depth)
            .field("capacity", &state.capacity)
            .field("scope_id", &state.scope_id)
            .finish()
    }
}

fn outside_scope() -> SecurityError {
    SecurityError::ScopeMisuse {
        reason: "decision cache accessed outside an active unit of work".to_string(),
    }
}

/// Guard for one entry into a [`DecisionScope`].
///
/// Exits the scope exactly once when dropped, on every exit path.
#[must_use = "the unit of work ends as soon as the guard is dropped"]
pub struct UnitOfWork {
    scope: DecisionScope,
}

impl UnitOfWork {
    pub fn scope(&self) -> &DecisionScope {
        &self.scope
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if let Err(e) = self.scope.exit() {
            // Unreachable while guards are the only callers of exit().
            error!(error = %e, "unit of work released an inactive scope");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
