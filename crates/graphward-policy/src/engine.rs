//! TOML-driven reference evaluator.
//!
//! `StaticEvaluator` loads a `PolicyConfig` from a TOML string or file and
//! implements the `SecurityEvaluator` trait from graphward-core.
//!
//! Evaluation algorithm:
//!
//! 1. Graph level: allow iff some grant matches principal, graph and action.
//!    Nothing matched → deny.
//! 2. Triple level: require (1), then deny if any restriction for the action
//!    possibly matches the triple. A wildcard position possibly matches every
//!    restriction, so `(S, P, ANY)` is denied whenever some `(S, P, o)` is.
//! 3. Update: require graph-level Update, then deny if any Update
//!    restriction possibly matches `from` or `to`. Create and Delete
//!    restrictions play no part.

use std::path::Path;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use graphward_contracts::{
    action::Action,
    error::{SecurityError, SecurityResult},
    identity::{GraphId, Principal},
    triple::Triple,
};
use graphward_core::traits::SecurityEvaluator;

use crate::rule::PolicyConfig;

/// A `SecurityEvaluator` answering from a fixed grant/restriction table.
///
/// ```rust,ignore
/// use graphward_policy::engine::StaticEvaluator;
///
/// let evaluator = StaticEvaluator::from_file(Path::new("policy.toml"))?;
/// evaluator.run_as(Some(Principal::new("alice")));
/// ```
#[derive(Debug)]
pub struct StaticEvaluator {
    config: PolicyConfig,
    current: RwLock<Option<Principal>>,
}

impl StaticEvaluator {
    pub fn new(config: PolicyConfig) -> Self {
        let current = config.principal.clone().map(Principal::new);
        Self {
            config,
            current: RwLock::new(current),
        }
    }

    /// Parse `s` as TOML and build a `StaticEvaluator`.
    ///
    /// Returns `SecurityError::ConfigError` if the TOML is malformed or does
    /// not match the expected `PolicyConfig` schema.
    pub fn from_toml_str(s: &str) -> SecurityResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| SecurityError::ConfigError {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        Ok(Self::new(config))
    }

    pub fn from_file(path: &Path) -> SecurityResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SecurityError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Switch the identity later evaluations run as.
    pub fn run_as(&self, principal: Option<Principal>) {
        debug!(principal = ?principal, "evaluator identity switched");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = principal;
    }

    fn granted(&self, principal: Option<&Principal>, action: Action, graph: &GraphId) -> bool {
        self.config
            .grants
            .iter()
            .any(|g| g.matches(principal, action, graph))
    }

    fn restricted(
        &self,
        principal: Option<&Principal>,
        action: Action,
        graph: &GraphId,
        triple: &Triple,
    ) -> bool {
        self.config
            .restrictions
            .iter()
            .filter(|r| r.applies_to(principal, action, graph))
            .any(|r| r.possibly_matches(triple))
    }
}

impl SecurityEvaluator for StaticEvaluator {
    fn evaluate(&self, principal: Option<&Principal>, action: Action, graph: &GraphId) -> bool {
        let allowed = self.granted(principal, action, graph);
        debug!(principal = ?principal, action = %action, graph = %graph, allowed, "graph-level decision");
        allowed
    }

    fn evaluate_triple(
        &self,
        principal: Option<&Principal>,
        action: Action,
        graph: &GraphId,
        triple: &Triple,
    ) -> bool {
        let allowed =
            self.granted(principal, action, graph) && !self.restricted(principal, action, graph, triple);
        debug!(
            principal = ?principal,
            action = %action,
            graph = %graph,
            triple = %triple,
            allowed,
            "triple-level decision"
        );
        allowed
    }

    fn evaluate_update(
        &self,
        principal: Option<&Principal>,
        graph: &GraphId,
        from: &Triple,
        to: &Triple,
    ) -> bool {
        self.granted(principal, Action::Update, graph)
            && !self.restricted(principal, Action::Update, graph, from)
            && !self.restricted(principal, Action::Update, graph, to)
    }

    fn principal(&self) -> Option<Principal> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
