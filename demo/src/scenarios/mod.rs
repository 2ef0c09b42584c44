//! Demo scenarios and the context they share.
//!
//! Every scenario builds its own store and decision scope, so scenarios can
//! run in any order. The evaluator is shared and its identity is reset by
//! each scenario before use.

pub mod bulk;
pub mod iterate;
pub mod listener;
pub mod query;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use graphward_contracts::{
    error::SecurityResult,
    identity::{GraphId, Principal},
    term::{Statement, Term},
};
use graphward_core::{DecisionScope, SecurityConfig};
use graphward_policy::StaticEvaluator;

/// Built-in reference policy.
const DEMO_POLICY: &str = include_str!("../../policies/demo.toml");

/// Built-in security configuration.
const DEMO_CONFIG: &str = include_str!("../../config/security.toml");

pub const EX: &str = "http://example.org/";

pub struct DemoContext {
    pub evaluator: Arc<StaticEvaluator>,
    pub config: SecurityConfig,
}

impl DemoContext {
    /// Load the policy and config from the given paths, or the built-ins.
    pub fn load(policy: Option<&Path>, config: Option<&Path>) -> SecurityResult<Self> {
        let evaluator = match policy {
            Some(path) => StaticEvaluator::from_file(path)?,
            None => StaticEvaluator::from_toml_str(DEMO_POLICY)?,
        };
        let config = match config {
            Some(path) => SecurityConfig::from_file(path)?,
            None => SecurityConfig::from_toml_str(DEMO_CONFIG)?,
        };
        info!(
            policy = ?policy,
            cache_capacity = config.cache_capacity,
            silent_fail = config.silent_fail,
            "demo context loaded"
        );
        Ok(Self {
            evaluator: Arc::new(evaluator),
            config,
        })
    }

    pub fn scope(&self) -> SecurityResult<DecisionScope> {
        DecisionScope::from_config(&self.config)
    }

    pub fn run_as(&self, name: &str) {
        info!(principal = name, "switching principal");
        self.evaluator.run_as(Some(Principal::new(name)));
    }
}

pub fn data_graph() -> GraphId {
    GraphId::new("urn:g:data")
}

pub fn ex(local: &str) -> Term {
    Term::iri(format!("{}{}", EX, local))
}

pub fn statement(s: &str, p: &str, o: Term) -> Statement {
    Statement::new(ex(s), ex(p), o)
}

pub fn show(statement: &Statement) -> String {
    format!("{} {} {}", statement.subject, statement.predicate, statement.object)
}
