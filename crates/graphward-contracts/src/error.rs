//! Error types for the graphward access-control layer.
//!
//! All fallible operations return `SecurityResult<T>`. `PermissionDenied` is
//! the only variant that expresses a policy outcome; the others report
//! programming, configuration or collaborator failures.

use thiserror::Error;

use crate::{action::Action, identity::GraphId};

/// The unified error type for graphward.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// A check returned false for an operation whose contract requires it.
    ///
    /// `detail` renders the offending triple, or the from/to pair for updates.
    #[error("permission denied: {action} on {graph}{}", render_detail(.detail))]
    PermissionDenied {
        graph: GraphId,
        action: Action,
        detail: Option<String>,
    },

    /// The decision scope was used outside an active unit of work, or exited
    /// more times than it was entered.
    ///
    /// This is a bug in the embedding code, not a policy outcome.
    #[error("decision scope misuse: {reason}")]
    ScopeMisuse { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The wrapped store reported a failure of its own.
    #[error("store error: {reason}")]
    Store { reason: String },

    /// The reference query executor cannot evaluate a plan.
    #[error("query evaluation error: {reason}")]
    QueryEvaluation { reason: String },
}

fn render_detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {}", d),
        None => String::new(),
    }
}

impl SecurityError {
    /// Build a graph-level denial.
    pub fn denied(graph: &GraphId, action: Action) -> Self {
        SecurityError::PermissionDenied {
            graph: graph.clone(),
            action,
            detail: None,
        }
    }

    /// Build a denial that names the offending triple (or pair).
    pub fn denied_with(graph: &GraphId, action: Action, detail: impl Into<String>) -> Self {
        SecurityError::PermissionDenied {
            graph: graph.clone(),
            action,
            detail: Some(detail.into()),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SecurityError::PermissionDenied { .. })
    }
}

/// Convenience alias used throughout the graphward crates.
pub type SecurityResult<T> = Result<T, SecurityError>;
