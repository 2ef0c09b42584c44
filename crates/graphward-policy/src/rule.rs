//! Grant and restriction types and the policy document schema.
//!
//! A `PolicyConfig` is deserialized from TOML and holds two unordered tables.
//! Grants open graph-level access; restrictions carve triples back out of it.
//! There is no rule order and no first-match semantics: every grant and
//! every restriction is considered for each decision.

use serde::{Deserialize, Serialize};

use graphward_contracts::{
    action::Action,
    identity::{GraphId, Principal},
    node::{Node, NodeKind},
    triple::Triple,
};

/// The wildcard accepted in `principal` and `graph` fields.
pub const WILDCARD: &str = "*";

fn name_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

fn principal_matches(pattern: &str, principal: Option<&Principal>) -> bool {
    match principal {
        Some(p) => name_matches(pattern, p.name()),
        // Anonymous callers only match the wildcard.
        None => pattern == WILDCARD,
    }
}

/// Graph-level permission for one principal (or `"*"`).
///
/// Example in TOML:
/// ```toml
/// [[grants]]
/// principal = "alice"
/// graph = "urn:g:data"
/// actions = ["read", "create", "update", "delete"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub principal: String,
    pub graph: String,
    pub actions: Vec<Action>,
}

impl Grant {
    pub fn matches(&self, principal: Option<&Principal>, action: Action, graph: &GraphId) -> bool {
        principal_matches(&self.principal, principal)
            && name_matches(&self.graph, graph.uri())
            && self.actions.contains(&action)
    }
}

/// A triple-level carve-out.
///
/// Omitted positions restrict every value. Positions are compared against
/// the node's lexical value, so `"http://example.org/r1"` restricts both the
/// URI and a literal of the same text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restriction {
    pub principal: String,
    pub graph: String,
    pub actions: Vec<Action>,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

impl Restriction {
    pub fn applies_to(&self, principal: Option<&Principal>, action: Action, graph: &GraphId) -> bool {
        principal_matches(&self.principal, principal)
            && name_matches(&self.graph, graph.uri())
            && self.actions.contains(&action)
    }

    /// True if some concrete triple matching `triple` could be restricted.
    ///
    /// A wildcard, variable or future node in the query can take the
    /// restricted value, so it always possibly matches.
    pub fn possibly_matches(&self, triple: &Triple) -> bool {
        position_matches(self.subject.as_deref(), &triple.subject)
            && position_matches(self.predicate.as_deref(), &triple.predicate)
            && position_matches(self.object.as_deref(), &triple.object)
    }
}

fn position_matches(restricted: Option<&str>, node: &Node) -> bool {
    match restricted {
        None => true,
        Some(value) => match node.kind() {
            NodeKind::Any | NodeKind::Variable | NodeKind::Future => true,
            NodeKind::Uri | NodeKind::Literal | NodeKind::Anonymous => node.value() == value,
        },
    }
}

/// The top-level structure deserialized from a TOML policy file.
///
/// Example:
/// ```toml
/// principal = "alice"
///
/// [[grants]]
/// principal = "*"
/// graph = "urn:g:data"
/// actions = ["read"]
///
/// [[restrictions]]
/// principal = "*"
/// graph = "*"
/// actions = ["read"]
/// subject = "http://example.org/r1"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// The identity evaluation starts as. Absent means anonymous.
    #[serde(default)]
    pub principal: Option<String>,

    #[serde(default)]
    pub grants: Vec<Grant>,

    #[serde(default)]
    pub restrictions: Vec<Restriction>,
}
