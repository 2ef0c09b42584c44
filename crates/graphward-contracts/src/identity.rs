//! Graph identities and acting principals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeKind};

/// The URI naming a protected graph as a whole.
///
/// Used as the scope discriminator for every graph-level check and every
/// cached decision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphId(Node);

impl GraphId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(Node::new(NodeKind::Uri, uri))
    }

    pub fn as_node(&self) -> &Node {
        &self.0
    }

    pub fn uri(&self) -> &str {
        self.0.value()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The identity on whose behalf checks are evaluated.
///
/// Opaque to the core: only evaluators interpret it.
/// Example: Principal("alice")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
