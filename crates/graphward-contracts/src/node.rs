//! Canonical node values used by every authorization check.
//!
//! A `Node` is independent of whatever representation the underlying store
//! uses. Store terms are converted at the boundary (see [`crate::term`]) so
//! that policy evaluators and the decision cache only ever see this type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a [`Node`].
///
/// Declaration order is significant: it is the primary sort key of the
/// derived total order on `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// A URI resource.
    Uri,
    /// A literal, carried as its canonical lexical form.
    Literal,
    /// A blank node, carried as its label.
    Anonymous,
    /// The wildcard: matches every node in pattern position.
    Any,
    /// A query variable, carried as its name without the leading `?`.
    Variable,
    /// A node that does not exist yet, e.g. a blank node about to be created.
    Future,
}

/// An immutable, comparable graph node.
///
/// Ordering and equality are lexicographic over `(kind, value)`. An empty
/// `value` is allowed and means "a node of this kind, value unspecified".
///
/// `Node::ANY` must never be treated as a concrete node. Evaluators that
/// receive it in a triple position have to answer for every value that
/// position could take.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Node {
    kind: NodeKind,
    value: String,
}

impl Node {
    /// The wildcard node.
    pub const ANY: Node = Node {
        kind: NodeKind::Any,
        value: String::new(),
    };

    /// A placeholder for a node that will be created by the operation being checked.
    pub const FUTURE: Node = Node {
        kind: NodeKind::Future,
        value: String::new(),
    };

    /// Build a node of any kind.
    pub fn new(kind: NodeKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn uri(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Uri, value)
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Literal, value)
    }

    pub fn anonymous(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Anonymous, label)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Variable, name)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_any(&self) -> bool {
        self.kind == NodeKind::Any
    }

    /// True for nodes that stand for a single, known value.
    ///
    /// `Any`, `Variable` and `Future` are not concrete: an evaluator cannot
    /// know which value they will take.
    pub fn is_concrete(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Uri | NodeKind::Literal | NodeKind::Anonymous
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Uri => write!(f, "<{}>", self.value),
            NodeKind::Literal => write!(f, "\"{}\"", self.value),
            NodeKind::Anonymous => write!(f, "_:{}", self.value),
            NodeKind::Any => f.write_str("ANY"),
            NodeKind::Variable => write!(f, "?{}", self.value),
            NodeKind::Future => f.write_str("FUTURE"),
        }
    }
}
