//! Subject-predicate-object triples of [`Node`]s.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// An immutable triple.
///
/// No position is ever absent. An unconstrained position holds `Node::ANY`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    /// The fully wildcarded triple: "every triple".
    ///
    /// Asking an evaluator about `Triple::ANY` is how callers learn whether
    /// any restriction exists at all for an action.
    pub const ANY: Triple = Triple {
        subject: Node::ANY,
        predicate: Node::ANY,
        object: Node::ANY,
    };

    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// True when at least one position is the wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.subject.is_any() || self.predicate.is_any() || self.object.is_any()
    }

    /// True when all three positions are concrete values.
    pub fn is_concrete(&self) -> bool {
        self.subject.is_concrete() && self.predicate.is_concrete() && self.object.is_concrete()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.subject, self.predicate, self.object)
    }
}
