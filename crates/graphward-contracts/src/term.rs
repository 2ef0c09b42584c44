//! Store-native terms and statements, and their mapping onto [`Node`]/[`Triple`].
//!
//! The store collaborator and the query algebra speak `Term`. Authorization
//! speaks `Node`. The conversion rules are fixed:
//!
//! - a wildcard (`Term::Any`) becomes `Node::ANY`
//! - a blank node becomes `Anonymous` with its label as the value
//! - a literal becomes `Literal` with its lexical form as the value
//! - a variable becomes `Variable` with its name as the value
//! - everything else (IRIs) becomes `Uri`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    node::{Node, NodeKind},
    triple::Triple,
};

/// A term as the store represents it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal {
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    },
    Variable(String),
    /// Match-all in pattern position.
    Any,
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank(label.into())
    }

    /// A plain literal with no datatype or language tag.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// True when this term, used as a pattern, accepts `candidate`.
    ///
    /// Wildcards and variables accept anything.
    pub fn matches(&self, candidate: &Term) -> bool {
        match self {
            Term::Any | Term::Variable(_) => true,
            _ => self == candidate,
        }
    }

    pub fn to_node(&self) -> Node {
        Node::from(self)
    }
}

impl From<&Term> for Node {
    fn from(term: &Term) -> Self {
        match term {
            Term::Any => Node::ANY,
            Term::Blank(label) => Node::new(NodeKind::Anonymous, label.clone()),
            Term::Literal { lexical, .. } => Node::new(NodeKind::Literal, lexical.clone()),
            Term::Variable(name) => Node::new(NodeKind::Variable, name.clone()),
            Term::Iri(uri) => Node::new(NodeKind::Uri, uri.clone()),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(uri) => write!(f, "<{}>", uri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", lexical)?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)
                } else {
                    Ok(())
                }
            }
            Term::Variable(name) => write!(f, "?{}", name),
            Term::Any => f.write_str("ANY"),
        }
    }
}

/// A store-native triple. Used both for stored data and for find patterns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Statement {
    /// The match-everything pattern.
    pub const ANY: Statement = Statement {
        subject: Term::Any,
        predicate: Term::Any,
        object: Term::Any,
    };

    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// True when this statement, used as a pattern, accepts `candidate`.
    pub fn matches(&self, candidate: &Statement) -> bool {
        self.subject.matches(&candidate.subject)
            && self.predicate.matches(&candidate.predicate)
            && self.object.matches(&candidate.object)
    }

    pub fn to_triple(&self) -> Triple {
        Triple::from(self)
    }
}

impl From<&Statement> for Triple {
    fn from(statement: &Statement) -> Self {
        Triple::new(
            Node::from(&statement.subject),
            Node::from(&statement.predicate),
            Node::from(&statement.object),
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
