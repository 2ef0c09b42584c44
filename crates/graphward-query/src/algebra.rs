//! Query algebra: plan operators, filter expressions and solution bindings.
//!
//! The plan is a tree of [`Op`]s. Leaves read the store (`Bgp`, `Path`) or
//! produce constant rows (`Table`, `Null`). Every other operator only
//! combines the rows of its children.

use std::collections::BTreeMap;

use graphward_contracts::term::{Statement, Term};

use crate::secured::SecuredFunction;

/// One solution: variable name → bound term.
pub type Binding = BTreeMap<String, Term>;

/// True if `a` and `b` agree on every variable they share.
pub fn compatible(a: &Binding, b: &Binding) -> bool {
    a.iter()
        .all(|(var, value)| b.get(var).map_or(true, |other| other == value))
}

/// `a` extended with the bindings of `b`. Callers check [`compatible`] first.
pub fn merge(a: &Binding, b: &Binding) -> Binding {
    let mut merged = a.clone();
    for (var, value) in b {
        merged.entry(var.clone()).or_insert_with(|| value.clone());
    }
    merged
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// A basic graph pattern: triple templates matched jointly.
    Bgp(Vec<Statement>),

    Filter {
        expr: Expr,
        sub: Box<Op>,
    },

    Project {
        vars: Vec<String>,
        sub: Box<Op>,
    },

    Distinct(Box<Op>),

    Reduced(Box<Op>),

    /// Ascending order over `vars`.
    Order {
        vars: Vec<String>,
        sub: Box<Op>,
    },

    Slice {
        offset: usize,
        limit: Option<usize>,
        sub: Box<Op>,
    },

    Group {
        vars: Vec<String>,
        sub: Box<Op>,
    },

    /// Bind `var` to the value of `expr`.
    Extend {
        var: String,
        expr: Expr,
        sub: Box<Op>,
    },

    Join(Box<Op>, Box<Op>),

    LeftJoin {
        left: Box<Op>,
        right: Box<Op>,
        expr: Option<Expr>,
    },

    Union(Box<Op>, Box<Op>),

    Minus(Box<Op>, Box<Op>),

    /// Scope `sub` to a named graph. `name` is an IRI or a variable.
    Graph {
        name: Term,
        sub: Box<Op>,
    },

    Service {
        endpoint: String,
        silent: bool,
        sub: Box<Op>,
    },

    /// A property path between two terms, e.g. `ex:knows+`.
    Path {
        subject: Term,
        path: String,
        object: Term,
    },

    /// Children evaluated in order, each seeing the rows of the previous.
    Sequence(Vec<Op>),

    Disjunction(Vec<Op>),

    /// Inline constant rows.
    Table {
        vars: Vec<String>,
        rows: Vec<Binding>,
    },

    /// The canonical plan producing no rows.
    Null,
}

impl Op {
    pub fn bgp(patterns: impl IntoIterator<Item = Statement>) -> Self {
        Op::Bgp(patterns.into_iter().collect())
    }

    pub fn filter(expr: Expr, sub: Op) -> Self {
        Op::Filter {
            expr,
            sub: Box::new(sub),
        }
    }

    pub fn project(vars: &[&str], sub: Op) -> Self {
        Op::Project {
            vars: vars.iter().map(|v| v.to_string()).collect(),
            sub: Box::new(sub),
        }
    }

    pub fn join(left: Op, right: Op) -> Self {
        Op::Join(Box::new(left), Box::new(right))
    }

    pub fn union(left: Op, right: Op) -> Self {
        Op::Union(Box::new(left), Box::new(right))
    }

    pub fn graph(name: Term, sub: Op) -> Self {
        Op::Graph {
            name,
            sub: Box::new(sub),
        }
    }

    pub fn slice(offset: usize, limit: Option<usize>, sub: Op) -> Self {
        Op::Slice {
            offset,
            limit,
            sub: Box::new(sub),
        }
    }

    /// Operator name, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Bgp(_) => "bgp",
            Op::Filter { .. } => "filter",
            Op::Project { .. } => "project",
            Op::Distinct(_) => "distinct",
            Op::Reduced(_) => "reduced",
            Op::Order { .. } => "order",
            Op::Slice { .. } => "slice",
            Op::Group { .. } => "group",
            Op::Extend { .. } => "extend",
            Op::Join(..) => "join",
            Op::LeftJoin { .. } => "leftjoin",
            Op::Union(..) => "union",
            Op::Minus(..) => "minus",
            Op::Graph { .. } => "graph",
            Op::Service { .. } => "service",
            Op::Path { .. } => "path",
            Op::Sequence(_) => "sequence",
            Op::Disjunction(_) => "disjunction",
            Op::Table { .. } => "table",
            Op::Null => "null",
        }
    }
}

/// Filter and extend expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(String),
    Const(Term),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Bound(String),
    /// Per-binding triple-level read check inserted by the rewriter.
    Secured(SecuredFunction),
}

const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Expr::Eq(Box::new(left), Box::new(right))
    }

    pub fn not_equals(left: Expr, right: Expr) -> Self {
        Expr::Ne(Box::new(left), Box::new(right))
    }

    /// The value of this expression under `binding`, or `None` on error
    /// (an unbound variable).
    pub fn value(&self, binding: &Binding) -> Option<Term> {
        match self {
            Expr::Var(name) => binding.get(name).cloned(),
            Expr::Const(term) => Some(term.clone()),
            _ => Some(Term::Literal {
                lexical: self.test(binding).to_string(),
                datatype: Some(XSD_BOOLEAN.to_string()),
                language: None,
            }),
        }
    }

    /// Effective boolean value. Errors count as `false`.
    pub fn test(&self, binding: &Binding) -> bool {
        match self {
            Expr::Var(_) | Expr::Const(_) => match self.value(binding) {
                Some(Term::Literal { lexical, .. }) => !lexical.is_empty() && lexical != "false",
                _ => false,
            },
            Expr::Eq(l, r) => match (l.value(binding), r.value(binding)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Expr::Ne(l, r) => match (l.value(binding), r.value(binding)) {
                (Some(a), Some(b)) => a != b,
                _ => false,
            },
            Expr::And(l, r) => l.test(binding) && r.test(binding),
            Expr::Or(l, r) => l.test(binding) || r.test(binding),
            Expr::Not(e) => !e.test(binding),
            Expr::Bound(name) => binding.contains_key(name),
            Expr::Secured(function) => function.test(binding),
        }
    }
}
