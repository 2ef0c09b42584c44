//! The filter function the rewriter wraps around protected patterns.
//!
//! At rewrite time the pattern's distinct variables are recorded in
//! first-occurrence order and each triple position is compiled to either a
//! fixed node or an index into that list. At execution time each candidate
//! binding fills the indices, unbound variables become `Node::ANY`, and the
//! binding passes only if every reconstructed triple is readable.

use std::sync::Arc;

use tracing::warn;

use graphward_contracts::{
    identity::GraphId,
    node::Node,
    term::{Statement, Term},
    triple::Triple,
};
use graphward_core::SecuredItem;

use crate::algebra::Binding;

/// One compiled triple position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Fixed(Node),
    Var(usize),
}

impl Slot {
    fn resolve(&self, values: &[Node]) -> Node {
        match self {
            Slot::Fixed(node) => node.clone(),
            Slot::Var(index) => values.get(*index).cloned().unwrap_or(Node::ANY),
        }
    }
}

#[derive(Clone)]
pub struct SecuredFunction {
    item: SecuredItem,
    variables: Vec<String>,
    templates: Vec<[Slot; 3]>,
}

impl SecuredFunction {
    /// Compile `patterns` for checking as `item`'s principal on `item`'s graph.
    pub fn new(item: SecuredItem, patterns: &[Statement]) -> Self {
        let mut variables: Vec<String> = Vec::new();
        let mut slot = |term: &Term| match term.as_variable() {
            Some(name) => {
                let index = match variables.iter().position(|v| v == name) {
                    Some(index) => index,
                    None => {
                        variables.push(name.to_string());
                        variables.len() - 1
                    }
                };
                Slot::Var(index)
            }
            None => Slot::Fixed(term.to_node()),
        };
        let templates = patterns
            .iter()
            .map(|p| [slot(&p.subject), slot(&p.predicate), slot(&p.object)])
            .collect();
        Self {
            item,
            variables,
            templates,
        }
    }

    /// Distinct variables in first-occurrence order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn graph_id(&self) -> &GraphId {
        self.item.graph_id()
    }

    /// The concrete triples `binding` turns the pattern into.
    pub fn triples_for(&self, binding: &Binding) -> Vec<Triple> {
        let values: Vec<Node> = self
            .variables
            .iter()
            .map(|v| binding.get(v).map(Node::from).unwrap_or(Node::ANY))
            .collect();
        self.templates
            .iter()
            .map(|[s, p, o]| Triple::new(s.resolve(&values), p.resolve(&values), o.resolve(&values)))
            .collect()
    }

    /// True iff every reconstructed triple is readable.
    ///
    /// Decisions are cached for the unit of work the caller holds on the
    /// item's scope; without one each call opens and closes its own.
    pub fn test(&self, binding: &Binding) -> bool {
        let _unit = self.item.scope().enter();
        self.triples_for(binding).iter().all(|triple| {
            self.item.can_read_triple(triple).unwrap_or_else(|e| {
                warn!(graph = %self.item.graph_id(), error = %e, "secured filter check failed; row rejected");
                false
            })
        })
    }
}

impl PartialEq for SecuredFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.item.evaluator(), other.item.evaluator())
            && self.item.graph_id() == other.item.graph_id()
            && self.item.principal() == other.item.principal()
            && self.variables == other.variables
            && self.templates == other.templates
    }
}

impl std::fmt::Debug for SecuredFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuredFunction")
            .field("graph_id", self.item.graph_id())
            .field("variables", &self.variables)
            .field("triples", &self.templates.len())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
