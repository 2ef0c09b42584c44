//! # graphward-contracts
//!
//! Shared types for the graphward access-control layer.
//!
//! All crates in the workspace import from here. No authorization logic
//! lives in this crate, only the node/triple model, actions, identities,
//! store-native terms and error types.

pub mod action;
pub mod error;
pub mod identity;
pub mod node;
pub mod term;
pub mod triple;

pub use action::{Action, ActionSet};
pub use error::{SecurityError, SecurityResult};
pub use identity::{GraphId, Principal};
pub use node::{Node, NodeKind};
pub use term::{Statement, Term};
pub use triple::Triple;

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};

    use super::*;

    // ── Node ordering and equality ───────────────────────────────────────────

    #[test]
    fn node_orders_by_kind_then_value() {
        let a = Node::uri("http://example.org/b");
        let b = Node::literal("a");
        let c = Node::uri("http://example.org/a");

        let sorted: Vec<Node> = [a.clone(), b.clone(), c.clone()]
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // Uri sorts before Literal regardless of value.
        assert_eq!(sorted, vec![c, a, b]);
    }

    #[test]
    fn node_equality_is_structural() {
        assert_eq!(Node::uri("x"), Node::uri("x"));
        assert_ne!(Node::uri("x"), Node::literal("x"));
        assert_eq!(Node::ANY, Node::new(NodeKind::Any, ""));
    }

    #[test]
    fn equal_nodes_hash_equal() {
        let mut set = HashSet::new();
        set.insert(Node::anonymous("b0"));
        set.insert(Node::anonymous("b0"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn empty_value_is_permitted() {
        let n = Node::uri("");
        assert_eq!(n.kind(), NodeKind::Uri);
        assert_eq!(n.value(), "");
    }

    #[test]
    fn concreteness_by_kind() {
        assert!(Node::uri("x").is_concrete());
        assert!(Node::literal("1").is_concrete());
        assert!(Node::anonymous("b").is_concrete());
        assert!(!Node::ANY.is_concrete());
        assert!(!Node::FUTURE.is_concrete());
        assert!(!Node::variable("x").is_concrete());
    }

    // ── Triple ───────────────────────────────────────────────────────────────

    #[test]
    fn triple_any_is_all_wildcards() {
        assert!(Triple::ANY.subject.is_any());
        assert!(Triple::ANY.predicate.is_any());
        assert!(Triple::ANY.object.is_any());
        assert!(Triple::ANY.has_wildcard());
        assert!(!Triple::ANY.is_concrete());
    }

    #[test]
    fn triple_display_renders_positions() {
        let t = Triple::new(Node::uri("s"), Node::uri("p"), Node::literal("o"));
        assert_eq!(t.to_string(), "[<s> <p> \"o\"]");
    }

    // ── Term → Node mapping ──────────────────────────────────────────────────

    #[test]
    fn store_wildcard_maps_to_any() {
        assert_eq!(Node::from(&Term::Any), Node::ANY);
    }

    #[test]
    fn store_blank_maps_to_anonymous_label() {
        assert_eq!(Node::from(&Term::blank("b7")), Node::anonymous("b7"));
    }

    #[test]
    fn store_literal_maps_to_lexical_form() {
        let typed = Term::Literal {
            lexical: "42".to_string(),
            datatype: Some("http://www.w3.org/2001/XMLSchema#integer".to_string()),
            language: None,
        };
        let tagged = Term::Literal {
            lexical: "chat".to_string(),
            datatype: None,
            language: Some("fr".to_string()),
        };
        assert_eq!(Node::from(&typed), Node::literal("42"));
        assert_eq!(Node::from(&tagged), Node::literal("chat"));
    }

    #[test]
    fn store_iri_maps_to_uri() {
        assert_eq!(
            Node::from(&Term::iri("http://example.org/a")),
            Node::uri("http://example.org/a")
        );
    }

    #[test]
    fn statement_pattern_matching() {
        let data = Statement::new(Term::iri("s"), Term::iri("p"), Term::literal("o"));
        let by_subject = Statement::new(Term::iri("s"), Term::Any, Term::Any);
        let by_var = Statement::new(Term::variable("x"), Term::iri("p"), Term::Any);
        let other = Statement::new(Term::iri("t"), Term::Any, Term::Any);

        assert!(Statement::ANY.matches(&data));
        assert!(by_subject.matches(&data));
        assert!(by_var.matches(&data));
        assert!(!other.matches(&data));
    }

    // ── Actions ──────────────────────────────────────────────────────────────

    #[test]
    fn action_set_deduplicates() {
        let set: ActionSet = [Action::Read, Action::Read, Action::Create].into();
        assert_eq!(set.len(), 2);
        assert!(set.contains(Action::Read));
        assert!(!set.contains(Action::Delete));
    }

    #[test]
    fn action_sets_with_same_members_are_equal() {
        let a: ActionSet = [Action::Update, Action::Read].into();
        let b: ActionSet = [Action::Read, Action::Update].into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{read, update}");
    }

    #[test]
    fn action_parses_case_insensitively() {
        assert_eq!("READ".parse::<Action>().unwrap(), Action::Read);
        match "admin".parse::<Action>() {
            Err(SecurityError::ConfigError { reason }) => assert!(reason.contains("admin")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn action_serde_is_kebab_case() {
        let json = serde_json::to_string(&Action::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
    }

    // ── SecurityError display messages ───────────────────────────────────────

    #[test]
    fn error_permission_denied_display_without_detail() {
        let err = SecurityError::denied(&GraphId::new("urn:g"), Action::Read);
        assert_eq!(err.to_string(), "permission denied: read on <urn:g>");
        assert!(err.is_permission_denied());
    }

    #[test]
    fn error_permission_denied_display_with_triple() {
        let t = Triple::new(Node::uri("s"), Node::uri("p"), Node::uri("o"));
        let err = SecurityError::denied_with(&GraphId::new("urn:g"), Action::Create, t.to_string());
        let msg = err.to_string();
        assert!(msg.contains("create"));
        assert!(msg.contains("[<s> <p> <o>]"));
    }

    #[test]
    fn error_scope_misuse_display() {
        let err = SecurityError::ScopeMisuse {
            reason: "exit without enter".to_string(),
        };
        assert!(err.to_string().contains("decision scope misuse"));
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn error_config_error_display() {
        let err = SecurityError::ConfigError {
            reason: "cache_capacity must be positive".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("cache_capacity"));
    }
}
