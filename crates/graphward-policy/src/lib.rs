//! # graphward-policy
//!
//! A TOML-configured, deny-by-default reference evaluator for graphward.
//!
//! ## Overview
//!
//! This crate provides [`StaticEvaluator`], which implements the
//! [`SecurityEvaluator`](graphward_core::traits::SecurityEvaluator) trait.
//! Grants and restrictions are declared in a TOML file. It is a fixed table
//! for demos and tests, not a policy language.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use graphward_policy::engine::StaticEvaluator;
//!
//! let evaluator = Arc::new(StaticEvaluator::from_file(Path::new("policy.toml"))?);
//! // Pass `evaluator` to `graphward_core::SecuredGraph::new(...)`.
//! ```
//!
//! ## Matching
//!
//! `principal` and `graph` accept the wildcard `"*"`. Restriction positions
//! that are omitted match every value; query positions that are `ANY`,
//! variables or `FUTURE` match every restriction.

pub mod engine;
pub mod rule;

pub use engine::StaticEvaluator;
pub use rule::{Grant, PolicyConfig, Restriction};

// ── Tests ─────────────────────────────────────────────────────────────────────
