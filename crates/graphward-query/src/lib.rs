//! # graphward-query
//!
//! Query-plan rewriting for triple-level read authorization.
//!
//! This crate provides:
//! - The plan algebra (`Op`, `Expr`, `Binding`)
//! - `OpRewriter` and [`rewrite`], which push read checks into basic graph
//!   patterns before the store ever executes them
//! - `SecuredFunction`, the per-binding filter the rewriter synthesizes
//! - A small reference executor ([`eval::evaluate`]) to observe results
//!
//! ## Usage
//!
//! ```rust,ignore
//! let secured = graphward_query::rewrite(&plan, evaluator, GraphId::new("urn:g"), false)?;
//! let rows = graphward_query::eval::evaluate(&secured, &store)?;
//! ```

pub mod algebra;
pub mod eval;
pub mod rewriter;
pub mod secured;

pub use algebra::{Binding, Expr, Op};
pub use rewriter::{rewrite, rewrite_with, OpRewriter};
pub use secured::SecuredFunction;

// ── Tests ────────────────────────────────────────────────────────────────────
