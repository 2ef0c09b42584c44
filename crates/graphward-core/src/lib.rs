//! # graphward-core
//!
//! Fine-grained access control for RDF graphs.
//!
//! This crate provides:
//! - The two collaborator traits (`SecurityEvaluator`, `Graph`)
//! - `DecisionScope`, the per-unit-of-work decision cache
//! - `SecuredItem`, the action × granularity check matrix
//! - `SecuredGraph`, `SecuredIter`, `BulkAuthorizer` and `SecuredListener`,
//!   which wire the checks in front of every store access
//! - `MemGraph`, an in-memory reference store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use graphward_core::{DecisionScope, MemGraph, SecuredGraph};
//!
//! let graph = SecuredGraph::new(Rc::new(MemGraph::new()), evaluator, graph_id, DecisionScope::default());
//! for statement in graph.find(&Statement::ANY)? { /* only readable statements */ }
//! ```

pub mod bulk;
pub mod cache;
pub mod config;
pub mod graph;
pub mod item;
pub mod iter;
pub mod listener;
pub mod memory;
pub mod traits;

pub use bulk::BulkAuthorizer;
pub use cache::{CacheKey, DecisionScope, Quantifier, UnitOfWork};
pub use config::SecurityConfig;
pub use graph::SecuredGraph;
pub use item::SecuredItem;
pub use iter::SecuredIter;
pub use listener::SecuredListener;
pub use memory::MemGraph;
pub use traits::{Capabilities, Graph, GraphEvent, GraphListener, ListenerId, SecurityEvaluator, StatementIter};
