//! Push triple-level read authorization into a query plan.
//!
//! The rewriter walks the plan depth-first. Interior operators carry no
//! authorization logic: their children are rewritten by a fresh child
//! rewriter and the same operator is rebuilt around the results. A `Graph`
//! node naming an IRI re-scopes the child rewriter to that graph.
//!
//! Each basic graph pattern is handled in three steps:
//!
//! 1. Graph-level read denied → fail, or emit `Op::Null` in silent mode.
//! 2. Blanket read over `Triple::ANY` → emit the pattern unchanged.
//! 3. Otherwise → wrap the pattern in a filter whose [`SecuredFunction`]
//!    checks every reconstructed triple per candidate binding. Wildcard
//!    positions are first given fresh variables, so the check sees the
//!    matched value; a projection drops those variables again.
//!
//! `Slice` is rewritten like any other interior operator: its limit and
//! offset apply to the already-filtered rows of its child.

use std::sync::Arc;

use tracing::debug;

use graphward_contracts::{
    error::SecurityResult,
    identity::GraphId,
    term::{Statement, Term},
    triple::Triple,
};
use graphward_core::{traits::SecurityEvaluator, DecisionScope, SecuredItem};

use crate::{
    algebra::{Expr, Op},
    secured::SecuredFunction,
};

/// Rewrites plans for one security context.
///
/// Visited plans accumulate in a buffer until [`OpRewriter::result`] is
/// read; [`OpRewriter::reset`] discards the buffer so the instance can be
/// reused for the next sibling.
pub struct OpRewriter {
    item: SecuredItem,
    silent_fail: bool,
    buffer: Vec<Op>,
}

impl OpRewriter {
    /// A rewriter checking as the principal `item` resolves to now.
    ///
    /// The principal is captured, so filters built here keep evaluating as
    /// that identity whenever the plan is executed.
    pub fn new(item: &SecuredItem, silent_fail: bool) -> Self {
        Self {
            item: item.run_as(item.principal()),
            silent_fail,
            buffer: Vec::new(),
        }
    }

    pub fn graph_id(&self) -> &GraphId {
        self.item.graph_id()
    }

    pub fn is_silent(&self) -> bool {
        self.silent_fail
    }

    /// Rewrite `op` and append the result to the buffer.
    pub fn visit(&mut self, op: &Op) -> SecurityResult<()> {
        let rewritten = self.rewrite_op(op)?;
        self.buffer.push(rewritten);
        Ok(())
    }

    /// The accumulated plan: a single element as itself, nothing as
    /// `Op::Null`, several as a `Sequence`.
    pub fn result(&self) -> Op {
        match self.buffer.as_slice() {
            [] => Op::Null,
            [single] => single.clone(),
            many => Op::Sequence(many.to_vec()),
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn child(&self) -> OpRewriter {
        OpRewriter {
            item: self.item.clone(),
            silent_fail: self.silent_fail,
            buffer: Vec::new(),
        }
    }

    fn rewrite_child(&self, op: &Op) -> SecurityResult<Op> {
        let mut child = self.child();
        child.visit(op)?;
        Ok(child.result())
    }

    fn rewrite_boxed(&self, op: &Op) -> SecurityResult<Box<Op>> {
        Ok(Box::new(self.rewrite_child(op)?))
    }

    /// Rewrite sibling sub-plans with one child rewriter, reset in between.
    fn rewrite_siblings(&self, ops: &[Op]) -> SecurityResult<Vec<Op>> {
        let mut child = self.child();
        let mut rewritten = Vec::with_capacity(ops.len());
        for op in ops {
            child.reset();
            child.visit(op)?;
            rewritten.push(child.result());
        }
        Ok(rewritten)
    }

    fn rewrite_op(&self, op: &Op) -> SecurityResult<Op> {
        let rewritten = match op {
            Op::Bgp(patterns) => self.rewrite_bgp(patterns)?,

            Op::Filter { expr, sub } => Op::Filter {
                expr: expr.clone(),
                sub: self.rewrite_boxed(sub)?,
            },
            Op::Project { vars, sub } => Op::Project {
                vars: vars.clone(),
                sub: self.rewrite_boxed(sub)?,
            },
            Op::Distinct(sub) => Op::Distinct(self.rewrite_boxed(sub)?),
            Op::Reduced(sub) => Op::Reduced(self.rewrite_boxed(sub)?),
            Op::Order { vars, sub } => Op::Order {
                vars: vars.clone(),
                sub: self.rewrite_boxed(sub)?,
            },
            Op::Slice { offset, limit, sub } => Op::Slice {
                offset: *offset,
                limit: *limit,
                sub: self.rewrite_boxed(sub)?,
            },
            Op::Group { vars, sub } => Op::Group {
                vars: vars.clone(),
                sub: self.rewrite_boxed(sub)?,
            },
            Op::Extend { var, expr, sub } => Op::Extend {
                var: var.clone(),
                expr: expr.clone(),
                sub: self.rewrite_boxed(sub)?,
            },
            Op::Service { endpoint, silent, sub } => Op::Service {
                endpoint: endpoint.clone(),
                silent: *silent,
                sub: self.rewrite_boxed(sub)?,
            },

            Op::Join(left, right) => {
                let [l, r] = self.rewrite_pair(left, right)?;
                Op::Join(Box::new(l), Box::new(r))
            }
            Op::LeftJoin { left, right, expr } => {
                let [l, r] = self.rewrite_pair(left, right)?;
                Op::LeftJoin {
                    left: Box::new(l),
                    right: Box::new(r),
                    expr: expr.clone(),
                }
            }
            Op::Union(left, right) => {
                let [l, r] = self.rewrite_pair(left, right)?;
                Op::Union(Box::new(l), Box::new(r))
            }
            Op::Minus(left, right) => {
                let [l, r] = self.rewrite_pair(left, right)?;
                Op::Minus(Box::new(l), Box::new(r))
            }

            Op::Sequence(ops) => Op::Sequence(self.rewrite_siblings(ops)?),
            Op::Disjunction(ops) => Op::Disjunction(self.rewrite_siblings(ops)?),

            Op::Graph { name, sub } => {
                let mut scoped = match name {
                    Term::Iri(uri) => {
                        debug!(from = %self.graph_id(), to = %uri, "rewriter re-scoped to named graph");
                        OpRewriter {
                            item: self.item.for_graph(GraphId::new(uri.clone())),
                            silent_fail: self.silent_fail,
                            buffer: Vec::new(),
                        }
                    }
                    _ => self.child(),
                };
                scoped.visit(sub)?;
                Op::Graph {
                    name: name.clone(),
                    sub: Box::new(scoped.result()),
                }
            }

            Op::Path { .. } | Op::Table { .. } | Op::Null => op.clone(),
        };
        Ok(rewritten)
    }

    fn rewrite_pair(&self, left: &Op, right: &Op) -> SecurityResult<[Op; 2]> {
        let mut child = self.child();
        child.visit(left)?;
        let l = child.result();
        child.reset();
        child.visit(right)?;
        Ok([l, child.result()])
    }

    fn rewrite_bgp(&self, patterns: &[Statement]) -> SecurityResult<Op> {
        let _unit = self.item.scope().enter();

        if !self.item.can_read()? {
            if self.silent_fail {
                debug!(graph = %self.graph_id(), "graph read denied; pattern replaced by empty plan");
                return Ok(Op::Null);
            }
            self.item.check_read()?;
        }

        if self.item.can_read_triple(&Triple::ANY)? {
            debug!(graph = %self.graph_id(), triples = patterns.len(), "blanket read; pattern unchanged");
            return Ok(Op::Bgp(patterns.to_vec()));
        }

        // A wildcard must be checked as the value it matched, not as ANY.
        let (patterns, visible) = match name_wildcards(patterns) {
            Some((named, visible)) => (named, Some(visible)),
            None => (patterns.to_vec(), None),
        };
        let function = SecuredFunction::new(self.item.clone(), &patterns);
        debug!(
            graph = %self.graph_id(),
            triples = patterns.len(),
            variables = function.variables().len(),
            "pattern wrapped in secured filter"
        );
        let filtered = Op::filter(Expr::Secured(function), Op::Bgp(patterns));
        Ok(match visible {
            Some(vars) => Op::Project {
                vars,
                sub: Box::new(filtered),
            },
            None => filtered,
        })
    }
}

const WILDCARD_PREFIX: &str = "_any";

/// Replace every `Term::Any` in `patterns` with a fresh variable.
///
/// Returns the rewritten patterns and the pattern's own variables, in
/// first-occurrence order, for projecting the fresh ones away again.
/// `None` when there is no wildcard to name.
fn name_wildcards(patterns: &[Statement]) -> Option<(Vec<Statement>, Vec<String>)> {
    let terms = || patterns.iter().flat_map(|p| [&p.subject, &p.predicate, &p.object]);
    if !terms().any(|t| matches!(t, Term::Any)) {
        return None;
    }

    let mut visible: Vec<String> = Vec::new();
    for name in terms().filter_map(Term::as_variable) {
        if !visible.iter().any(|v| v == name) {
            visible.push(name.to_string());
        }
    }

    let mut next = 0usize;
    let mut name = |term: &Term| -> Term {
        if !matches!(term, Term::Any) {
            return term.clone();
        }
        loop {
            let candidate = format!("{}{}", WILDCARD_PREFIX, next);
            next += 1;
            if !visible.contains(&candidate) {
                return Term::variable(candidate);
            }
        }
    };
    let named = patterns
        .iter()
        .map(|p| Statement::new(name(&p.subject), name(&p.predicate), name(&p.object)))
        .collect();
    Some((named, visible))
}

/// Rewrite `plan` for the principal `evaluator` currently reports.
///
/// A fresh decision scope backs the rewrite and the filters it emits.
pub fn rewrite(
    plan: &Op,
    evaluator: Arc<dyn SecurityEvaluator>,
    graph_id: GraphId,
    silent_fail: bool,
) -> SecurityResult<Op> {
    let item = SecuredItem::new(evaluator, graph_id, DecisionScope::default());
    rewrite_with(plan, &item, silent_fail)
}

/// Rewrite `plan` against an existing security context.
pub fn rewrite_with(plan: &Op, item: &SecuredItem, silent_fail: bool) -> SecurityResult<Op> {
    let mut rewriter = OpRewriter::new(item, silent_fail);
    rewriter.visit(plan)?;
    Ok(rewriter.result())
}
