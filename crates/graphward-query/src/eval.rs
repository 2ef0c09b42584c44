//! A small reference executor for query plans over one `Graph`.
//!
//! It exists so rewritten plans can be run and compared, not as a query
//! engine. Rows come back in a deterministic order: store order for
//! patterns, left-then-right for joins and unions.

use tracing::debug;

use graphward_contracts::{
    error::{SecurityError, SecurityResult},
    term::{Statement, Term},
};
use graphward_core::traits::Graph;

use crate::algebra::{compatible, merge, Binding, Expr, Op};

/// Evaluate `op` against `graph` and return its rows.
pub fn evaluate(op: &Op, graph: &dyn Graph) -> SecurityResult<Vec<Binding>> {
    let rows = match op {
        Op::Bgp(patterns) => match_bgp(patterns, graph)?,

        Op::Filter { expr, sub } => evaluate(sub, graph)?
            .into_iter()
            .filter(|row| expr.test(row))
            .collect(),

        Op::Project { vars, sub } => evaluate(sub, graph)?
            .into_iter()
            .map(|mut row| {
                row.retain(|var, _| vars.contains(var));
                row
            })
            .collect(),

        Op::Distinct(sub) | Op::Reduced(sub) => dedup(evaluate(sub, graph)?),

        Op::Slice { offset, limit, sub } => {
            let rows = evaluate(sub, graph)?.into_iter().skip(*offset);
            match limit {
                Some(limit) => rows.take(*limit).collect(),
                None => rows.collect(),
            }
        }

        Op::Extend { var, expr, sub } => evaluate(sub, graph)?
            .into_iter()
            .map(|mut row| {
                if !row.contains_key(var) {
                    if let Some(value) = expr.value(&row) {
                        row.insert(var.clone(), value);
                    }
                }
                row
            })
            .collect(),

        Op::Join(left, right) => join(&evaluate(left, graph)?, &evaluate(right, graph)?),

        Op::LeftJoin { left, right, expr } => {
            left_join(&evaluate(left, graph)?, &evaluate(right, graph)?, expr.as_ref())
        }

        Op::Union(left, right) => {
            let mut rows = evaluate(left, graph)?;
            rows.extend(evaluate(right, graph)?);
            rows
        }

        Op::Minus(left, right) => minus(evaluate(left, graph)?, &evaluate(right, graph)?),

        Op::Sequence(ops) => {
            let mut rows = vec![Binding::new()];
            for op in ops {
                rows = join(&rows, &evaluate(op, graph)?);
            }
            rows
        }

        Op::Table { rows, .. } => rows.clone(),

        Op::Null => Vec::new(),

        Op::Order { .. }
        | Op::Group { .. }
        | Op::Graph { .. }
        | Op::Service { .. }
        | Op::Path { .. }
        | Op::Disjunction(_) => {
            return Err(SecurityError::QueryEvaluation {
                reason: format!("operator '{}' is not supported by the reference executor", op.name()),
            })
        }
    };
    debug!(op = op.name(), rows = rows.len(), "evaluated");
    Ok(rows)
}

fn match_bgp(patterns: &[Statement], graph: &dyn Graph) -> SecurityResult<Vec<Binding>> {
    let mut rows = vec![Binding::new()];
    for pattern in patterns {
        let mut next = Vec::new();
        for row in &rows {
            let bound = substitute(pattern, row);
            for statement in graph.find(&bound)? {
                if let Some(extended) = extend(row, pattern, &statement) {
                    next.push(extended);
                }
            }
        }
        rows = next;
    }
    Ok(rows)
}

/// `pattern` with variables bound in `row` replaced by their values and the
/// rest widened to `Term::Any` for the store lookup.
fn substitute(pattern: &Statement, row: &Binding) -> Statement {
    let resolve = |term: &Term| match term.as_variable() {
        Some(name) => row.get(name).cloned().unwrap_or(Term::Any),
        None => term.clone(),
    };
    Statement::new(
        resolve(&pattern.subject),
        resolve(&pattern.predicate),
        resolve(&pattern.object),
    )
}

/// Bind the variables of `pattern` to `statement`, rejecting a statement
/// that gives a repeated variable two different values.
fn extend(row: &Binding, pattern: &Statement, statement: &Statement) -> Option<Binding> {
    let mut extended = row.clone();
    let positions = [
        (&pattern.subject, &statement.subject),
        (&pattern.predicate, &statement.predicate),
        (&pattern.object, &statement.object),
    ];
    for (template, value) in positions {
        if let Some(name) = template.as_variable() {
            match extended.get(name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    extended.insert(name.to_string(), value.clone());
                }
            }
        }
    }
    Some(extended)
}

fn join(left: &[Binding], right: &[Binding]) -> Vec<Binding> {
    let mut rows = Vec::new();
    for l in left {
        for r in right {
            if compatible(l, r) {
                rows.push(merge(l, r));
            }
        }
    }
    rows
}

fn left_join(left: &[Binding], right: &[Binding], expr: Option<&Expr>) -> Vec<Binding> {
    let mut rows = Vec::new();
    for l in left {
        let matched: Vec<Binding> = right
            .iter()
            .filter(|r| compatible(l, r))
            .map(|r| merge(l, r))
            .filter(|row| expr.map_or(true, |e| e.test(row)))
            .collect();
        if matched.is_empty() {
            rows.push(l.clone());
        } else {
            rows.extend(matched);
        }
    }
    rows
}

/// Rows of `left` with no compatible row in `right` sharing a variable.
fn minus(left: Vec<Binding>, right: &[Binding]) -> Vec<Binding> {
    left.into_iter()
        .filter(|l| {
            !right
                .iter()
                .any(|r| compatible(l, r) && l.keys().any(|k| r.contains_key(k)))
        })
        .collect()
}

fn dedup(rows: Vec<Binding>) -> Vec<Binding> {
    let mut unique: Vec<Binding> = Vec::with_capacity(rows.len());
    for row in rows {
        if !unique.contains(&row) {
            unique.push(row);
        }
    }
    unique
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use graphward_core::MemGraph;

    use super::*;

    fn st(s: &str, p: &str, o: &str) -> Statement {
        Statement::new(Term::iri(s), Term::iri(p), Term::iri(o))
    }

    fn people() -> MemGraph {
        MemGraph::from_statements(vec![
            st("alice", "knows", "bob"),
            st("bob", "knows", "carol"),
            st("carol", "knows", "carol"),
            st("alice", "age", "n30"),
        ])
    }

    fn var(name: &str) -> Term {
        Term::variable(name)
    }

    fn values(rows: &[Binding], name: &str) -> Vec<Term> {
        rows.iter().filter_map(|r| r.get(name).cloned()).collect()
    }

    #[test]
    fn bgp_joins_patterns_on_shared_variables() {
        let plan = Op::bgp(vec![
            Statement::new(var("a"), Term::iri("knows"), var("b")),
            Statement::new(var("b"), Term::iri("knows"), var("c")),
        ]);
        let rows = evaluate(&plan, &people()).unwrap();
        assert_eq!(values(&rows, "a"), vec![Term::iri("alice"), Term::iri("bob"), Term::iri("carol")]);
        assert_eq!(values(&rows, "c"), vec![Term::iri("carol"), Term::iri("carol"), Term::iri("carol")]);
    }

    #[test]
    fn repeated_variable_in_one_pattern_must_agree() {
        let plan = Op::bgp(vec![Statement::new(var("x"), Term::iri("knows"), var("x"))]);
        let rows = evaluate(&plan, &people()).unwrap();
        assert_eq!(values(&rows, "x"), vec![Term::iri("carol")]);
    }

    #[test]
    fn left_join_keeps_unmatched_rows() {
        let plan = Op::LeftJoin {
            left: Box::new(Op::bgp(vec![Statement::new(var("p"), Term::iri("knows"), Term::Any)])),
            right: Box::new(Op::bgp(vec![Statement::new(var("p"), Term::iri("age"), var("age"))])),
            expr: None,
        };
        let rows = evaluate(&plan, &people()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(values(&rows, "age"), vec![Term::iri("n30")]);
    }

    #[test]
    fn minus_union_distinct_and_slice() {
        let knows = Op::bgp(vec![Statement::new(var("p"), Term::iri("knows"), Term::Any)]);
        let aged = Op::bgp(vec![Statement::new(var("p"), Term::iri("age"), Term::Any)]);

        let rows = evaluate(&Op::Minus(Box::new(knows.clone()), Box::new(aged.clone())), &people()).unwrap();
        assert_eq!(values(&rows, "p"), vec![Term::iri("bob"), Term::iri("carol")]);

        let both = Op::Distinct(Box::new(Op::union(knows.clone(), aged)));
        let rows = evaluate(&both, &people()).unwrap();
        assert_eq!(rows.len(), 3);

        let rows = evaluate(&Op::slice(1, Some(1), knows), &people()).unwrap();
        assert_eq!(values(&rows, "p"), vec![Term::iri("bob")]);
    }

    #[test]
    fn filter_project_and_extend() {
        let plan = Op::project(
            &["b", "who"],
            Op::Extend {
                var: "who".to_string(),
                expr: Expr::var("a"),
                sub: Box::new(Op::filter(
                    Expr::not_equals(Expr::var("a"), Expr::Const(Term::iri("alice"))),
                    Op::bgp(vec![Statement::new(var("a"), Term::iri("knows"), var("b"))]),
                )),
            },
        );
        let rows = evaluate(&plan, &people()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == 2 && !r.contains_key("a")));
        assert_eq!(values(&rows, "who"), vec![Term::iri("bob"), Term::iri("carol")]);
    }

    #[test]
    fn table_sequence_and_null() {
        let mut row = Binding::new();
        row.insert("p".to_string(), Term::iri("bob"));
        let plan = Op::Sequence(vec![
            Op::Table {
                vars: vec!["p".to_string()],
                rows: vec![row],
            },
            Op::bgp(vec![Statement::new(var("p"), Term::iri("knows"), var("q"))]),
        ]);
        let rows = evaluate(&plan, &people()).unwrap();
        assert_eq!(values(&rows, "q"), vec![Term::iri("carol")]);

        assert!(evaluate(&Op::Null, &people()).unwrap().is_empty());
        assert_eq!(evaluate(&Op::bgp(vec![]), &people()).unwrap(), vec![Binding::new()]);
    }

    #[test]
    fn unsupported_operator_is_a_query_error() {
        let plan = Op::graph(Term::iri("urn:g"), Op::Null);
        match evaluate(&plan, &people()) {
            Err(SecurityError::QueryEvaluation { reason }) => assert!(reason.contains("graph")),
            other => panic!("expected QueryEvaluation, got {:?}", other),
        }
    }
}
