//! Lazy, permission-filtered iteration over store statements.
//!
//! Construction is eager: graph-level read is checked immediately, and a
//! caller with no read right on the graph gets `PermissionDenied` before any
//! statement is pulled. Per-statement filtering is lazy and silent: entries
//! the caller may not read are skipped, never reported.
//!
//! When the evaluator grants read over `Triple::ANY` at construction time,
//! every statement passes through with no further evaluator calls.

use tracing::{debug, warn};

use graphward_contracts::{error::SecurityResult, term::Statement, triple::Triple};

use crate::{
    cache::UnitOfWork,
    item::SecuredItem,
    traits::StatementIter,
};

/// A filtering wrapper around a lazy sequence of statements.
///
/// Holds its own unit of work for as long as it lives, so per-element
/// decisions stay cached across the whole iteration. No buffering is added:
/// the wrapper can only be restarted by building a new one over a fresh
/// sequence. Not meant for concurrent consumption.
pub struct SecuredIter<I = StatementIter> {
    inner: I,
    item: SecuredItem,
    unfiltered: bool,
    skipped: usize,
    // Dropped after `inner`, so the scope outlives the sequence it guards.
    _unit: UnitOfWork,
}

impl<I> SecuredIter<I>
where
    I: Iterator<Item = Statement>,
{
    /// Check graph-level read and wrap `inner`.
    pub fn new(item: &SecuredItem, inner: I) -> SecurityResult<Self> {
        let unit = item.scope().enter();
        item.check_read()?;
        let unfiltered = item.can_read_triple(&Triple::ANY)?;
        debug!(graph = %item.graph_id(), unfiltered, "secured iteration started");
        Ok(Self {
            inner,
            item: item.clone(),
            unfiltered,
            skipped: 0,
            _unit: unit,
        })
    }

    /// True when blanket read was granted and no per-element checks run.
    pub fn is_unfiltered(&self) -> bool {
        self.unfiltered
    }

    /// Number of statements silently dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<I> Iterator for SecuredIter<I>
where
    I: Iterator<Item = Statement>,
{
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        if self.unfiltered {
            return self.inner.next();
        }
        for statement in self.inner.by_ref() {
            match self.item.can_read_statement(&statement) {
                Ok(true) => return Some(statement),
                Ok(false) => self.skipped += 1,
                Err(e) => {
                    // An error here is conservatively treated as "not readable".
                    warn!(graph = %self.item.graph_id(), error = %e, "read check failed during iteration");
                    self.skipped += 1;
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.inner.size_hint();
        if self.unfiltered {
            (lower, upper)
        } else {
            (0, upper)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
