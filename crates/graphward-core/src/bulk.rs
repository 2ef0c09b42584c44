//! Authorization of bulk add/remove/replace.
//!
//! Algorithm, per action:
//!
//! 1. Require graph-level Update.
//! 2. If the action is granted over `Triple::ANY`, authorize the whole batch
//!    with no per-triple checks.
//! 3. Otherwise check each triple in input order, stopping at the first
//!    denial. Later triples are never tested.
//!
//! Callers commit to the store only after `authorize*` returns `Ok`, so this
//! layer never writes a partially-checked batch. It makes no claim about the
//! store's own atomicity.

use tracing::debug;

use graphward_contracts::{
    action::Action,
    error::SecurityResult,
    term::Statement,
    triple::Triple,
};

use crate::item::SecuredItem;

/// Authorizes batches against one [`SecuredItem`].
///
/// The caller must hold an active unit of work on the item's scope.
pub struct BulkAuthorizer<'a> {
    item: &'a SecuredItem,
}

impl<'a> BulkAuthorizer<'a> {
    pub fn new(item: &'a SecuredItem) -> Self {
        Self { item }
    }

    /// Authorize `action` on every statement of `statements`.
    pub fn authorize(&self, action: Action, statements: &[Statement]) -> SecurityResult<()> {
        self.item.check_update()?;
        self.authorize_elements(action, statements)
    }

    pub fn authorize_create(&self, statements: &[Statement]) -> SecurityResult<()> {
        self.authorize(Action::Create, statements)
    }

    pub fn authorize_delete(&self, statements: &[Statement]) -> SecurityResult<()> {
        self.authorize(Action::Delete, statements)
    }

    /// Authorize removing `removed` and then adding `added` as one batch.
    ///
    /// Deletions are checked before creations, each in input order.
    pub fn authorize_replace(&self, removed: &[Statement], added: &[Statement]) -> SecurityResult<()> {
        self.item.check_update()?;
        self.authorize_elements(Action::Delete, removed)?;
        self.authorize_elements(Action::Create, added)
    }

    /// Drain `statements` into a vector and authorize it.
    ///
    /// Returns the fully-authorized batch, ready to hand to the store.
    pub fn collect_authorized<I>(&self, action: Action, statements: I) -> SecurityResult<Vec<Statement>>
    where
        I: IntoIterator<Item = Statement>,
    {
        let batch: Vec<Statement> = statements.into_iter().collect();
        self.authorize(action, &batch)?;
        Ok(batch)
    }

    fn authorize_elements(&self, action: Action, statements: &[Statement]) -> SecurityResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        if self.item.can_triple(action, &Triple::ANY)? {
            debug!(
                graph = %self.item.graph_id(),
                action = %action,
                count = statements.len(),
                "blanket permission, skipping per-triple checks"
            );
            return Ok(());
        }
        self.item
            .check_each(action, statements.iter().map(Statement::to_triple))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
