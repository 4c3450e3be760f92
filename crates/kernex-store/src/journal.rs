//! Append-only journal of ledger transactions.

use std::collections::HashMap;

use kernex_types::{
    AccountId, KernexError, LedgerTransaction, Result, TransactionId, TransactionKind,
    TransactionStatus,
};

/// Every balance-affecting event, in commit order.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<LedgerTransaction>,
    index: HashMap<TransactionId, usize>,
    /// Rows carrying each external reference, by kind.
    references: HashMap<(TransactionKind, String), Vec<usize>>,
}

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    ///
    /// # Errors
    /// Returns `Store` if a row with the same id exists.
    pub fn append(&mut self, tx: LedgerTransaction) -> Result<()> {
        if self.index.contains_key(&tx.id) {
            return Err(KernexError::Store(format!("transaction {} already journalled", tx.id)));
        }
        let pos = self.entries.len();
        self.index.insert(tx.id, pos);
        if let Some(reference) = &tx.external_ref {
            self.index_reference(tx.kind, reference.clone(), pos);
        }
        self.entries.push(tx);
        Ok(())
    }

    fn index_reference(&mut self, kind: TransactionKind, reference: String, pos: usize) {
        let rows = self.references.entry((kind, reference)).or_default();
        if !rows.contains(&pos) {
            rows.push(pos);
        }
    }

    /// Resolve a pending row to `status`, attaching the external reference
    /// if one is given. Each row can be resolved once.
    ///
    /// # Errors
    /// - `TransactionNotFound` if no such row exists
    /// - `Store` if the row is not pending or `status` is pending
    pub fn resolve(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
        external_ref: Option<String>,
    ) -> Result<()> {
        let pos = *self
            .index
            .get(&id)
            .ok_or(KernexError::TransactionNotFound(id))?;
        let tx = &mut self.entries[pos];
        if !tx.is_pending() || status == TransactionStatus::Pending {
            return Err(KernexError::Store(format!(
                "transaction {id} cannot move from {} to {status}",
                tx.status
            )));
        }
        tx.status = status;
        let kind = tx.kind;
        if let Some(reference) = external_ref {
            tx.external_ref = Some(reference.clone());
            self.index_reference(kind, reference, pos);
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<&LedgerTransaction> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    /// Up to `limit` rows for `account`, newest first.
    #[must_use]
    pub fn for_account(&self, account: AccountId, limit: usize) -> Vec<&LedgerTransaction> {
        self.entries
            .iter()
            .rev()
            .filter(|tx| tx.account == account)
            .take(limit)
            .collect()
    }

    /// Whether a non-failed row of `kind` carries `reference`.
    #[must_use]
    pub fn has_external_ref(&self, kind: TransactionKind, reference: &str) -> bool {
        self.references
            .get(&(kind, reference.to_string()))
            .is_some_and(|rows| {
                rows.iter().any(|&pos| {
                    let tx = &self.entries[pos];
                    tx.status != TransactionStatus::Failed
                        && tx.external_ref.as_deref() == Some(reference)
                })
            })
    }

    /// All rows, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerTransaction> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
