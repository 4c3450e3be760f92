//! The exchange store: ledger, order book and journal behind one commit point.

use std::{collections::HashSet, path::Path};

use kernex_types::{AccountId, KernexError, OrderId, Result};

use crate::{
    batch::{Mutation, WriteBatch},
    journal::Journal,
    ledger_store::LedgerStore,
    order_book::OrderBookTable,
    wal::WriteAheadLog,
};

/// All durable exchange state.
///
/// [`ExchangeStore::commit`] is the only way state changes: the batch is
/// dry-run against scratch copies of everything it touches, then logged,
/// then applied. A failure in either of the first two steps leaves the
/// store untouched.
#[derive(Debug, Default)]
pub struct ExchangeStore {
    ledger: LedgerStore,
    book: OrderBookTable,
    journal: Journal,
    wal: Option<WriteAheadLog>,
    commits: u64,
}

impl ExchangeStore {
    /// A store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store backed by the write-ahead log at `path`, rebuilt by
    /// replaying every batch already in it.
    ///
    /// # Errors
    /// Propagates log errors, and returns `Store` if a logged batch no
    /// longer validates (the log does not belong to this state).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let (wal, records) = WriteAheadLog::open(path)?;
        let mut store = Self::in_memory();
        for record in &records {
            store.validate(&record.batch).map_err(|e| {
                KernexError::Store(format!("replay of batch {} failed: {e}", record.seq))
            })?;
            store.apply(&record.batch);
        }
        tracing::info!(
            batches = records.len(),
            accounts = store.ledger.len(),
            orders = store.book.len(),
            "Exchange store restored"
        );
        store.wal = Some(wal);
        Ok(store)
    }

    /// Validate, log and apply a batch as one unit.
    ///
    /// # Errors
    /// Any validation error from the ledger, order book or journal, or a
    /// log write failure. State is unchanged on error.
    pub fn commit(&mut self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.validate(batch)?;
        if let Some(wal) = self.wal.as_mut() {
            wal.append(batch)
                .map_err(|e| KernexError::Store(format!("write-ahead log append failed: {e}")))?;
        }
        self.apply(batch);
        tracing::debug!(
            commit = self.commits,
            mutations = batch.len(),
            "Batch committed"
        );
        Ok(())
    }

    /// Dry-run the batch. Order and journal mutations are replayed on
    /// scratch copies of the records they touch; balance mutations are
    /// checked as net deltas.
    fn validate(&self, batch: &WriteBatch) -> Result<()> {
        let opened = batch.opened_accounts();
        let mut seen_opens = HashSet::new();
        let account_known =
            |account: AccountId| self.ledger.contains(&account) || opened.contains(&account);

        let mut scratch_book = OrderBookTable::new();
        let mut scratch_journal = Journal::new();

        for mutation in batch.mutations() {
            match mutation {
                Mutation::OpenAccount { account } => {
                    if self.ledger.contains(account) || !seen_opens.insert(*account) {
                        return Err(KernexError::Store(format!(
                            "account {account} already exists"
                        )));
                    }
                }
                Mutation::Adjust { account, .. } => {
                    if !account_known(*account) {
                        return Err(KernexError::AccountNotFound(*account));
                    }
                }
                Mutation::InsertOrder { order } => {
                    if !account_known(order.seller) {
                        return Err(KernexError::AccountNotFound(order.seller));
                    }
                    if self.book.contains(&order.id) {
                        return Err(KernexError::Store(format!(
                            "order {} already exists",
                            order.id
                        )));
                    }
                    scratch_book.insert(order.clone())?;
                }
                Mutation::RecordFill {
                    fill,
                    reserve_taken,
                } => {
                    if !account_known(fill.buyer) {
                        return Err(KernexError::AccountNotFound(fill.buyer));
                    }
                    self.stage_order(&mut scratch_book, fill.order_id)?;
                    scratch_book.append_fill(fill.clone(), *reserve_taken)?;
                }
                Mutation::ReleaseReserve { order_id, amount } => {
                    self.stage_order(&mut scratch_book, *order_id)?;
                    scratch_book.release_reserve(*order_id, *amount)?;
                }
                Mutation::SetOrderStatus {
                    order_id,
                    status,
                    at,
                } => {
                    self.stage_order(&mut scratch_book, *order_id)?;
                    scratch_book.update_status(*order_id, *status, *at)?;
                }
                Mutation::AppendTransaction { tx } => {
                    if !account_known(tx.account) {
                        return Err(KernexError::AccountNotFound(tx.account));
                    }
                    if self.journal.get(&tx.id).is_some() {
                        return Err(KernexError::Store(format!(
                            "transaction {} already journalled",
                            tx.id
                        )));
                    }
                    scratch_journal.append(tx.clone())?;
                }
                Mutation::ResolveTransaction {
                    id,
                    status,
                    external_ref,
                } => {
                    if scratch_journal.get(id).is_none() {
                        let existing = self
                            .journal
                            .get(id)
                            .ok_or(KernexError::TransactionNotFound(*id))?;
                        scratch_journal.append(existing.clone())?;
                    }
                    scratch_journal.resolve(*id, *status, external_ref.clone())?;
                }
            }
        }

        self.ledger.check(&batch.net_deltas(), &opened)
    }

    /// Copy an existing order into the scratch table, once.
    fn stage_order(&self, scratch: &mut OrderBookTable, id: OrderId) -> Result<()> {
        if scratch.contains(&id) {
            return Ok(());
        }
        let order = self.book.get(&id).ok_or(KernexError::OrderNotOpen(id))?;
        scratch.insert(order.clone())?;
        Ok(())
    }

    /// Apply a validated batch. Individual steps cannot fail here; the
    /// results are ignored only because `validate` already ran them.
    fn apply(&mut self, batch: &WriteBatch) {
        for mutation in batch.mutations() {
            let outcome = match mutation.clone() {
                Mutation::OpenAccount { account } => self.ledger.open(account),
                Mutation::Adjust {
                    account,
                    currency,
                    delta,
                } => {
                    self.ledger.apply(account, currency, delta);
                    Ok(())
                }
                Mutation::InsertOrder { order } => self.book.insert(order).map(|_| ()),
                Mutation::RecordFill {
                    fill,
                    reserve_taken,
                } => self.book.append_fill(fill, reserve_taken),
                Mutation::ReleaseReserve { order_id, amount } => {
                    self.book.release_reserve(order_id, amount)
                }
                Mutation::SetOrderStatus {
                    order_id,
                    status,
                    at,
                } => self.book.update_status(order_id, status, at),
                Mutation::AppendTransaction { tx } => self.journal.append(tx),
                Mutation::ResolveTransaction {
                    id,
                    status,
                    external_ref,
                } => self.journal.resolve(id, status, external_ref),
            };
            if let Err(e) = outcome {
                tracing::error!(error = %e, "Validated mutation failed to apply");
                debug_assert!(false, "validated mutation failed to apply: {e}");
            }
        }
        self.commits += 1;
    }

    #[must_use]
    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    #[must_use]
    pub fn book(&self) -> &OrderBookTable {
        &self.book
    }

    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Number of batches applied since this store was created (replayed
    /// batches included).
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Whether commits are durably logged.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.wal.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kernex_types::{Currency, LedgerTransaction, Order, OrderStatus, TransactionKind};
    use rust_decimal::Decimal;

    fn funded_store(amount: i64) -> (ExchangeStore, AccountId) {
        let mut store = ExchangeStore::in_memory();
        let account = AccountId::new();
        let mut batch = WriteBatch::new();
        batch
            .open_account(account)
            .adjust(account, Currency::Kernelcoin, Decimal::new(amount, 0));
        store.commit(&batch).unwrap();
        (store, account)
    }

    #[test]
    fn open_and_fund_in_one_batch() {
        let (store, account) = funded_store(1000);
        assert_eq!(
            store.ledger().balance(account, Currency::Kernelcoin).unwrap(),
            Decimal::new(1000, 0)
        );
        assert_eq!(store.commits(), 1);
    }

    #[test]
    fn failing_batch_leaves_nothing_behind() {
        let (mut store, account) = funded_store(100);
        let order = Order::dummy_open(
            account,
            Currency::Kernelcoin,
            Decimal::new(100, 0),
            Decimal::new(100, 0),
        );
        let order_id = order.id;
        let mut batch = WriteBatch::new();
        batch
            .adjust(account, Currency::Kernelcoin, Decimal::new(-100, 0))
            .insert_order(order)
            // Overdraws the litecoin balance: the whole batch must fail.
            .adjust(account, Currency::Litecoin, Decimal::new(-1, 0));

        let err = store.commit(&batch).unwrap_err();
        assert!(matches!(err, KernexError::InsufficientBalance { .. }));
        assert!(store.book().get(&order_id).is_none());
        assert_eq!(
            store.ledger().balance(account, Currency::Kernelcoin).unwrap(),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn fill_then_complete_in_one_batch() {
        let (mut store, seller) = funded_store(100);
        let order = Order::dummy_open(
            seller,
            Currency::Kernelcoin,
            Decimal::new(100, 0),
            Decimal::new(100, 0),
        );
        let order_id = order.id;
        let mut open = WriteBatch::new();
        open.adjust(seller, Currency::Kernelcoin, Decimal::new(-100, 0))
            .insert_order(order);
        store.commit(&open).unwrap();

        let fill = kernex_types::Fill {
            id: kernex_types::FillId::new(),
            order_id,
            buyer: seller,
            quantity: Decimal::new(100, 0),
            gave_currency: Currency::Litecoin,
            gave_amount: Decimal::ZERO,
            received_currency: Currency::Kernelcoin,
            received_amount: Decimal::new(100, 0),
            executed_at: Utc::now(),
        };
        let mut settle = WriteBatch::new();
        settle
            .record_fill(fill, Decimal::new(100, 0))
            .set_order_status(order_id, OrderStatus::Completed, Utc::now());
        store.commit(&settle).unwrap();

        let stored = store.book().get(&order_id).unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.reserved, Decimal::ZERO);
    }

    #[test]
    fn status_change_after_terminal_in_same_batch_fails() {
        let (mut store, seller) = funded_store(100);
        let order = Order::dummy_open(
            seller,
            Currency::Kernelcoin,
            Decimal::new(10, 0),
            Decimal::new(10, 0),
        );
        let order_id = order.id;
        let mut open = WriteBatch::new();
        open.insert_order(order);
        store.commit(&open).unwrap();

        let mut twice = WriteBatch::new();
        twice
            .set_order_status(order_id, OrderStatus::Cancelled, Utc::now())
            .set_order_status(order_id, OrderStatus::Cancelled, Utc::now());
        let err = store.commit(&twice).unwrap_err();
        assert!(matches!(err, KernexError::OrderNotOpen(_)));
        assert!(store.book().get(&order_id).unwrap().is_open());
    }

    #[test]
    fn adjusting_unknown_account_fails() {
        let mut store = ExchangeStore::in_memory();
        let mut batch = WriteBatch::new();
        batch.adjust(AccountId::new(), Currency::Litecoin, Decimal::ONE);
        assert!(matches!(
            store.commit(&batch),
            Err(KernexError::AccountNotFound(_))
        ));
    }

    #[test]
    fn wal_backed_store_replays() {
        let path =
            std::env::temp_dir().join(format!("kernex-store-{}.log", uuid::Uuid::now_v7()));
        let account = AccountId::new();
        {
            let mut store = ExchangeStore::open(&path).unwrap();
            assert!(store.is_durable());
            let mut batch = WriteBatch::new();
            batch
                .open_account(account)
                .adjust(account, Currency::Litecoin, Decimal::new(250, 0))
                .append_transaction(LedgerTransaction::confirmed(
                    account,
                    Currency::Litecoin,
                    Decimal::new(250, 0),
                    TransactionKind::Deposit,
                    Utc::now(),
                ));
            store.commit(&batch).unwrap();
        }
        let store = ExchangeStore::open(&path).unwrap();
        assert_eq!(
            store.ledger().balance(account, Currency::Litecoin).unwrap(),
            Decimal::new(250, 0)
        );
        assert_eq!(store.journal().len(), 1);
        std::fs::remove_file(path).ok();
    }
}
