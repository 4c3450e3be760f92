//! Settlement engine.
//!
//! Every state change goes through one exclusive lock:
//! 1. Validate the request against current state
//! 2. Describe its effect as a single [`WriteBatch`]
//! 3. Commit the batch (all-or-nothing, logged first when durable)
//! 4. Update the supply and deposit trackers
//!
//! Queries take the shared side of the lock and therefore only ever see
//! whole batches. The one call that leaves the process,
//! [`FundsTransferPort::send`], runs with no lock held.

use std::sync::Arc;

use chrono::Utc;
use kernex_store::{ExchangeStore, WriteBatch};
use kernex_types::{
    AccountId, BalanceSheet, Currency, ExchangeConfig, Fill, FillId, KernexError,
    LedgerTransaction, Order, OrderId, OrderStatus, Result, TransactionId, TransactionKind,
    TransactionStatus,
    constants::{AMOUNT_PRECISION, MAX_SUPPLY},
};
use parking_lot::RwLock;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    funds::{FundsTransferPort, OfflineTransferPort},
    idempotency::DepositGuard,
    supply_conservation::SupplyConservation,
    views::{
        AccountOrderEntry, AccountSummary, CancelResult, CounterTrade, EscrowTotals, FillResult,
        PriceStats,
    },
};

/// Everything guarded by the engine lock.
struct EngineState {
    store: ExchangeStore,
    supply: SupplyConservation,
    deposits: DepositGuard,
}

impl EngineState {
    /// Available balances plus open reservations, per currency.
    fn actual_supply(&self) -> BalanceSheet {
        self.store.ledger().totals() + self.store.book().total_reserved()
    }

    fn verify_supply(&self) -> Result<()> {
        self.supply.verify_all(&self.actual_supply())
    }

    #[cfg(debug_assertions)]
    fn audit(&self) {
        let check = self.verify_supply();
        debug_assert!(check.is_ok(), "supply conservation broken: {check:?}");
    }

    #[cfg(not(debug_assertions))]
    fn audit(&self) {}

    fn summary(&self, account: AccountId) -> Result<AccountSummary> {
        Ok(AccountSummary {
            account,
            available: self.store.ledger().sheet(account)?,
            reserved: self.store.book().reserved_by(account),
        })
    }
}

/// Reject non-positive amounts, amounts above [`MAX_SUPPLY`] and amounts
/// finer than the ledger precision.
fn check_amount(amount: Decimal, what: &str) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(KernexError::InvalidAmount {
            reason: format!("{what} must be positive, got {amount}"),
        });
    }
    if amount > Decimal::from(MAX_SUPPLY) {
        return Err(KernexError::InvalidAmount {
            reason: format!("{what} {amount} exceeds the limit of {MAX_SUPPLY}"),
        });
    }
    if amount.normalize().scale() > AMOUNT_PRECISION {
        return Err(KernexError::InvalidAmount {
            reason: format!("{what} {amount} has more than {AMOUNT_PRECISION} decimal places"),
        });
    }
    Ok(())
}

/// The exchange's single writer.
///
/// Cheap to share: wrap it in an [`Arc`] and call it from any thread.
pub struct SettlementEngine {
    config: ExchangeConfig,
    state: RwLock<EngineState>,
    transfer: Arc<dyn FundsTransferPort>,
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SettlementEngine {
    /// Engine with the offline transfer port (no wallets attached).
    ///
    /// # Errors
    /// Invalid configuration, or a write-ahead log that cannot be replayed.
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        Self::with_transfer_port(config, Arc::new(OfflineTransferPort))
    }

    /// Engine sending withdrawals through `transfer`.
    ///
    /// When `config.wal_path` is set, the log is replayed and every later
    /// commit is appended to it.
    ///
    /// # Errors
    /// - `Configuration` for invalid settings
    /// - `Store` / `Io` if the log cannot be replayed
    /// - `SupplyInvariantViolation` if the replayed state does not balance
    pub fn with_transfer_port(
        config: ExchangeConfig,
        transfer: Arc<dyn FundsTransferPort>,
    ) -> Result<Self> {
        config.validate()?;
        let store = match &config.wal_path {
            Some(path) => ExchangeStore::open(path)?,
            None => ExchangeStore::in_memory(),
        };

        let supply = SupplyConservation::from_journal(store.journal().iter())?;
        let mut deposits = DepositGuard::new(config.deposit_guard_capacity);
        let mut pending = 0usize;
        for tx in store.journal().iter() {
            match tx.kind {
                TransactionKind::Deposit => {
                    if let Some(reference) = &tx.external_ref {
                        deposits.remember(reference);
                    }
                }
                TransactionKind::Withdrawal if tx.is_pending() => pending += 1,
                _ => {}
            }
        }

        let state = EngineState {
            store,
            supply,
            deposits,
        };
        state.verify_supply()?;

        if pending > 0 {
            tracing::warn!(
                pending,
                "Withdrawals with unknown outcome found on startup; reconcile before resolving"
            );
        }
        tracing::info!(
            accounts = state.store.ledger().len(),
            orders = state.store.book().len(),
            durable = state.store.is_durable(),
            "Settlement engine started"
        );

        Ok(Self {
            config,
            state: RwLock::new(state),
            transfer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------

    /// Open an account with zero balances in both currencies.
    pub fn open_account(&self) -> Result<AccountId> {
        let account = AccountId::new();
        let mut batch = WriteBatch::new();
        batch.open_account(account);

        let mut state = self.state.write();
        state.store.commit(&batch)?;
        tracing::info!(%account, "Account opened");
        Ok(account)
    }

    // -----------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------

    /// Reserve `sell_amount` from the seller and open an order asking
    /// `buy_amount` of the other currency for it.
    ///
    /// # Errors
    /// - `InvalidAmount` for non-positive or over-precise amounts
    /// - `InvalidOrder` if both currencies are the same
    /// - `AccountNotFound` for an unknown seller
    /// - `TooManyOpenOrders` when the seller is at the open-order cap
    /// - `InsufficientBalance` if the seller cannot cover the reservation
    pub fn create_order(
        &self,
        seller: AccountId,
        sell_currency: Currency,
        sell_amount: Decimal,
        buy_currency: Currency,
        buy_amount: Decimal,
    ) -> Result<OrderId> {
        check_amount(sell_amount, "Sell amount")?;
        check_amount(buy_amount, "Buy amount")?;
        if sell_currency == buy_currency {
            return Err(KernexError::InvalidOrder {
                reason: format!("Cannot exchange {sell_currency} for itself"),
            });
        }

        let mut state = self.state.write();
        let available = state.store.ledger().balance(seller, sell_currency)?;

        let open = state.store.book().open_count(seller);
        if open >= self.config.max_open_orders {
            tracing::warn!(
                %seller,
                open,
                limit = self.config.max_open_orders,
                "Open order cap reached"
            );
            return Err(KernexError::TooManyOpenOrders {
                limit: self.config.max_open_orders,
            });
        }
        if available < sell_amount {
            return Err(KernexError::InsufficientBalance {
                needed: sell_amount,
                available,
            });
        }

        let now = Utc::now();
        let order = Order::new_open(
            seller,
            sell_currency,
            sell_amount,
            buy_currency,
            buy_amount,
            now,
        )?;
        let order_id = order.id;
        let price = order.price_per_unit;

        let mut batch = WriteBatch::new();
        batch
            .adjust(seller, sell_currency, -sell_amount)
            .insert_order(order)
            .append_transaction(
                LedgerTransaction::confirmed(
                    seller,
                    sell_currency,
                    -sell_amount,
                    TransactionKind::OrderReserve,
                    now,
                )
                .with_order(order_id),
            );
        state.store.commit(&batch)?;
        state.audit();

        tracing::info!(
            %order_id,
            %seller,
            %sell_currency,
            %sell_amount,
            %buy_currency,
            %buy_amount,
            %price,
            "Order created"
        );
        Ok(order_id)
    }

    /// Fill `quantity` base units of an open order.
    ///
    /// The buyer hands over the order's buy currency and takes the
    /// matching share of its reservation. Partial fills never pay the
    /// seller less than the order's price: reserve draws round down and
    /// payments round up, both measured on the cumulative filled quantity.
    /// The fill that exhausts the order settles exactly the outstanding
    /// amounts, so a completed order has delivered `buy_amount` and holds
    /// nothing.
    ///
    /// # Errors
    /// - `InvalidAmount` for a non-positive or over-precise quantity, a
    ///   leg that rounds to zero, or a partial fill that would leave the
    ///   remainder nothing to settle with
    /// - `OrderNotOpen` if the order is missing or terminal
    /// - `AccountNotFound` for an unknown buyer
    /// - `SelfFillBlocked` when the buyer is the seller (unless allowed)
    /// - `FillExceedsRemaining` when `quantity` is larger than what is left
    /// - `InsufficientBalance` / `InsufficientReserve` when either side
    ///   cannot cover its leg
    pub fn fill_order(
        &self,
        order_id: OrderId,
        buyer: AccountId,
        quantity: Decimal,
    ) -> Result<FillResult> {
        check_amount(quantity, "Fill quantity")?;

        let mut state = self.state.write();
        let order = state
            .store
            .book()
            .get(&order_id)
            .filter(|o| o.is_open())
            .cloned()
            .ok_or(KernexError::OrderNotOpen(order_id))?;
        let buyer_sheet = state.store.ledger().sheet(buyer)?;

        if buyer == order.seller && !self.config.allow_self_fill {
            tracing::warn!(%order_id, %buyer, "Self-fill blocked");
            return Err(KernexError::SelfFillBlocked);
        }

        let remaining = order.remaining();
        if quantity > remaining {
            tracing::warn!(%order_id, %quantity, %remaining, "Fill exceeds remaining quantity");
            return Err(KernexError::FillExceedsRemaining {
                requested: quantity,
                remaining,
            });
        }
        let completes = quantity == remaining;

        let give_currency = order.buyer_gives();
        let receive_currency = order.buyer_receives();
        let delivered: Decimal = state
            .store
            .book()
            .fills_for(&order_id)
            .iter()
            .map(|f| f.gave_amount)
            .sum();
        let (give, receive) = if completes {
            (order.buy_amount - delivered, order.reserved)
        } else {
            // Quote legs are priced on the cumulative filled quantity: the
            // reserve is drawn down rounding down, payments round up.
            let filled = order.filled_quantity + quantity;
            let overflow = || KernexError::InvalidAmount {
                reason: format!("Fill value of {quantity} overflows"),
            };
            if give_currency.is_base() {
                let drawn = order.sell_amount - order.reserved;
                let owed = order
                    .quote_value(filled, RoundingStrategy::ToZero)
                    .ok_or_else(overflow)?;
                (quantity, owed - drawn)
            } else {
                let owed = order
                    .quote_value(filled, RoundingStrategy::AwayFromZero)
                    .ok_or_else(overflow)?;
                (owed - delivered, quantity)
            }
        };
        if give <= Decimal::ZERO || receive <= Decimal::ZERO {
            return Err(KernexError::InvalidAmount {
                reason: format!("Fill of {quantity} rounds to nothing at this price"),
            });
        }
        if !completes
            && (order.buy_amount - delivered - give <= Decimal::ZERO
                || order.reserved - receive <= Decimal::ZERO)
        {
            tracing::warn!(
                %order_id,
                %quantity,
                %remaining,
                "Fill would strand the remainder"
            );
            return Err(KernexError::InvalidAmount {
                reason: format!(
                    "Fill of {quantity} leaves nothing to settle the remaining {}",
                    remaining - quantity
                ),
            });
        }

        let available = buyer_sheet.get(give_currency);
        if available < give {
            return Err(KernexError::InsufficientBalance {
                needed: give,
                available,
            });
        }
        if order.reserved < receive {
            return Err(KernexError::InsufficientReserve {
                needed: receive,
                reserved: order.reserved,
            });
        }

        let now = Utc::now();
        let fill = Fill {
            id: FillId::new(),
            order_id,
            buyer,
            quantity,
            gave_currency: give_currency,
            gave_amount: give,
            received_currency: receive_currency,
            received_amount: receive,
            executed_at: now,
        };
        let seller = order.seller;
        let journal = |account, currency, amount, kind| {
            LedgerTransaction::confirmed(account, currency, amount, kind, now).with_order(order_id)
        };

        let mut batch = WriteBatch::new();
        batch
            .adjust(buyer, give_currency, -give)
            .adjust(buyer, receive_currency, receive)
            .adjust(seller, give_currency, give)
            .record_fill(fill.clone(), receive)
            .append_transaction(journal(
                buyer,
                give_currency,
                -give,
                TransactionKind::FillDebit,
            ))
            .append_transaction(journal(
                buyer,
                receive_currency,
                receive,
                TransactionKind::FillCredit,
            ))
            .append_transaction(journal(
                seller,
                give_currency,
                give,
                TransactionKind::FillCredit,
            ));
        let order_status = if completes {
            batch.set_order_status(order_id, OrderStatus::Completed, now);
            OrderStatus::Completed
        } else {
            OrderStatus::Open
        };
        state.store.commit(&batch)?;
        state.audit();

        tracing::info!(
            %order_id,
            %buyer,
            %seller,
            %quantity,
            %give_currency,
            gave = %give,
            %receive_currency,
            received = %receive,
            status = %order_status,
            "Order filled"
        );
        Ok(FillResult {
            fill,
            order_status,
            remaining: remaining - quantity,
        })
    }

    /// Cancel an open order and return what is left of its reservation.
    ///
    /// # Errors
    /// - `NotOwner` if `requester` is not the seller
    /// - `OrderNotOpen` if the order is missing or terminal
    pub fn cancel_order(&self, order_id: OrderId, requester: AccountId) -> Result<CancelResult> {
        let mut state = self.state.write();
        let order = state
            .store
            .book()
            .get(&order_id)
            .cloned()
            .ok_or(KernexError::OrderNotOpen(order_id))?;
        if order.seller != requester {
            tracing::warn!(%order_id, %requester, "Cancel by non-owner refused");
            return Err(KernexError::NotOwner(order_id));
        }
        if !order.is_open() {
            return Err(KernexError::OrderNotOpen(order_id));
        }

        let now = Utc::now();
        let refund = order.reserved;
        let mut batch = WriteBatch::new();
        if refund > Decimal::ZERO {
            batch
                .release_reserve(order_id, refund)
                .adjust(order.seller, order.sell_currency, refund)
                .append_transaction(
                    LedgerTransaction::confirmed(
                        order.seller,
                        order.sell_currency,
                        refund,
                        TransactionKind::OrderRelease,
                        now,
                    )
                    .with_order(order_id),
                );
        }
        batch.set_order_status(order_id, OrderStatus::Cancelled, now);
        state.store.commit(&batch)?;
        state.audit();

        tracing::info!(
            %order_id,
            seller = %order.seller,
            currency = %order.sell_currency,
            refunded = %refund,
            "Order cancelled"
        );
        Ok(CancelResult {
            order_id,
            refunded_currency: order.sell_currency,
            refunded_amount: refund,
            cancelled_at: now,
        })
    }

    // -----------------------------------------------------------------
    // Deposits & withdrawals
    // -----------------------------------------------------------------

    /// Credit a confirmed external deposit.
    ///
    /// # Errors
    /// - `InvalidAmount` for non-positive or over-precise amounts
    /// - `AccountNotFound` for an unknown account
    /// - `DuplicateDeposit` if `external_ref` was already credited
    pub fn deposit(
        &self,
        account: AccountId,
        currency: Currency,
        amount: Decimal,
        external_ref: Option<&str>,
    ) -> Result<LedgerTransaction> {
        check_amount(amount, "Deposit amount")?;

        let mut state = self.state.write();
        state.store.ledger().sheet(account)?;
        let supply = state.supply.expected_supply(currency);
        if supply + amount > Decimal::from(MAX_SUPPLY) {
            tracing::warn!(
                %account,
                %currency,
                %amount,
                %supply,
                "Deposit would exceed supply limit"
            );
            return Err(KernexError::InvalidAmount {
                reason: format!(
                    "Deposit of {amount} would raise {currency} supply above {MAX_SUPPLY}"
                ),
            });
        }
        let mut tracker = state.supply.clone();
        tracker.record_deposit(currency, amount)?;
        if let Some(reference) = external_ref {
            let seen = state.deposits.check(reference).is_err()
                || state
                    .store
                    .journal()
                    .has_external_ref(TransactionKind::Deposit, reference);
            if seen {
                tracing::warn!(%account, reference, "Duplicate deposit ignored");
                return Err(KernexError::DuplicateDeposit(reference.to_string()));
            }
        }

        let tx = LedgerTransaction::confirmed(
            account,
            currency,
            amount,
            TransactionKind::Deposit,
            Utc::now(),
        )
        .with_external_ref(external_ref.map(str::to_string));
        let mut batch = WriteBatch::new();
        batch
            .adjust(account, currency, amount)
            .append_transaction(tx.clone());
        state.store.commit(&batch)?;

        state.supply = tracker;
        if let Some(reference) = external_ref {
            state.deposits.remember(reference);
        }
        state.audit();

        tracing::info!(%account, %currency, %amount, tx = %tx.id, "Deposit credited");
        Ok(tx)
    }

    /// Send `amount` to `destination`.
    ///
    /// The amount is debited and journalled as pending first; the transfer
    /// runs with no lock held; its outcome is then committed. On transfer
    /// failure the amount is credited back and the row marked failed.
    ///
    /// # Errors
    /// - `InvalidAmount` for non-positive or over-precise amounts
    /// - `BelowMinimumWithdrawal` under the configured minimum
    /// - `AccountNotFound` / `InsufficientBalance`
    /// - `FundsTransferFailed` if the transfer port reports an error
    pub fn withdraw(
        &self,
        account: AccountId,
        currency: Currency,
        amount: Decimal,
        destination: &str,
    ) -> Result<LedgerTransaction> {
        check_amount(amount, "Withdrawal amount")?;
        if amount < self.config.min_withdrawal {
            return Err(KernexError::BelowMinimumWithdrawal {
                minimum: self.config.min_withdrawal,
            });
        }

        let tx_id = self.hold_withdrawal(account, currency, amount)?;

        let outcome = self.transfer.send(account, currency, amount, destination);

        let mut state = self.state.write();
        match outcome {
            Ok(reference) => {
                let mut batch = WriteBatch::new();
                batch.resolve_transaction(tx_id, TransactionStatus::Confirmed, Some(reference));
                state.store.commit(&batch)?;
                state.audit();
                let tx = state
                    .store
                    .journal()
                    .get(&tx_id)
                    .cloned()
                    .ok_or(KernexError::TransactionNotFound(tx_id))?;
                tracing::info!(
                    %account,
                    %currency,
                    %amount,
                    destination,
                    reference = tx.external_ref.as_deref().unwrap_or_default(),
                    "Withdrawal sent"
                );
                Ok(tx)
            }
            Err(e) => {
                let mut batch = WriteBatch::new();
                batch
                    .adjust(account, currency, amount)
                    .resolve_transaction(tx_id, TransactionStatus::Failed, None);
                state.store.commit(&batch)?;
                state.supply.reverse_withdrawal(currency, amount);
                state.audit();
                tracing::warn!(
                    %account,
                    %currency,
                    %amount,
                    destination,
                    error = %e,
                    "Withdrawal failed; funds returned"
                );
                Err(KernexError::FundsTransferFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// First phase of a withdrawal: debit and journal a pending row.
    fn hold_withdrawal(
        &self,
        account: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<TransactionId> {
        let mut state = self.state.write();
        let available = state.store.ledger().balance(account, currency)?;
        if available < amount {
            return Err(KernexError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        let tx = LedgerTransaction::confirmed(
            account,
            currency,
            -amount,
            TransactionKind::Withdrawal,
            Utc::now(),
        )
        .with_status(TransactionStatus::Pending);
        let tx_id = tx.id;
        let mut tracker = state.supply.clone();
        tracker.record_withdrawal(currency, amount)?;
        let mut batch = WriteBatch::new();
        batch
            .adjust(account, currency, -amount)
            .append_transaction(tx);
        state.store.commit(&batch)?;
        state.supply = tracker;
        state.audit();

        tracing::debug!(%account, %currency, %amount, tx = %tx_id, "Withdrawal held");
        Ok(tx_id)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// All open orders, newest first.
    #[must_use]
    pub fn get_open_orders(&self) -> Vec<Order> {
        let state = self.state.read();
        state.store.book().list_open().into_iter().cloned().collect()
    }

    /// Orders the account placed plus fills it made on other orders,
    /// newest first.
    pub fn get_account_orders(&self, account: AccountId) -> Result<Vec<AccountOrderEntry>> {
        let state = self.state.read();
        state.store.ledger().sheet(account)?;
        let book = state.store.book();

        let mut entries: Vec<AccountOrderEntry> = book
            .orders_by_seller(account)
            .into_iter()
            .cloned()
            .map(AccountOrderEntry::Own)
            .collect();
        for fill in book.fills_by_buyer(account) {
            if let Some(order) = book.get(&fill.order_id) {
                entries.push(AccountOrderEntry::Counter(CounterTrade::from_fill(fill, order)));
            }
        }
        entries.sort_by_key(|e| std::cmp::Reverse(e.timestamp()));
        Ok(entries)
    }

    #[must_use]
    pub fn get_order(&self, order_id: OrderId) -> Option<Order> {
        self.state.read().store.book().get(&order_id).cloned()
    }

    /// Fills against one order, oldest first.
    #[must_use]
    pub fn get_fills(&self, order_id: OrderId) -> Vec<Fill> {
        let state = self.state.read();
        state
            .store
            .book()
            .fills_for(&order_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Available and reserved balances of one account.
    pub fn get_balance(&self, account: AccountId) -> Result<AccountSummary> {
        self.state.read().summary(account)
    }

    /// Journal rows for one account, newest first. `None` uses the
    /// configured history limit.
    pub fn get_transactions(
        &self,
        account: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<LedgerTransaction>> {
        let state = self.state.read();
        state.store.ledger().sheet(account)?;
        let limit = limit.unwrap_or(self.config.history_limit);
        Ok(state
            .store
            .journal()
            .for_account(account, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Withdrawals whose transfer outcome was never recorded.
    #[must_use]
    pub fn pending_withdrawals(&self) -> Vec<LedgerTransaction> {
        let state = self.state.read();
        state
            .store
            .journal()
            .iter()
            .filter(|tx| tx.kind == TransactionKind::Withdrawal && tx.is_pending())
            .cloned()
            .collect()
    }

    /// Average and lowest price over open orders selling KCN for LTC.
    /// Both are 1 when there are none.
    #[must_use]
    pub fn price_stats(&self) -> PriceStats {
        let state = self.state.read();
        let prices: Vec<Decimal> = state
            .store
            .book()
            .list_open()
            .into_iter()
            .filter(|o| o.sell_currency == Currency::BASE && o.buy_currency == Currency::QUOTE)
            .map(|o| o.price_per_unit)
            .collect();

        let Some(minimum) = prices.iter().min().copied() else {
            return PriceStats {
                average: Decimal::ONE,
                minimum: Decimal::ONE,
                sample_size: 0,
            };
        };
        let total: Decimal = prices.iter().sum();
        let average = (total / Decimal::from(prices.len())).round_dp(AMOUNT_PRECISION);
        PriceStats {
            average,
            minimum,
            sample_size: prices.len(),
        }
    }

    /// Exchange-wide available and reserved totals.
    #[must_use]
    pub fn escrow_totals(&self) -> EscrowTotals {
        let state = self.state.read();
        EscrowTotals {
            available: state.store.ledger().totals(),
            reserved: state.store.book().total_reserved(),
            accounts: state.store.ledger().len(),
        }
    }

    /// Every account with its balances, ordered by account id.
    #[must_use]
    pub fn accounts_overview(&self) -> Vec<AccountSummary> {
        let state = self.state.read();
        let book = state.store.book();
        let mut rows: Vec<AccountSummary> = state
            .store
            .ledger()
            .iter()
            .map(|(&account, &available)| AccountSummary {
                account,
                available,
                reserved: book.reserved_by(account),
            })
            .collect();
        rows.sort_by_key(|r| r.account);
        rows
    }

    #[must_use]
    pub fn completed_order_count(&self) -> usize {
        self.state
            .read()
            .store
            .book()
            .count_with_status(OrderStatus::Completed)
    }

    /// Check that no value was created or destroyed.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` naming the first currency that does not
    /// balance.
    pub fn verify_supply(&self) -> Result<()> {
        let state = self.state.read();
        let result = state.verify_supply();
        if let Err(e) = &result {
            tracing::error!(error = %e, "Supply conservation violated");
        }
        result
    }
}
