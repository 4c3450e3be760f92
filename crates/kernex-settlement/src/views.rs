//! Typed results and read models returned by the engine.

use chrono::{DateTime, Utc};
use kernex_types::{
    AccountId, BalanceSheet, Currency, Fill, FillId, Order, OrderId, OrderStatus,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of a successful fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillResult {
    pub fill: Fill,
    /// Order status after the fill (`Open` or `Completed`).
    pub order_status: OrderStatus,
    /// Base quantity still unfilled.
    pub remaining: Decimal,
}

/// Outcome of a successful cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelResult {
    pub order_id: OrderId,
    pub refunded_currency: Currency,
    /// What was left in the reservation, credited back to the seller.
    pub refunded_amount: Decimal,
    pub cancelled_at: DateTime<Utc>,
}

/// Balances of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account: AccountId,
    pub available: BalanceSheet,
    /// Held by the account's open orders.
    pub reserved: BalanceSheet,
}

impl AccountSummary {
    /// Available plus reserved.
    #[must_use]
    pub fn total(&self) -> BalanceSheet {
        self.available + self.reserved
    }
}

/// A fill seen from the buyer's side: a completed trade with the order's
/// currency labels swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterTrade {
    pub fill_id: FillId,
    pub order_id: OrderId,
    /// The order's seller.
    pub counterparty: AccountId,
    pub sold_currency: Currency,
    pub sold_amount: Decimal,
    pub bought_currency: Currency,
    pub bought_amount: Decimal,
    pub price_per_unit: Decimal,
    pub status: OrderStatus,
    pub executed_at: DateTime<Utc>,
}

impl CounterTrade {
    #[must_use]
    pub fn from_fill(fill: &Fill, order: &Order) -> Self {
        Self {
            fill_id: fill.id,
            order_id: order.id,
            counterparty: order.seller,
            sold_currency: fill.gave_currency,
            sold_amount: fill.gave_amount,
            bought_currency: fill.received_currency,
            bought_amount: fill.received_amount,
            price_per_unit: order.price_per_unit,
            status: OrderStatus::Completed,
            executed_at: fill.executed_at,
        }
    }
}

/// One row of an account's order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum AccountOrderEntry {
    /// An order the account placed.
    Own(Order),
    /// A fill the account made against someone else's order.
    Counter(CounterTrade),
}

impl AccountOrderEntry {
    /// Creation time for own orders, execution time for counter-trades.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Own(order) => order.created_at,
            Self::Counter(trade) => trade.executed_at,
        }
    }
}

/// Price of open orders selling KCN for LTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceStats {
    pub average: Decimal,
    pub minimum: Decimal,
    /// Orders the figures were computed over.
    pub sample_size: usize,
}

/// Exchange-wide holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EscrowTotals {
    pub available: BalanceSheet,
    pub reserved: BalanceSheet,
    pub accounts: usize,
}

impl EscrowTotals {
    #[must_use]
    pub fn total(&self) -> BalanceSheet {
        self.available + self.reserved
    }
}
