//! Order book table: orders, their status transitions, and their fills.
//!
//! Pure storage. Legality of a fill or a cancel is decided by the
//! settlement engine; this table only refuses structurally impossible
//! writes (unknown ids, duplicate ids, leaving a terminal status).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kernex_types::{
    AccountId, BalanceSheet, Fill, KernexError, Order, OrderId, OrderStatus, Result,
};
use rust_decimal::Decimal;

/// Every order ever created, plus the append-only fill log.
#[derive(Debug, Default)]
pub struct OrderBookTable {
    orders: HashMap<OrderId, Order>,
    fills: Vec<Fill>,
    /// Positions in `fills` per order.
    fills_by_order: HashMap<OrderId, Vec<usize>>,
}

/// Newest first, with the time-ordered id as tie-breaker.
fn newest_first(a: &Order, b: &Order) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

impl OrderBookTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new order.
    ///
    /// # Errors
    /// Returns `Store` if an order with the same id exists.
    pub fn insert(&mut self, order: Order) -> Result<OrderId> {
        if self.orders.contains_key(&order.id) {
            return Err(KernexError::Store(format!("order {} already exists", order.id)));
        }
        let id = order.id;
        self.orders.insert(id, order);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &OrderId) -> bool {
        self.orders.contains_key(id)
    }

    /// Move an open order to `status`. Cancellation stamps `cancelled_at`.
    ///
    /// # Errors
    /// `OrderNotOpen` if the order is missing or already terminal.
    pub fn update_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let order = self
            .orders
            .get_mut(&id)
            .filter(|o| o.is_open())
            .ok_or(KernexError::OrderNotOpen(id))?;
        order.status = status;
        if status == OrderStatus::Cancelled {
            order.cancelled_at = Some(at);
        }
        Ok(())
    }

    /// Append a fill and move `reserve_taken` out of the order's reservation.
    ///
    /// # Errors
    /// - `OrderNotOpen` if the order is missing or terminal
    /// - `InsufficientReserve` if the reservation cannot cover `reserve_taken`
    pub fn append_fill(&mut self, fill: Fill, reserve_taken: Decimal) -> Result<()> {
        let order = self
            .orders
            .get_mut(&fill.order_id)
            .filter(|o| o.is_open())
            .ok_or(KernexError::OrderNotOpen(fill.order_id))?;
        if order.reserved < reserve_taken {
            return Err(KernexError::InsufficientReserve {
                needed: reserve_taken,
                reserved: order.reserved,
            });
        }
        order.filled_quantity += fill.quantity;
        order.reserved -= reserve_taken;

        self.fills_by_order
            .entry(fill.order_id)
            .or_default()
            .push(self.fills.len());
        self.fills.push(fill);
        Ok(())
    }

    /// Take `amount` out of an order's reservation without a fill
    /// (cancellation refund).
    ///
    /// # Errors
    /// Same as [`Self::append_fill`].
    pub fn release_reserve(&mut self, id: OrderId, amount: Decimal) -> Result<()> {
        let order = self
            .orders
            .get_mut(&id)
            .filter(|o| o.is_open())
            .ok_or(KernexError::OrderNotOpen(id))?;
        if order.reserved < amount {
            return Err(KernexError::InsufficientReserve {
                needed: amount,
                reserved: order.reserved,
            });
        }
        order.reserved -= amount;
        Ok(())
    }

    /// All open orders, newest first.
    #[must_use]
    pub fn list_open(&self) -> Vec<&Order> {
        let mut open: Vec<&Order> = self.orders.values().filter(|o| o.is_open()).collect();
        open.sort_by(|a, b| newest_first(a, b));
        open
    }

    /// Orders placed by `seller`, newest first.
    #[must_use]
    pub fn orders_by_seller(&self, seller: AccountId) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.seller == seller)
            .collect();
        orders.sort_by(|a, b| newest_first(a, b));
        orders
    }

    /// Fills against one order, oldest first.
    #[must_use]
    pub fn fills_for(&self, order: &OrderId) -> Vec<&Fill> {
        self.fills_by_order
            .get(order)
            .map(|idx| idx.iter().map(|&i| &self.fills[i]).collect())
            .unwrap_or_default()
    }

    /// Fills where `buyer` was the filling party, oldest first.
    #[must_use]
    pub fn fills_by_buyer(&self, buyer: AccountId) -> Vec<&Fill> {
        self.fills.iter().filter(|f| f.buyer == buyer).collect()
    }

    /// Number of open orders placed by `seller`.
    #[must_use]
    pub fn open_count(&self, seller: AccountId) -> usize {
        self.orders
            .values()
            .filter(|o| o.seller == seller && o.is_open())
            .count()
    }

    /// Amounts still held by `seller`'s open orders, per currency.
    #[must_use]
    pub fn reserved_by(&self, seller: AccountId) -> BalanceSheet {
        self.reserved_where(|o| o.seller == seller)
    }

    /// Amounts held by every open order, per currency.
    #[must_use]
    pub fn total_reserved(&self) -> BalanceSheet {
        self.reserved_where(|_| true)
    }

    fn reserved_where(&self, pred: impl Fn(&Order) -> bool) -> BalanceSheet {
        let mut sheet = BalanceSheet::new();
        for order in self.orders.values().filter(|o| o.is_open() && pred(o)) {
            *sheet.get_mut(order.sell_currency) += order.reserved;
        }
        sheet
    }

    /// Number of orders in `status`.
    #[must_use]
    pub fn count_with_status(&self, status: OrderStatus) -> usize {
        self.orders.values().filter(|o| o.status == status).count()
    }

    /// Iterate over every order, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of stored fills.
    #[must_use]
    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }
}
