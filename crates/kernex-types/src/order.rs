//! Order types for the Kernex exchange ledger.
//!
//! An order is a standing offer: the seller gives up `sell_amount` of
//! `sell_currency` (reserved at creation) and wants `buy_amount` of
//! `buy_currency` in exchange. Orders are filled by explicit reference,
//! never matched against each other.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, Currency, KernexError, OrderId, Result, constants::AMOUNT_PRECISION,
};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Completed and cancelled orders accept no further fills or cancels.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A standing sell order with its reservation bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub seller: AccountId,
    pub sell_currency: Currency,
    /// Reserved in full when the order opens. Never changes.
    pub sell_amount: Decimal,
    pub buy_currency: Currency,
    /// Amount of `buy_currency` the seller wants in total. Never changes.
    pub buy_amount: Decimal,
    /// Quote units per base unit, fixed at creation.
    pub price_per_unit: Decimal,
    pub status: OrderStatus,
    /// Cumulative filled quantity, in base units.
    pub filled_quantity: Decimal,
    /// Part of `sell_amount` still held by this order.
    pub reserved: Decimal,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Price of a prospective order: quote leg divided by base leg.
    ///
    /// Returns `None` when the currencies are equal or the base leg is zero.
    #[must_use]
    pub fn price_for(
        sell_currency: Currency,
        sell_amount: Decimal,
        buy_currency: Currency,
        buy_amount: Decimal,
    ) -> Option<Decimal> {
        if sell_currency == buy_currency {
            return None;
        }
        let (base, quote) = if sell_currency.is_base() {
            (sell_amount, buy_amount)
        } else {
            (buy_amount, sell_amount)
        };
        quote.checked_div(base)
    }

    /// Build a freshly opened order with its whole `sell_amount` reserved.
    ///
    /// # Errors
    /// Returns `InvalidOrder` if the currencies are equal or either amount
    /// is not positive.
    pub fn new_open(
        seller: AccountId,
        sell_currency: Currency,
        sell_amount: Decimal,
        buy_currency: Currency,
        buy_amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if sell_amount <= Decimal::ZERO || buy_amount <= Decimal::ZERO {
            return Err(KernexError::InvalidOrder {
                reason: "Order amounts must be positive".to_string(),
            });
        }
        let price_per_unit = Self::price_for(sell_currency, sell_amount, buy_currency, buy_amount)
            .ok_or_else(|| KernexError::InvalidOrder {
                reason: format!("Cannot exchange {sell_currency} for itself"),
            })?;

        Ok(Self {
            id: OrderId::new(),
            seller,
            sell_currency,
            sell_amount,
            buy_currency,
            buy_amount,
            price_per_unit,
            status: OrderStatus::Open,
            filled_quantity: Decimal::ZERO,
            reserved: sell_amount,
            created_at,
            cancelled_at: None,
        })
    }

    /// The base-currency amount of this order. Fill quantities count against it.
    #[must_use]
    pub fn base_leg(&self) -> Decimal {
        if self.sell_currency.is_base() {
            self.sell_amount
        } else {
            self.buy_amount
        }
    }

    /// The quote-currency amount of this order.
    #[must_use]
    pub fn quote_leg(&self) -> Decimal {
        if self.sell_currency.is_base() {
            self.buy_amount
        } else {
            self.sell_amount
        }
    }

    /// Unfilled base quantity.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.base_leg() - self.filled_quantity
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Currency a filler hands over (what the seller asked for).
    #[must_use]
    pub fn buyer_gives(&self) -> Currency {
        self.buy_currency
    }

    /// Currency a filler takes out of the reservation.
    #[must_use]
    pub fn buyer_receives(&self) -> Currency {
        self.sell_currency
    }

    /// Quote amount worth `quantity` base units, rounded to
    /// [`AMOUNT_PRECISION`] places with `strategy`.
    ///
    /// Computed from the legs rather than the stored price, so the full
    /// base leg is worth exactly the quote leg. `None` on overflow.
    #[must_use]
    pub fn quote_value(&self, quantity: Decimal, strategy: RoundingStrategy) -> Option<Decimal> {
        quantity
            .checked_mul(self.quote_leg())?
            .checked_div(self.base_leg())
            .map(|v| v.round_dp_with_strategy(AMOUNT_PRECISION, strategy))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// An open order selling `sell_amount` of `sell_currency` for
    /// `buy_amount` of the other currency.
    pub fn dummy_open(
        seller: AccountId,
        sell_currency: Currency,
        sell_amount: Decimal,
        buy_amount: Decimal,
    ) -> Self {
        Self::new_open(
            seller,
            sell_currency,
            sell_amount,
            sell_currency.counterpart(),
            buy_amount,
            Utc::now(),
        )
        .expect("dummy order amounts must be positive")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_is_quote_per_base_when_selling_base() {
        // Sell 100 KCN for 50 LTC: 0.5 LTC per KCN.
        let price = Order::price_for(
            Currency::Kernelcoin,
            Decimal::new(100, 0),
            Currency::Litecoin,
            Decimal::new(50, 0),
        );
        assert_eq!(price, Some(Decimal::new(5, 1)));
    }

    #[test]
    fn price_is_quote_per_base_when_selling_quote() {
        // Sell 50 LTC for 100 KCN: still 0.5 LTC per KCN.
        let price = Order::price_for(
            Currency::Litecoin,
            Decimal::new(50, 0),
            Currency::Kernelcoin,
            Decimal::new(100, 0),
        );
        assert_eq!(price, Some(Decimal::new(5, 1)));
    }

    #[test]
    fn same_currency_has_no_price() {
        let err = Order::new_open(
            AccountId::new(),
            Currency::Litecoin,
            Decimal::ONE,
            Currency::Litecoin,
            Decimal::ONE,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, KernexError::InvalidOrder { .. }));
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let err = Order::new_open(
            AccountId::new(),
            Currency::Kernelcoin,
            Decimal::ZERO,
            Currency::Litecoin,
            Decimal::ONE,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, KernexError::InvalidOrder { .. }));
    }

    #[test]
    fn legs_follow_currency_roles() {
        let sell_base = Order::dummy_open(
            AccountId::new(),
            Currency::Kernelcoin,
            Decimal::new(100, 0),
            Decimal::new(30, 0),
        );
        assert_eq!(sell_base.base_leg(), Decimal::new(100, 0));
        assert_eq!(sell_base.quote_leg(), Decimal::new(30, 0));

        let sell_quote = Order::dummy_open(
            AccountId::new(),
            Currency::Litecoin,
            Decimal::new(30, 0),
            Decimal::new(100, 0),
        );
        assert_eq!(sell_quote.base_leg(), Decimal::new(100, 0));
        assert_eq!(sell_quote.quote_leg(), Decimal::new(30, 0));
        assert_eq!(sell_quote.buyer_gives(), Currency::Kernelcoin);
        assert_eq!(sell_quote.buyer_receives(), Currency::Litecoin);
    }

    #[test]
    fn new_order_reserves_everything() {
        let order = Order::dummy_open(
            AccountId::new(),
            Currency::Kernelcoin,
            Decimal::new(100, 0),
            Decimal::new(100, 0),
        );
        assert!(order.is_open());
        assert_eq!(order.reserved, order.sell_amount);
        assert_eq!(order.remaining(), Decimal::new(100, 0));
        assert_eq!(order.cancelled_at, None);
    }

    #[test]
    fn quote_value_rounds_to_precision() {
        // 10 LTC for 3 KCN: one KCN is worth 3.33333333 LTC.
        let order = Order::dummy_open(
            AccountId::new(),
            Currency::Kernelcoin,
            Decimal::new(3, 0),
            Decimal::new(10, 0),
        );
        let down = RoundingStrategy::ToZero;
        let up = RoundingStrategy::AwayFromZero;
        assert_eq!(order.quote_value(Decimal::ONE, down), Some(Decimal::new(333_333_333, 8)));
        assert_eq!(order.quote_value(Decimal::ONE, up), Some(Decimal::new(333_333_334, 8)));
        assert_eq!(order.quote_value(Decimal::new(3, 0), up), Some(Decimal::new(10, 0)));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::Open.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }
}
