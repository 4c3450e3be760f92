//! Fill records.
//!
//! A [`Fill`] is the immutable record of one execution against an open
//! order. Several fills, by different buyers, may exist per order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Currency, FillId, OrderId};

/// One partial or full execution against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub id: FillId,
    pub order_id: OrderId,
    pub buyer: AccountId,
    /// Filled quantity in base units.
    pub quantity: Decimal,
    /// Currency and amount the buyer handed to the seller.
    pub gave_currency: Currency,
    pub gave_amount: Decimal,
    /// Currency and amount the buyer took out of the order's reservation.
    pub received_currency: Currency,
    pub received_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl std::fmt::Display for Fill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Fill[{}] order {} qty {}: gave {} {}, received {} {}",
            self.id,
            self.order_id,
            self.quantity,
            self.gave_amount,
            self.gave_currency,
            self.received_amount,
            self.received_currency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_both_legs() {
        let fill = Fill {
            id: FillId::new(),
            order_id: OrderId::new(),
            buyer: AccountId::new(),
            quantity: Decimal::new(40, 0),
            gave_currency: Currency::Litecoin,
            gave_amount: Decimal::new(40, 0),
            received_currency: Currency::Kernelcoin,
            received_amount: Decimal::new(40, 0),
            executed_at: Utc::now(),
        };
        let s = fill.to_string();
        assert!(s.contains("gave 40 LTC"));
        assert!(s.contains("received 40 KCN"));
    }
}
