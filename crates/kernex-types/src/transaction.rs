//! Ledger transactions: the audit journal of balance movements.
//!
//! Every change to an account's available balance is journalled as a
//! [`LedgerTransaction`] with a signed amount. Rows are append-only; the
//! single permitted update is resolving a pending withdrawal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Currency, OrderId, TransactionId};

/// What caused a balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Confirmed funds arriving from a wallet.
    Deposit,
    /// Funds leaving for an external address.
    Withdrawal,
    /// Seller funds moved into an order's reservation.
    OrderReserve,
    /// Reservation handed back to the seller on cancel.
    OrderRelease,
    /// A party paying out during a fill.
    FillDebit,
    /// A party receiving during a fill.
    FillCredit,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::OrderReserve => write!(f, "ORDER_RESERVE"),
            Self::OrderRelease => write!(f, "ORDER_RELEASE"),
            Self::FillDebit => write!(f, "FILL_DEBIT"),
            Self::FillCredit => write!(f, "FILL_CREDIT"),
        }
    }
}

/// Settlement status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One journal row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub account: AccountId,
    pub currency: Currency,
    /// Positive for credits, negative for debits.
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    /// Wallet transaction hash or other collaborator reference.
    pub external_ref: Option<String>,
    pub related_order: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// A confirmed row with no references attached.
    #[must_use]
    pub fn confirmed(
        account: AccountId,
        currency: Currency,
        amount: Decimal,
        kind: TransactionKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account,
            currency,
            amount,
            kind,
            status: TransactionStatus::Confirmed,
            external_ref: None,
            related_order: None,
            created_at,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.related_order = Some(order_id);
        self
    }

    #[must_use]
    pub fn with_external_ref(mut self, reference: Option<String>) -> Self {
        self.external_ref = reference;
        self
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }
}
