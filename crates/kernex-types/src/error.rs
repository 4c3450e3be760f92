//! Error types for the Kernex exchange ledger.
//!
//! All errors use the `KX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance and account errors
//! - 3xx: Deposit / withdrawal errors
//! - 6xx: Settlement invariant errors
//! - 9xx: Store / general / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AccountId, OrderId, TransactionId};

/// Central error enum for all Kernex operations.
#[derive(Debug, Error)]
pub enum KernexError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The order is missing, completed or cancelled.
    #[error("KX_ERR_100: Order is not open: {0}")]
    OrderNotOpen(OrderId),

    /// The order request is malformed.
    #[error("KX_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The seller already has the maximum number of open orders.
    #[error("KX_ERR_102: Maximum of {limit} open orders allowed per account")]
    TooManyOpenOrders { limit: usize },

    /// Only the seller may cancel an order.
    #[error("KX_ERR_103: Cannot cancel order {0} you don't own")]
    NotOwner(OrderId),

    /// A fill asked for more than the order has left.
    #[error("KX_ERR_104: Fill quantity {requested} exceeds remaining {remaining}")]
    FillExceedsRemaining {
        requested: Decimal,
        remaining: Decimal,
    },

    /// The buyer is the order's own seller.
    #[error("KX_ERR_105: Self-fill blocked: buyer is the seller")]
    SelfFillBlocked,

    /// The currency name is not one of the supported pair.
    #[error("KX_ERR_106: Unknown currency: {0}")]
    UnknownCurrency(String),

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("KX_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// The order's reservation cannot cover the requested payout.
    #[error("KX_ERR_201: Insufficient reserve: need {needed}, reserved {reserved}")]
    InsufficientReserve { needed: Decimal, reserved: Decimal },

    /// An amount is zero, negative, or too precise.
    #[error("KX_ERR_202: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// No account with this id.
    #[error("KX_ERR_203: Account not found: {0}")]
    AccountNotFound(AccountId),

    // =================================================================
    // Deposit / Withdrawal Errors (3xx)
    // =================================================================
    /// A deposit with this external reference was already credited.
    #[error("KX_ERR_300: Deposit already credited: {0}")]
    DuplicateDeposit(String),

    /// The withdrawal is below the configured minimum.
    #[error("KX_ERR_301: The smallest amount allowed to withdraw is {minimum}")]
    BelowMinimumWithdrawal { minimum: Decimal },

    /// The wallet collaborator could not send the funds.
    #[error("KX_ERR_302: Funds transfer failed: {reason}")]
    FundsTransferFailed { reason: String },

    /// No journal row with this id.
    #[error("KX_ERR_303: Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // =================================================================
    // Settlement Invariant Errors (6xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("KX_ERR_600: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Store / General / Internal (9xx)
    // =================================================================
    /// The store rejected a write batch or failed to persist it.
    #[error("KX_ERR_900: Store failure: {0}")]
    Store(String),

    /// Serialization / deserialization error.
    #[error("KX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("KX_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk).
    #[error("KX_ERR_903: I/O error: {0}")]
    Io(String),
}

impl KernexError {
    /// Stable machine-readable identifier, e.g. `"KX_ERR_200"`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::OrderNotOpen(_) => "KX_ERR_100",
            Self::InvalidOrder { .. } => "KX_ERR_101",
            Self::TooManyOpenOrders { .. } => "KX_ERR_102",
            Self::NotOwner(_) => "KX_ERR_103",
            Self::FillExceedsRemaining { .. } => "KX_ERR_104",
            Self::SelfFillBlocked => "KX_ERR_105",
            Self::UnknownCurrency(_) => "KX_ERR_106",
            Self::InsufficientBalance { .. } => "KX_ERR_200",
            Self::InsufficientReserve { .. } => "KX_ERR_201",
            Self::InvalidAmount { .. } => "KX_ERR_202",
            Self::AccountNotFound(_) => "KX_ERR_203",
            Self::DuplicateDeposit(_) => "KX_ERR_300",
            Self::BelowMinimumWithdrawal { .. } => "KX_ERR_301",
            Self::FundsTransferFailed { .. } => "KX_ERR_302",
            Self::TransactionNotFound(_) => "KX_ERR_303",
            Self::SupplyInvariantViolation { .. } => "KX_ERR_600",
            Self::Store(_) => "KX_ERR_900",
            Self::Serialization(_) => "KX_ERR_901",
            Self::Configuration(_) => "KX_ERR_902",
            Self::Io(_) => "KX_ERR_903",
        }
    }

    /// Whether the request was rejected by validation (as opposed to an
    /// infrastructure failure).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            Self::SupplyInvariantViolation { .. }
                | Self::Store(_)
                | Self::Serialization(_)
                | Self::Configuration(_)
                | Self::Io(_)
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, KernexError>;

// Conversion from std::io::Error
impl From<std::io::Error> for KernexError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for KernexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
