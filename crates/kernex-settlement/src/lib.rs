//! # kernex-settlement
//!
//! **Settlement plane**: the single writer of exchange state.
//!
//! ## Architecture
//!
//! The [`SettlementEngine`] receives requests (create, fill, cancel,
//! deposit, withdraw) and for each one:
//! 1. Validates it against current balances and order state
//! 2. Expresses its effect as one `WriteBatch`
//! 3. Commits the batch to the `ExchangeStore` (all-or-nothing)
//! 4. Keeps the supply conservation invariant checked
//!
//! Withdrawals leave the process through a [`FundsTransferPort`], called
//! without holding the engine lock. Deposits are deduplicated by external
//! reference through the [`DepositGuard`].

pub mod engine;
pub mod funds;
pub mod idempotency;
pub mod supply_conservation;
pub mod telemetry;
pub mod views;

pub use engine::SettlementEngine;
pub use funds::{FundsTransferPort, OfflineTransferPort, TransferError};
pub use idempotency::DepositGuard;
pub use supply_conservation::SupplyConservation;
pub use views::{
    AccountOrderEntry, AccountSummary, CancelResult, CounterTrade, EscrowTotals, FillResult,
    PriceStats,
};
