//! # kernex-types
//!
//! Shared types, errors, and configuration for the **Kernex** exchange ledger.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`OrderId`], [`FillId`], [`TransactionId`]
//! - **Currencies**: [`Currency`], [`AssetRole`]
//! - **Balance model**: [`BalanceSheet`]
//! - **Order model**: [`Order`], [`OrderStatus`]
//! - **Fill model**: [`Fill`]
//! - **Audit model**: [`LedgerTransaction`], [`TransactionKind`], [`TransactionStatus`]
//! - **Configuration**: [`ExchangeConfig`]
//! - **Errors**: [`KernexError`] with `KX_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod currency;
pub mod error;
pub mod fill;
pub mod ids;
pub mod order;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use kernex_types::{Order, OrderStatus, Currency, Fill, ...};

pub use balance::*;
pub use config::*;
pub use currency::*;
pub use error::*;
pub use fill::*;
pub use ids::*;
pub use order::*;
pub use transaction::*;

// Constants are accessed via `kernex_types::constants::FOO`
// (not re-exported to avoid name collisions).
