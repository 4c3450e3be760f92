//! # kernex-store
//!
//! **State plane**: the four logical relations of the exchange and the
//! single commit point that keeps them consistent.
//!
//! ## Layout
//!
//! - [`LedgerStore`]: available balances per (account, currency)
//! - [`OrderBookTable`]: orders, reservations and the fill log
//! - [`Journal`]: append-only ledger transactions
//! - [`WriteBatch`]: one operation's mutations, applied all-or-nothing
//! - [`WriteAheadLog`]: newline-delimited JSON record of committed batches
//! - [`ExchangeStore`]: owns all of the above; `commit` validates, logs,
//!   then applies
//!
//! The store enforces structure (no negative balance, no unknown id, no
//! transition out of a terminal status). Business rules live in
//! `kernex-settlement`.

pub mod batch;
pub mod journal;
pub mod ledger_store;
pub mod order_book;
pub mod store;
pub mod wal;

pub use batch::{Mutation, WriteBatch};
pub use journal::Journal;
pub use ledger_store::{LedgerStore, NetDeltas};
pub use order_book::OrderBookTable;
pub use store::ExchangeStore;
pub use wal::{LogFile, WalRecord, WriteAheadLog};
