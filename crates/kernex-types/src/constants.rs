//! System-wide constants for the Kernex exchange ledger.

/// Maximum decimal places for any amount (balances, order legs, fills).
pub const AMOUNT_PRECISION: u32 = 8;

/// Upper bound, in whole units, on any single amount and on the total
/// supply of each currency. Keeps every balance, reserve and total exactly
/// representable at [`AMOUNT_PRECISION`] places.
pub const MAX_SUPPLY: i64 = 1_000_000_000_000;

/// Maximum open orders per seller (admission control on reservations).
pub const DEFAULT_MAX_OPEN_ORDERS: usize = 10;

/// Smallest withdrawal, expressed as `mantissa × 10^-scale` (0.001).
pub const DEFAULT_MIN_WITHDRAWAL_MANTISSA: i64 = 1;
pub const DEFAULT_MIN_WITHDRAWAL_SCALE: u32 = 3;

/// Default page size for transaction history.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Deposit references remembered by the idempotency guard.
pub const DEFAULT_DEPOSIT_GUARD_CAPACITY: usize = 100_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Kernex";
