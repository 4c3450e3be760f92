//! Configuration for a Kernex exchange instance.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{KernexError, Result, constants};

/// Settings for one settlement engine.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Maximum open orders per seller.
    pub max_open_orders: usize,
    /// Smallest accepted withdrawal, in the withdrawn currency.
    pub min_withdrawal: Decimal,
    /// Whether a seller may fill their own order.
    pub allow_self_fill: bool,
    /// Default number of rows returned by transaction history.
    pub history_limit: usize,
    /// How many deposit references the idempotency guard keeps in memory.
    pub deposit_guard_capacity: usize,
    /// Write-ahead log location. `None` keeps state in memory only.
    pub wal_path: Option<PathBuf>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            max_open_orders: constants::DEFAULT_MAX_OPEN_ORDERS,
            min_withdrawal: Decimal::new(
                constants::DEFAULT_MIN_WITHDRAWAL_MANTISSA,
                constants::DEFAULT_MIN_WITHDRAWAL_SCALE,
            ),
            allow_self_fill: false,
            history_limit: constants::DEFAULT_HISTORY_LIMIT,
            deposit_guard_capacity: constants::DEFAULT_DEPOSIT_GUARD_CAPACITY,
            wal_path: None,
        }
    }
}

impl ExchangeConfig {
    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| KernexError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Same config, persisted to the given write-ahead log.
    #[must_use]
    pub fn with_wal(mut self, path: impl Into<PathBuf>) -> Self {
        self.wal_path = Some(path.into());
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_open_orders == 0 {
            return Err(KernexError::Configuration(
                "max_open_orders must be at least 1".into(),
            ));
        }
        if self.min_withdrawal <= Decimal::ZERO {
            return Err(KernexError::Configuration(
                "min_withdrawal must be positive".into(),
            ));
        }
        if self.min_withdrawal.scale() > constants::AMOUNT_PRECISION {
            return Err(KernexError::Configuration(format!(
                "min_withdrawal has more than {} decimal places",
                constants::AMOUNT_PRECISION
            )));
        }
        if self.history_limit == 0 || self.deposit_guard_capacity == 0 {
            return Err(KernexError::Configuration(
                "history_limit and deposit_guard_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ExchangeConfig::default();
        assert_eq!(cfg.max_open_orders, 10);
        assert_eq!(cfg.min_withdrawal, Decimal::new(1, 3));
        assert!(!cfg.allow_self_fill);
        assert_eq!(cfg.history_limit, 50);
        assert!(cfg.wal_path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ExchangeConfig::from_json_str(r#"{ "max_open_orders": 3 }"#).unwrap();
        assert_eq!(cfg.max_open_orders, 3);
        assert_eq!(cfg.history_limit, 50);
    }

    #[test]
    fn invalid_values_rejected() {
        let err = ExchangeConfig::from_json_str(r#"{ "max_open_orders": 0 }"#).unwrap_err();
        assert!(matches!(err, KernexError::Configuration(_)));

        let err = ExchangeConfig::from_json_str(r#"{ "min_withdrawal": "-1" }"#).unwrap_err();
        assert!(matches!(err, KernexError::Configuration(_)));
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = ExchangeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, KernexError::Configuration(_)));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ExchangeConfig::default().with_wal("/tmp/kernex.wal");
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ExchangeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
