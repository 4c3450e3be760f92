//! Supply conservation invariant checker.
//!
//! For each currency:
//! ```text
//! Σ available + Σ open reserves == Σ deposits − Σ withdrawals (pending or confirmed)
//! ```
//!
//! Trading, reserving and cancelling only move value between accounts and
//! orders. Only deposits and withdrawals change the expected supply, and a
//! failed withdrawal is reversed.

use kernex_types::{
    BalanceSheet, Currency, KernexError, LedgerTransaction, Result, TransactionKind,
    TransactionStatus,
};
use rust_decimal::Decimal;

/// Running deposit and withdrawal totals per currency.
#[derive(Debug, Default, Clone)]
pub struct SupplyConservation {
    deposits: BalanceSheet,
    withdrawals: BalanceSheet,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the totals from journal rows (used after log replay).
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if the rows overflow a counter.
    pub fn from_journal<'a>(
        rows: impl IntoIterator<Item = &'a LedgerTransaction>,
    ) -> Result<Self> {
        let mut supply = Self::new();
        for tx in rows {
            match (tx.kind, tx.status) {
                (TransactionKind::Deposit, TransactionStatus::Confirmed) => {
                    supply.record_deposit(tx.currency, tx.amount)?;
                }
                (
                    TransactionKind::Withdrawal,
                    TransactionStatus::Pending | TransactionStatus::Confirmed,
                ) => {
                    supply.record_withdrawal(tx.currency, -tx.amount)?;
                }
                _ => {}
            }
        }
        Ok(supply)
    }

    /// # Errors
    /// `SupplyInvariantViolation` if the deposit counter would overflow.
    pub fn record_deposit(&mut self, currency: Currency, amount: Decimal) -> Result<()> {
        bump(&mut self.deposits, currency, amount, "deposits")
    }

    /// # Errors
    /// `SupplyInvariantViolation` if the withdrawal counter would overflow.
    pub fn record_withdrawal(&mut self, currency: Currency, amount: Decimal) -> Result<()> {
        bump(&mut self.withdrawals, currency, amount, "withdrawals")
    }

    /// Undo a withdrawal whose transfer failed.
    pub fn reverse_withdrawal(&mut self, currency: Currency, amount: Decimal) {
        *self.withdrawals.get_mut(currency) -= amount;
    }

    /// Deposits minus withdrawals.
    #[must_use]
    pub fn expected_supply(&self, currency: Currency) -> Decimal {
        self.deposits.get(currency) - self.withdrawals.get(currency)
    }

    #[must_use]
    pub fn total_deposits(&self, currency: Currency) -> Decimal {
        self.deposits.get(currency)
    }

    #[must_use]
    pub fn total_withdrawals(&self, currency: Currency) -> Decimal {
        self.withdrawals.get(currency)
    }

    /// Compare the actual supply of one currency with the expected one.
    ///
    /// # Errors
    /// [`KernexError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, currency: Currency, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(currency);
        if actual_supply != expected {
            return Err(KernexError::SupplyInvariantViolation {
                reason: format!(
                    "{currency}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.deposits.get(currency),
                    self.withdrawals.get(currency),
                ),
            });
        }
        Ok(())
    }

    /// [`Self::verify`] for every currency at once.
    ///
    /// # Errors
    /// The first violation found.
    pub fn verify_all(&self, actual: &BalanceSheet) -> Result<()> {
        for currency in Currency::ALL {
            self.verify(currency, actual.get(currency))?;
        }
        Ok(())
    }
}

fn bump(sheet: &mut BalanceSheet, currency: Currency, amount: Decimal, what: &str) -> Result<()> {
    let slot = sheet.get_mut(currency);
    *slot = slot
        .checked_add(amount)
        .ok_or_else(|| KernexError::SupplyInvariantViolation {
            reason: format!("{currency} {what} counter overflows adding {amount}"),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kernex_types::AccountId;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(Currency::Kernelcoin), Decimal::ZERO);
        assert!(sc.verify_all(&BalanceSheet::new()).is_ok());
    }

    #[test]
    fn failed_withdrawal_restores_expected() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(Currency::Litecoin, Decimal::new(1000, 0)).unwrap();
        sc.record_withdrawal(Currency::Litecoin, Decimal::new(300, 0)).unwrap();
        assert_eq!(sc.expected_supply(Currency::Litecoin), Decimal::new(700, 0));
        sc.reverse_withdrawal(Currency::Litecoin, Decimal::new(300, 0));
        assert_eq!(sc.expected_supply(Currency::Litecoin), Decimal::new(1000, 0));
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(Currency::Kernelcoin, Decimal::new(10, 0)).unwrap();
        let err = sc
            .verify(Currency::Kernelcoin, Decimal::new(11, 0))
            .unwrap_err();
        assert!(matches!(err, KernexError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn currencies_are_independent() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(Currency::Kernelcoin, Decimal::new(5, 0)).unwrap();
        sc.record_deposit(Currency::Litecoin, Decimal::new(50, 0)).unwrap();
        let actual = BalanceSheet::new()
            .with(Currency::Kernelcoin, Decimal::new(5, 0))
            .with(Currency::Litecoin, Decimal::new(50, 0));
        assert!(sc.verify_all(&actual).is_ok());
    }

    #[test]
    fn rebuilt_from_journal_ignores_failed_withdrawals() {
        let account = AccountId::new();
        let now = Utc::now();
        let rows = vec![
            LedgerTransaction::confirmed(
                account,
                Currency::Litecoin,
                Decimal::new(100, 0),
                TransactionKind::Deposit,
                now,
            ),
            LedgerTransaction::confirmed(
                account,
                Currency::Litecoin,
                Decimal::new(-10, 0),
                TransactionKind::Withdrawal,
                now,
            ),
            LedgerTransaction::confirmed(
                account,
                Currency::Litecoin,
                Decimal::new(-20, 0),
                TransactionKind::Withdrawal,
                now,
            )
            .with_status(TransactionStatus::Failed),
            LedgerTransaction::confirmed(
                account,
                Currency::Litecoin,
                Decimal::new(-5, 0),
                TransactionKind::Withdrawal,
                now,
            )
            .with_status(TransactionStatus::Pending),
        ];
        let sc = SupplyConservation::from_journal(&rows).unwrap();
        assert_eq!(sc.total_deposits(Currency::Litecoin), Decimal::new(100, 0));
        assert_eq!(sc.total_withdrawals(Currency::Litecoin), Decimal::new(15, 0));
    }

    #[test]
    fn counter_overflow_is_an_error() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(Currency::Litecoin, Decimal::MAX).unwrap();
        let err = sc
            .record_deposit(Currency::Litecoin, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, KernexError::SupplyInvariantViolation { .. }));
        assert_eq!(sc.total_deposits(Currency::Litecoin), Decimal::MAX);
    }
}
