//! Ledger store: per-account balances.
//!
//! Holds one [`BalanceSheet`] per account. It owns no business rules; it
//! only guarantees that a set of adjustments is checked as a whole before
//! any of it is applied, and that no checked set drives a balance negative.

use std::collections::HashMap;

use kernex_types::{AccountId, BalanceSheet, Currency, KernexError, Result};
use rust_decimal::Decimal;

/// Net change per (account, currency), as produced by a write batch.
pub type NetDeltas = HashMap<(AccountId, Currency), Decimal>;

/// Source of truth for available balances.
#[derive(Debug, Default)]
pub struct LedgerStore {
    accounts: HashMap<AccountId, BalanceSheet>,
}

impl LedgerStore {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Register an account with zero balances.
    ///
    /// # Errors
    /// Returns `Store` if the account already exists.
    pub fn open(&mut self, account: AccountId) -> Result<()> {
        if self.accounts.contains_key(&account) {
            return Err(KernexError::Store(format!("account {account} already exists")));
        }
        self.accounts.insert(account, BalanceSheet::new());
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, account: &AccountId) -> bool {
        self.accounts.contains_key(account)
    }

    /// Available balance of one currency.
    ///
    /// # Errors
    /// Returns `AccountNotFound` for unknown accounts.
    pub fn balance(&self, account: AccountId, currency: Currency) -> Result<Decimal> {
        self.sheet(account).map(|sheet| sheet.get(currency))
    }

    /// Both balances of an account.
    ///
    /// # Errors
    /// Returns `AccountNotFound` for unknown accounts.
    pub fn sheet(&self, account: AccountId) -> Result<BalanceSheet> {
        self.accounts
            .get(&account)
            .copied()
            .ok_or(KernexError::AccountNotFound(account))
    }

    /// Verify that applying `deltas` keeps every balance non-negative.
    ///
    /// `pending_opens` are accounts created earlier in the same batch; they
    /// start from zero.
    ///
    /// # Errors
    /// - `AccountNotFound` if an adjusted account neither exists nor is pending
    /// - `InsufficientBalance` if any resulting balance would be negative
    /// - `InvalidAmount` if a resulting balance is not representable
    pub fn check(&self, deltas: &NetDeltas, pending_opens: &[AccountId]) -> Result<()> {
        for (&(account, currency), &delta) in deltas {
            let current = match self.accounts.get(&account) {
                Some(sheet) => sheet.get(currency),
                None if pending_opens.contains(&account) => Decimal::ZERO,
                None => return Err(KernexError::AccountNotFound(account)),
            };
            let next = current
                .checked_add(delta)
                .ok_or_else(|| KernexError::InvalidAmount {
                    reason: format!("{currency} balance of {account} overflows"),
                })?;
            if next < Decimal::ZERO {
                return Err(KernexError::InsufficientBalance {
                    needed: -delta,
                    available: current,
                });
            }
        }
        Ok(())
    }

    /// Apply `balance += delta` to a single balance, refusing overdrafts.
    ///
    /// # Errors
    /// Same as [`Self::check`]; the balance is unchanged on error.
    pub fn adjust(&mut self, account: AccountId, currency: Currency, delta: Decimal) -> Result<()> {
        let mut deltas = NetDeltas::new();
        deltas.insert((account, currency), delta);
        self.check(&deltas, &[])?;
        self.apply(account, currency, delta);
        Ok(())
    }

    /// Apply one adjustment. Only called for batches that passed [`Self::check`].
    pub(crate) fn apply(&mut self, account: AccountId, currency: Currency, delta: Decimal) {
        if let Some(sheet) = self.accounts.get_mut(&account) {
            *sheet.get_mut(currency) += delta;
        }
    }

    /// Sum of available balances over all accounts.
    #[must_use]
    pub fn totals(&self) -> BalanceSheet {
        self.accounts.values().copied().sum()
    }

    /// Iterate over every (account, balances) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &BalanceSheet)> {
        self.accounts.iter()
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(amount: i64) -> (LedgerStore, AccountId) {
        let mut ledger = LedgerStore::new();
        let account = AccountId::new();
        ledger.open(account).unwrap();
        ledger.apply(account, Currency::Litecoin, Decimal::new(amount, 0));
        (ledger, account)
    }

    #[test]
    fn open_starts_at_zero() {
        let mut ledger = LedgerStore::new();
        let account = AccountId::new();
        ledger.open(account).unwrap();
        assert!(ledger.sheet(account).unwrap().is_zero());
    }

    #[test]
    fn double_open_fails() {
        let mut ledger = LedgerStore::new();
        let account = AccountId::new();
        ledger.open(account).unwrap();
        assert!(matches!(ledger.open(account), Err(KernexError::Store(_))));
    }

    #[test]
    fn unknown_account_is_not_found() {
        let ledger = LedgerStore::new();
        let err = ledger.balance(AccountId::new(), Currency::Litecoin).unwrap_err();
        assert!(matches!(err, KernexError::AccountNotFound(_)));
    }

    #[test]
    fn check_rejects_overdraft() {
        let (ledger, account) = funded(100);
        let mut deltas = NetDeltas::new();
        deltas.insert((account, Currency::Litecoin), Decimal::new(-101, 0));
        let err = ledger.check(&deltas, &[]).unwrap_err();
        assert!(matches!(err, KernexError::InsufficientBalance { .. }));
    }

    #[test]
    fn check_allows_exact_drain() {
        let (ledger, account) = funded(100);
        let mut deltas = NetDeltas::new();
        deltas.insert((account, Currency::Litecoin), Decimal::new(-100, 0));
        assert!(ledger.check(&deltas, &[]).is_ok());
    }

    #[test]
    fn check_counts_pending_opens_as_zero() {
        let ledger = LedgerStore::new();
        let account = AccountId::new();
        let mut deltas = NetDeltas::new();
        deltas.insert((account, Currency::Kernelcoin), Decimal::new(5, 0));
        assert!(ledger.check(&deltas, &[account]).is_ok());
        assert!(matches!(
            ledger.check(&deltas, &[]),
            Err(KernexError::AccountNotFound(_))
        ));
    }

    #[test]
    fn adjust_refuses_negative_result() {
        let (mut ledger, account) = funded(10);
        let err = ledger
            .adjust(account, Currency::Litecoin, Decimal::new(-11, 0))
            .unwrap_err();
        assert!(matches!(err, KernexError::InsufficientBalance { .. }));
        assert_eq!(
            ledger.balance(account, Currency::Litecoin).unwrap(),
            Decimal::new(10, 0)
        );
        ledger
            .adjust(account, Currency::Litecoin, Decimal::new(-10, 0))
            .unwrap();
        assert_eq!(ledger.balance(account, Currency::Litecoin).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn check_refuses_overflow() {
        let mut ledger = LedgerStore::new();
        let account = AccountId::new();
        ledger.open(account).unwrap();
        ledger.apply(account, Currency::Litecoin, Decimal::MAX);
        let mut deltas = NetDeltas::new();
        deltas.insert((account, Currency::Litecoin), Decimal::ONE);
        let err = ledger.check(&deltas, &[]).unwrap_err();
        assert!(matches!(err, KernexError::InvalidAmount { .. }));
        assert_eq!(
            ledger.balance(account, Currency::Litecoin).unwrap(),
            Decimal::MAX
        );
    }

    #[test]
    fn totals_sum_all_accounts() {
        let (mut ledger, a) = funded(100);
        let b = AccountId::new();
        ledger.open(b).unwrap();
        ledger.apply(b, Currency::Litecoin, Decimal::new(50, 0));
        ledger.apply(a, Currency::Kernelcoin, Decimal::new(7, 0));
        let totals = ledger.totals();
        assert_eq!(totals.litecoin, Decimal::new(150, 0));
        assert_eq!(totals.kernelcoin, Decimal::new(7, 0));
        assert_eq!(ledger.len(), 2);
    }
}
