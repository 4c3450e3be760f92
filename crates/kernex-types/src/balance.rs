//! Balance records.
//!
//! A [`BalanceSheet`] holds one amount per [`Currency`]. The mapping from
//! currency to field is the `match` in [`BalanceSheet::get`] and
//! [`BalanceSheet::get_mut`]; nothing else chooses a field.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Currency;

/// One amount per supported currency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BalanceSheet {
    pub kernelcoin: Decimal,
    pub litecoin: Decimal,
}

impl BalanceSheet {
    /// Create a zero sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Kernelcoin => self.kernelcoin,
            Currency::Litecoin => self.litecoin,
        }
    }

    pub fn get_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::Kernelcoin => &mut self.kernelcoin,
            Currency::Litecoin => &mut self.litecoin,
        }
    }

    /// Builder-style setter, mostly for tests and seeding.
    #[must_use]
    pub fn with(mut self, currency: Currency, amount: Decimal) -> Self {
        *self.get_mut(currency) = amount;
        self
    }

    /// Whether every amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.kernelcoin.is_zero() && self.litecoin.is_zero()
    }

    /// Whether any amount is below zero.
    #[must_use]
    pub fn has_negative(&self) -> bool {
        self.kernelcoin < Decimal::ZERO || self.litecoin < Decimal::ZERO
    }
}

impl std::ops::Add for BalanceSheet {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            kernelcoin: self.kernelcoin + rhs.kernelcoin,
            litecoin: self.litecoin + rhs.litecoin,
        }
    }
}

impl std::ops::AddAssign for BalanceSheet {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for BalanceSheet {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), |acc, s| acc + s)
    }
}
