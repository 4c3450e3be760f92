//! The two currencies traded on the exchange.
//!
//! The set is closed: every balance record carries exactly one field per
//! variant, and every price is quoted in [`Currency::QUOTE`] per unit of
//! [`Currency::BASE`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::KernexError;

/// Whether a currency is the priced asset or the pricing asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetRole {
    Base,
    Quote,
}

/// A supported currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Kernelcoin,
    Litecoin,
}

impl Currency {
    /// The priced asset. Order fill quantities are expressed in it.
    pub const BASE: Self = Self::Kernelcoin;
    /// The asset prices are expressed in.
    pub const QUOTE: Self = Self::Litecoin;
    /// Every supported currency, base first.
    pub const ALL: [Self; 2] = [Self::BASE, Self::QUOTE];

    #[must_use]
    pub fn role(self) -> AssetRole {
        match self {
            Self::Kernelcoin => AssetRole::Base,
            Self::Litecoin => AssetRole::Quote,
        }
    }

    #[must_use]
    pub fn is_base(self) -> bool {
        self.role() == AssetRole::Base
    }

    /// The other currency of the pair.
    #[must_use]
    pub fn counterpart(self) -> Self {
        match self {
            Self::Kernelcoin => Self::Litecoin,
            Self::Litecoin => Self::Kernelcoin,
        }
    }

    /// Ticker symbol (e.g. "KCN").
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Kernelcoin => "KCN",
            Self::Litecoin => "LTC",
        }
    }

    /// Lowercase wire name, matching the serde representation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Kernelcoin => "kernelcoin",
            Self::Litecoin => "litecoin",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Currency {
    type Err = KernexError;

    /// Accepts the wire name or the ticker, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kernelcoin" | "kcn" => Ok(Self::Kernelcoin),
            "litecoin" | "ltc" => Ok(Self::Litecoin),
            _ => Err(KernexError::UnknownCurrency(s.to_string())),
        }
    }
}
