//! Outbound funds transfer port.
//!
//! The engine never talks to a coin daemon itself. A withdrawal debits the
//! account, releases the engine lock, and hands the transfer to a
//! [`FundsTransferPort`]. Whatever the port returns is applied in a second
//! critical section.

use kernex_types::{AccountId, Currency, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Longest destination address accepted by [`OfflineTransferPort`].
pub const MAX_ADDRESS_LEN: usize = 64;

/// Why a transfer did not go out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The collaborator refused the request (bad address, policy).
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The collaborator could not be reached or failed mid-request.
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
}

/// Sends funds to an external address and returns the collaborator's
/// reference (usually a transaction hash).
///
/// Implementations may block on network I/O; the engine calls them with
/// no lock held.
pub trait FundsTransferPort: Send + Sync {
    fn send(
        &self,
        account: AccountId,
        currency: Currency,
        amount: Decimal,
        destination: &str,
    ) -> Result<String, TransferError>;
}

/// Transfer port for nodes running without wallets: validates the
/// address and confirms immediately with a locally generated reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransferPort;

impl FundsTransferPort for OfflineTransferPort {
    fn send(
        &self,
        account: AccountId,
        currency: Currency,
        amount: Decimal,
        destination: &str,
    ) -> Result<String, TransferError> {
        if destination.is_empty() {
            return Err(TransferError::Rejected("no withdrawal address set".into()));
        }
        if destination.len() > MAX_ADDRESS_LEN
            || !destination.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(TransferError::Rejected(format!(
                "address must be alphanumeric and at most {MAX_ADDRESS_LEN} characters"
            )));
        }
        let reference = format!("offline-{}", TransactionId::new());
        tracing::info!(
            %account,
            %currency,
            %amount,
            destination,
            reference = %reference,
            "Offline transfer recorded"
        );
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_port_confirms_valid_address() {
        let reference = OfflineTransferPort
            .send(AccountId::new(), Currency::Litecoin, Decimal::ONE, "Lx9abc")
            .unwrap();
        assert!(reference.starts_with("offline-"));
    }

    #[test]
    fn offline_port_rejects_bad_addresses() {
        let port = OfflineTransferPort;
        let too_long = "a".repeat(MAX_ADDRESS_LEN + 1);
        for bad in ["", "has space", "semi;colon", too_long.as_str()] {
            let err = port
                .send(AccountId::new(), Currency::Kernelcoin, Decimal::ONE, bad)
                .unwrap_err();
            assert!(matches!(err, TransferError::Rejected(_)), "{bad:?}");
        }
    }
}
