//! The read/submit façade both ledgers expose to the bridge.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Utxo;

/// Errors surfaced by a [`Ledger`] implementation.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger could not be reached or answered with a transport-level failure.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The request or response was not understood.
    #[error("invalid ledger data: {0}")]
    InvalidData(String),
}

/// Minimal access to a UTxO ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Unspent outputs at `address`, optionally restricted to those holding `asset`.
    async fn fetch_address_utxos(
        &self,
        address: &str,
        asset: Option<&str>,
    ) -> Result<Vec<Utxo>, LedgerError>;

    /// Unspent outputs produced by the transaction `tx_hash`.
    async fn fetch_utxos_by_tx(&self, tx_hash: &str) -> Result<Vec<Utxo>, LedgerError>;

    /// Submits a signed transaction and returns its hash.
    async fn submit_tx(&self, tx: &[u8]) -> Result<String, LedgerError>;

    /// Whether `tx_hash` has been confirmed.
    async fn is_tx_confirmed(&self, tx_hash: &str) -> Result<bool, LedgerError>;
}

/// Keeps the outputs at `address` that hold `asset`, or all of them when `asset` is `None`.
pub fn filter_by_address<'a>(
    utxos: impl IntoIterator<Item = &'a Utxo>,
    address: &str,
    asset: Option<&str>,
) -> Vec<Utxo> {
    utxos
        .into_iter()
        .filter(|utxo| utxo.output.address == address)
        .filter(|utxo| match asset {
            Some(unit) => utxo.output.amount.iter().any(|a| a.unit == unit),
            None => true,
        })
        .cloned()
        .collect()
}
