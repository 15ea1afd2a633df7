//! Error types for the bridge engine.

use hydra_bridge_db::errors::DbError;
use hydra_bridge_primitives::{
    errors::{AddressError, CborError},
    ledger::LedgerError,
};
use thiserror::Error;

/// Errors from the remote transaction builder.
#[derive(Debug, Error)]
pub enum TxBuilderError {
    /// The request failed or the response could not be parsed.
    #[error("builder request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The builder answered with a non-success status.
    #[error("builder returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Response body, if any.
        body: String,
    },

    /// The returned transaction is not hex.
    #[error("builder returned invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Errors that fail a single bridge operation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Reading or updating the operation record failed.
    #[error("database: {0}")]
    Db(#[from] DbError),

    /// A ledger could not be read or refused a transaction.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// The transaction could not be built.
    #[error("tx builder: {0}")]
    Builder(#[from] TxBuilderError),

    /// A transaction could not be decoded or signed.
    #[error("cbor: {0}")]
    Cbor(#[from] CborError),

    /// An address could not be derived.
    #[error("address: {0}")]
    Address(#[from] AddressError),

    /// The operation carries no lovelace to bridge.
    #[error("operation {0} has no lovelace amount")]
    NoAmount(i64),

    /// The head wallet has no pure-lovelace output to use as collateral.
    #[error("no collateral available at {0}")]
    NoCollateral(String),

    /// The treasury cannot cover the release.
    #[error("insufficient funds: need {needed} lovelace, have {available}")]
    InsufficientFunds {
        /// Lovelace required.
        needed: u64,

        /// Lovelace available.
        available: u64,
    },

    /// The released amount would not cover the bridge fee.
    #[error("amount {amount} does not cover the bridge fee {fee}")]
    BelowFee {
        /// Lovelace requested.
        amount: u64,

        /// Fee to withhold.
        fee: u64,
    },

    /// The destination transaction did not confirm in time.
    #[error("transaction {0} was not confirmed in time")]
    ConfirmationTimeout(String),
}
