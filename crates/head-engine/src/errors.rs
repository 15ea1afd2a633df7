use hydra_bridge_primitives::{
    errors::{AddressError, CborError},
    ledger::LedgerError,
};
use hydra_head_client::{errors::HeadClientError, event::HeadStatus};
use thiserror::Error;

/// Errors from a commit endpoint.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The endpoint could not be reached.
    #[error("commit request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with an error status.
    #[error("commit endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Response body.
        body: String,
    },

    /// The returned transaction is not valid hex.
    #[error("commit transaction is not hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Errors raised while starting or using the head engine.
#[derive(Debug, Error)]
pub enum HeadEngineError {
    /// The head node rejected a command or did not answer.
    #[error("head client: {0}")]
    Head(#[from] HeadClientError),

    /// The L1 ledger failed.
    #[error("l1: {0}")]
    Ledger(#[from] LedgerError),

    /// A commit endpoint failed.
    #[error("commit: {0}")]
    Commit(#[from] CommitError),

    /// A commit transaction could not be decoded or signed.
    #[error("commit transaction: {0}")]
    Cbor(#[from] CborError),

    /// The node never reported a head status.
    #[error("no greeting from the head node, status is {0}")]
    NoGreeting(HeadStatus),

    /// The funding address could not be derived.
    #[error("funding address: {0}")]
    Address(#[from] AddressError),
}
