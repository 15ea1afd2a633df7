//! Errors raised by the Blockfrost client.

use hydra_bridge_primitives::ledger::LedgerError;
use thiserror::Error;

/// Errors returned by [`crate::blockfrost::BlockfrostClient`].
#[derive(Debug, Error)]
pub enum L1ClientError {
    /// The request could not be sent or its response could not be read.
    #[error("blockfrost request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("blockfrost returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Response body, if any.
        body: String,
    },
}

impl From<L1ClientError> for LedgerError {
    fn from(e: L1ClientError) -> Self {
        match e {
            L1ClientError::Http(e) if e.is_decode() => LedgerError::InvalidData(e.to_string()),
            L1ClientError::Status { status: 400, body } => LedgerError::Rejected(body),
            other => LedgerError::Unavailable(other.to_string()),
        }
    }
}
