//! Errors raised while talking to the indexer.

use thiserror::Error;

/// Errors returned by [`crate::kupo::KupoClient`].
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The request failed or the response body could not be parsed.
    #[error("indexer request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The indexer answered with a non-success status.
    #[error("indexer returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Response body, if any.
        body: String,
    },
}
