use std::time::Duration;

/// How often the indexer is polled by default.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Kupo pattern matching every output.
pub(crate) const MATCH_ALL: &str = "*";

/// `datum_type` value of outputs carrying an inline datum.
pub(crate) const INLINE_DATUM: &str = "inline";
