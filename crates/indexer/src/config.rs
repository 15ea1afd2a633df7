//! Configuration for the indexer poller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_POLL_INTERVAL, MATCH_ALL};

/// Where the indexer lives, what to ask it for and how often.
///
/// Construct it with [`IndexerConfig::new`] and adjust it with the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Base URL of the indexer's HTTP API.
    pub(crate) url: String,

    /// Kupo match pattern, usually the bridge deposit address. Defaults to every output.
    pub(crate) pattern: String,

    /// Delay between two polls, defaults to [`DEFAULT_POLL_INTERVAL`].
    pub(crate) poll_interval: Duration,
}

impl IndexerConfig {
    /// Creates a config for the indexer at `url` (e.g. `http://127.0.0.1:1442`).
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            pattern: MATCH_ALL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Restricts the matches to `pattern`.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    /// Updates the poll interval.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The indexer's base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configured match pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The configured poll interval.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
