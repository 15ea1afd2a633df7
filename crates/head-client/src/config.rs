use std::time::Duration;

use crate::constants::{DEFAULT_RECONNECT_BACKOFF, DEFAULT_REQUEST_TIMEOUT, WS_QUERY};

/// HeadClientConfig describes how to reach a head node's websocket API.
///
/// Construct it with [`HeadClientConfig::new`] from the node's `host:port` and adjust it with the
/// `with_*` methods.
#[derive(Debug, Clone)]
pub struct HeadClientConfig {
    /// Full websocket URL of the node.
    pub(crate) url: String,

    /// Delay before reconnecting after the connection is lost, defaults to
    /// [`DEFAULT_RECONNECT_BACKOFF`].
    pub(crate) reconnect_backoff: Duration,

    /// How long a command waits for its response, defaults to [`DEFAULT_REQUEST_TIMEOUT`].
    pub(crate) request_timeout: Duration,
}

impl HeadClientConfig {
    /// Creates a config for the node listening on `host` (e.g. `127.0.0.1:4001`).
    pub fn new(host: &str) -> Self {
        Self {
            url: format!("ws://{host}/{WS_QUERY}"),
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Replaces the websocket URL.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Updates the reconnect backoff.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Updates the request timeout.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The websocket URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_websocket_url_from_host() {
        let cfg = HeadClientConfig::new("127.0.0.1:4001");
        assert_eq!(cfg.url(), "ws://127.0.0.1:4001/?history=no&tx-output=cbor");
        assert_eq!(cfg.reconnect_backoff, Duration::from_secs(1));
    }
}
