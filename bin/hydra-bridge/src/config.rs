use std::{fmt, path::PathBuf, time::Duration};

use hydra_bridge_db::persistent::config::DbConfig;
use serde::{Deserialize, Serialize};

/// The operator-local configuration of the bridge node.
///
/// Unlike [`Params`](crate::params::Params), these values only affect this node and can differ
/// between operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The directory to store all the data in.
    pub datadir: PathBuf,

    /// The address the HTTP server listens on.
    pub http_addr: String,

    /// Worker threads of the runtime.
    pub num_threads: Option<u8>,

    /// How long tasks get to finish after a shutdown signal.
    pub shutdown_timeout: Option<Duration>,

    /// Signing keys, hex encoded.
    pub keys: KeyConfig,

    /// The head node and how our head is managed.
    pub head: HeadConfig,

    /// The indexer watching the bridge address on L1.
    pub indexer: IndexerConfig,

    /// The L1 query and submission API.
    pub l1: L1Config,

    /// The transaction builder service.
    pub tx_builder: TxBuilderConfig,

    /// Operation processing.
    pub bridge: BridgeConfig,

    /// The configuration for the sqlite3 database.
    #[serde(default)]
    pub db: DbConfig,
}

/// Keys accept either 32 raw bytes or the `5820`-prefixed CBOR form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KeyConfig {
    /// Funds our commits to the head.
    pub funding: String,

    /// Owns the head wallet that pays for mints.
    pub head_wallet: String,

    /// Controls the L1 treasury.
    pub treasury: String,
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyConfig([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HeadConfig {
    /// `host:port` of the head node.
    pub host: String,

    /// Websocket URL overriding the one derived from `host`.
    pub ws_url: Option<String>,

    /// Base URL of the node's HTTP API, used for commits.
    pub api_url: String,

    /// HTTP APIs of the other participants' nodes, which commit nothing.
    #[serde(default)]
    pub peers: Vec<String>,

    pub reconnect_backoff: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub start_retry_delay: Option<Duration>,
    pub no_funds_retry_delay: Option<Duration>,
    pub greeting_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct IndexerConfig {
    pub url: String,

    /// Match pattern, normally the bridge address.
    pub pattern: String,

    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct L1Config {
    pub url: String,
    pub project_id: String,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TxBuilderConfig {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BridgeConfig {
    /// L1 address releases are paid from.
    pub treasury_address: String,

    pub processor_interval: Option<Duration>,
    pub confirmation_timeout: Option<Duration>,
    pub confirmation_poll_interval: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_toml() {
        let config = r#"
            datadir = ".data"
            http_addr = "127.0.0.1:8000"
            num_threads = 2
            shutdown_timeout = { secs = 10, nanos = 0 }

            [keys]
            funding = "5820aa00000000000000000000000000000000000000000000000000000000000000"
            head_wallet = "bb00000000000000000000000000000000000000000000000000000000000000"
            treasury = "cc00000000000000000000000000000000000000000000000000000000000000"

            [head]
            host = "127.0.0.1:4001"
            api_url = "http://127.0.0.1:4001"
            peers = ["http://127.0.0.1:4002"]
            reconnect_backoff = { secs = 5, nanos = 0 }
            greeting_timeout = { secs = 10, nanos = 0 }

            [indexer]
            url = "http://127.0.0.1:1442"
            pattern = "addr_test1wz0c73j3czfd77gtg58jtm2dz8fz7yrxzylv7dc67kew5tqk4uqc9"
            poll_interval = { secs = 1, nanos = 0 }

            [l1]
            url = "https://cardano-preprod.blockfrost.io/api/v0"
            project_id = "preprodabc"

            [tx_builder]
            url = "http://127.0.0.1:3000"

            [bridge]
            treasury_address = "addr_test1vz"
            processor_interval = { secs = 10, nanos = 0 }

            [db]
            max_retry_count = 3
            backoff_period = { secs = 1, nanos = 0 }
        "#;

        let config = toml::from_str::<Config>(config);
        assert!(
            config.is_ok(),
            "must be able to deserialize config from toml but got: {}",
            config.unwrap_err()
        );

        let config = config.unwrap();
        assert_eq!(config.head.peers.len(), 1);
        assert_eq!(config.head.ws_url, None);
        assert_eq!(config.db.max_retry_count(), 3);

        let serialized = toml::to_string(&config).unwrap();
        let deserialized = toml::from_str::<Config>(&serialized).unwrap();
        assert_eq!(
            deserialized, config,
            "must be able to serialize and deserialize config to toml"
        );
    }
}
