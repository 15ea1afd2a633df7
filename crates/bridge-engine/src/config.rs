//! Bridge parameters and processing schedule.

use std::time::Duration;

use hydra_bridge_primitives::address::Network;
use serde::{Deserialize, Serialize};

/// How often the processor looks for pending operations by default.
pub const DEFAULT_PROCESSOR_INTERVAL: Duration = Duration::from_secs(10);

/// How long a submitted transaction may stay unconfirmed before its operation fails.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Delay between two confirmation checks.
pub const DEFAULT_CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Lovelace outputs paid to the recipient of every mint besides the wrapped asset.
pub const DEFAULT_MINT_OUTPUTS: [u64; 3] = [20_000_000, 15_000_000, 5_000_000];

/// The token that represents bridged lovelace inside the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedAsset {
    /// Hex minting policy id.
    pub policy_id: String,

    /// Hex asset name.
    pub asset_name: String,
}

impl WrappedAsset {
    /// Creates the asset description.
    pub fn new(policy_id: &str, asset_name: &str) -> Self {
        Self {
            policy_id: policy_id.to_lowercase(),
            asset_name: asset_name.to_lowercase(),
        }
    }

    /// The asset's unit: policy id followed by asset name.
    pub fn unit(&self) -> String {
        format!("{}{}", self.policy_id, self.asset_name)
    }
}

/// Static configuration of the bridge engine.
///
/// Construct it with [`BridgeConfig::new`] and adjust it with the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Network addresses are derived for.
    pub(crate) network: Network,

    /// The wrapped asset minted for deposits and burned for releases.
    pub(crate) wrapped: WrappedAsset,

    /// L1 address holding deposited funds, which pays releases.
    pub(crate) treasury_address: String,

    /// Lovelace withheld from every release.
    pub(crate) bridge_fee: u64,

    /// Extra lovelace outputs of every mint.
    pub(crate) mint_outputs: Vec<u64>,

    /// Delay between two processor ticks.
    pub(crate) processor_interval: Duration,

    /// Deadline for a submitted transaction to confirm.
    pub(crate) confirmation_timeout: Duration,

    /// Delay between two confirmation checks.
    pub(crate) confirmation_poll_interval: Duration,
}

impl BridgeConfig {
    /// Creates a config with the default schedule, no fee and the default mint outputs.
    pub fn new(network: Network, wrapped: WrappedAsset, treasury_address: &str) -> Self {
        Self {
            network,
            wrapped,
            treasury_address: treasury_address.to_string(),
            bridge_fee: 0,
            mint_outputs: DEFAULT_MINT_OUTPUTS.to_vec(),
            processor_interval: DEFAULT_PROCESSOR_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            confirmation_poll_interval: DEFAULT_CONFIRMATION_POLL_INTERVAL,
        }
    }

    /// Updates the bridge fee.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub const fn with_bridge_fee(mut self, fee: u64) -> Self {
        self.bridge_fee = fee;
        self
    }

    /// Replaces the extra mint outputs.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_mint_outputs(mut self, outputs: Vec<u64>) -> Self {
        self.mint_outputs = outputs;
        self
    }

    /// Updates the processor interval.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub const fn with_processor_interval(mut self, interval: Duration) -> Self {
        self.processor_interval = interval;
        self
    }

    /// Updates how long and how often confirmations are awaited.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub const fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self.confirmation_poll_interval = poll_interval;
        self
    }

    /// The wrapped asset.
    pub const fn wrapped(&self) -> &WrappedAsset {
        &self.wrapped
    }

    /// The network addresses are derived for.
    pub const fn network(&self) -> Network {
        self.network
    }

    pub const fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    pub const fn confirmation_poll_interval(&self) -> Duration {
        self.confirmation_poll_interval
    }
}
