//! Configuration of the head engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Contestation period requested when initializing a head, in seconds.
pub const DEFAULT_CONTESTATION_PERIOD: u64 = 60;

/// Number of recently confirmed transaction hashes remembered.
pub const DEFAULT_CONFIRMED_CAPACITY: usize = 10_000;

/// HeadEngineConfig controls how the engine brings its head up and keeps it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadEngineConfig {
    /// Contestation period passed to `Init`, in seconds.
    pub contestation_period: u64,

    /// Delay before retrying a start attempt that failed.
    pub start_retry_delay: Duration,

    /// Delay before retrying when the funding address holds nothing to commit.
    pub no_funds_retry_delay: Duration,

    /// How long to wait for the node's greeting after the socket opens before acting on whatever
    /// status is known.
    pub greeting_timeout: Duration,

    /// How many confirmed transaction hashes are remembered; the oldest are forgotten first.
    pub confirmed_capacity: usize,
}

impl Default for HeadEngineConfig {
    fn default() -> Self {
        Self {
            contestation_period: DEFAULT_CONTESTATION_PERIOD,
            start_retry_delay: Duration::from_secs(10),
            no_funds_retry_delay: Duration::from_secs(10),
            greeting_timeout: Duration::from_secs(5),
            confirmed_capacity: DEFAULT_CONFIRMED_CAPACITY,
        }
    }
}

impl HeadEngineConfig {
    /// Updates the contestation period.
    pub fn with_contestation_period(mut self, secs: u64) -> Self {
        self.contestation_period = secs;
        self
    }

    /// Updates both retry delays.
    pub fn with_retry_delays(mut self, start: Duration, no_funds: Duration) -> Self {
        self.start_retry_delay = start;
        self.no_funds_retry_delay = no_funds;
        self
    }

    /// Updates the greeting timeout.
    pub fn with_greeting_timeout(mut self, timeout: Duration) -> Self {
        self.greeting_timeout = timeout;
        self
    }

    /// Updates how many confirmed hashes are remembered.
    pub fn with_confirmed_capacity(mut self, capacity: usize) -> Self {
        self.confirmed_capacity = capacity;
        self
    }
}
