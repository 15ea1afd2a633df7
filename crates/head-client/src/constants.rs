//! This module provides the constant values used throughout the crate.

use std::time::Duration;

/// Delay between a lost connection and the next connection attempt.
pub(crate) const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// How long a command waits for its response before it is rejected.
///
/// Head initialization requires an L1 transaction to be observed, so this is generous.
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Query string asking the node to skip history replay and to emit transactions as CBOR.
pub(crate) const WS_QUERY: &str = "?history=no&tx-output=cbor";

/// Reason sent along with the close frame on an explicit disconnect.
pub(crate) const DISCONNECT_REASON: &str = "client disconnect";
