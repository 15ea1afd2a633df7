use std::{fmt, str::FromStr};

/// HeadStatus is the client's view of the head's lifecycle.
///
/// The first three variants describe the connection before the node has told us anything; every
/// other variant is set only from messages sent by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadStatus {
    /// Not connected yet.
    Disconnected,

    /// Dialing the node.
    Connecting,

    /// Connected, waiting for the node's greeting.
    Connected,

    /// No head exists.
    Idle,

    /// The head is collecting commits.
    Initializing,

    /// The head is open for transactions.
    Open,

    /// The head was closed and is in its contestation period.
    Closed,

    /// The contestation period is over and funds can be fanned out.
    FanoutPossible,

    /// Funds were fanned out. The head is gone.
    Final,
}

impl HeadStatus {
    /// Whether a new head may be initialized from this status.
    pub const fn can_init(&self) -> bool {
        matches!(
            self,
            HeadStatus::Disconnected
                | HeadStatus::Idle
                | HeadStatus::Final
                | HeadStatus::Initializing
        )
    }
}

impl fmt::Display for HeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Error returned for head status names the client does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHeadStatus(pub String);

impl FromStr for HeadStatus {
    type Err = UnknownHeadStatus;

    /// Parses the status names used by the node's `Greetings` message.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Idle" => HeadStatus::Idle,
            "Initializing" => HeadStatus::Initializing,
            "Open" => HeadStatus::Open,
            "Closed" => HeadStatus::Closed,
            "FanoutPossible" => HeadStatus::FanoutPossible,
            "Final" => HeadStatus::Final,
            _ => return Err(UnknownHeadStatus(s.to_string())),
        })
    }
}

/// HeadEvent is what subscribers of [`crate::client::HeadClient::subscribe`] receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadEvent {
    /// The head status changed.
    StatusChanged(HeadStatus),

    /// A transaction was applied in the head. Carries the unwrapped CBOR.
    Transaction {
        /// Hex id of the transaction.
        tx_hash: String,

        /// Raw transaction bytes.
        cbor: Vec<u8>,
    },

    /// A snapshot confirmed this transaction.
    TransactionConfirmed(String),

    /// The head was aborted before it opened.
    HeadAborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_greeting_status_names() {
        assert_eq!("FanoutPossible".parse(), Ok(HeadStatus::FanoutPossible));
        assert_eq!("Idle".parse(), Ok(HeadStatus::Idle));
        assert!("Bogus".parse::<HeadStatus>().is_err());
    }

    #[test]
    fn init_is_allowed_only_without_a_live_head() {
        assert!(HeadStatus::Idle.can_init());
        assert!(HeadStatus::Initializing.can_init());
        assert!(!HeadStatus::Open.can_init());
        assert!(!HeadStatus::Connected.can_init());
    }
}
