//! Bridge operations: the record of an intent to move value from one ledger to the other.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Asset;

/// Which ledger a bridge operation starts or ends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerKind {
    /// The base settlement ledger (L1).
    Cardano,

    /// The head session (L2).
    Hydra,
}

impl LedgerKind {
    /// The ledger on the other side of the bridge.
    pub const fn counterpart(&self) -> Self {
        match self {
            LedgerKind::Cardano => LedgerKind::Hydra,
            LedgerKind::Hydra => LedgerKind::Cardano,
        }
    }

    /// The name used in storage and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Cardano => "Cardano",
            LedgerKind::Hydra => "Hydra",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown ledger or state name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl FromStr for LedgerKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cardano" => Ok(LedgerKind::Cardano),
            "Hydra" => Ok(LedgerKind::Hydra),
            _ => Err(UnknownVariant {
                kind: "ledger",
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle of a [`BridgeOperation`].
///
/// ```text
/// Pending -> Processing -> Submitting -> Submitted -> Confirmed
///                |              |             |
///                +--------------+-------------+-----> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    /// Observed on the origin ledger, waiting for the processor.
    Pending,

    /// Picked up by the processor.
    Processing,

    /// The destination transaction is being built, signed and submitted.
    Submitting,

    /// The destination transaction was accepted and awaits confirmation.
    Submitted,

    /// The destination transaction is confirmed. Terminal.
    Confirmed,

    /// The operation could not be completed. Terminal.
    Failed,
}

impl OperationState {
    /// Whether no further transition is possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Confirmed | OperationState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub const fn can_transition_to(&self, next: OperationState) -> bool {
        use OperationState::*;

        matches!(
            (*self, next),
            (Pending, Processing)
                | (Processing, Submitting)
                | (Submitting, Submitted)
                | (Submitted, Confirmed)
                | (Processing | Submitting | Submitted, Failed)
        )
    }

    /// The name used in storage and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationState::Pending => "Pending",
            OperationState::Processing => "Processing",
            OperationState::Submitting => "Submitting",
            OperationState::Submitted => "Submitted",
            OperationState::Confirmed => "Confirmed",
            OperationState::Failed => "Failed",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Pending" => OperationState::Pending,
            "Processing" => OperationState::Processing,
            "Submitting" => OperationState::Submitting,
            "Submitted" => OperationState::Submitted,
            "Confirmed" => OperationState::Confirmed,
            "Failed" => OperationState::Failed,
            _ => {
                return Err(UnknownVariant {
                    kind: "operation state",
                    value: s.to_string(),
                })
            }
        })
    }
}

/// A qualifying origin-side event that has not been recorded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBridgeOperation {
    /// Ledger the value comes from.
    pub origin: LedgerKind,

    /// Address that sent the value.
    pub origin_address: String,

    /// Transaction that carried the value.
    pub origin_tx_hash: String,

    /// Output (or, for burns, position) within that transaction.
    pub origin_output_index: u32,

    /// Value to move.
    pub amount: Vec<Asset>,

    /// Address to pay on the destination ledger.
    pub destination_address: String,
}

impl NewBridgeOperation {
    /// Ledger the value goes to.
    pub const fn destination(&self) -> LedgerKind {
        self.origin.counterpart()
    }
}

/// A tracked bridge operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeOperation {
    /// Store-assigned identifier.
    pub id: i64,

    /// Ledger the value comes from.
    pub origin: LedgerKind,

    /// Address that sent the value.
    pub origin_address: String,

    /// Transaction that carried the value.
    pub origin_tx_hash: String,

    /// Output within that transaction.
    pub origin_output_index: u32,

    /// Value to move.
    pub amount: Vec<Asset>,

    /// Ledger the value goes to.
    pub destination: LedgerKind,

    /// Address to pay on the destination ledger.
    pub destination_address: String,

    /// Hash of the compensating transaction once submitted.
    pub destination_tx_hash: Option<String>,

    /// Output of the compensating transaction paying the destination.
    pub destination_output_index: u32,

    /// Current state.
    pub state: OperationState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperationState::*;

    const ALL: [OperationState; 6] = [Pending, Processing, Submitting, Submitted, Confirmed, Failed];

    #[test]
    fn forward_path_is_allowed() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Submitting));
        assert!(Submitting.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Confirmed));
    }

    #[test]
    fn failed_is_reachable_only_from_in_flight_states() {
        let sources: Vec<_> = ALL.iter().filter(|s| s.can_transition_to(Failed)).collect();
        assert_eq!(sources, vec![&Processing, &Submitting, &Submitted]);
    }

    #[test]
    fn nothing_returns_to_pending_or_leaves_terminal_states() {
        for from in ALL {
            assert!(!from.can_transition_to(Pending));
            if from.is_terminal() {
                assert!(ALL.iter().all(|to| !from.can_transition_to(*to)));
            }
        }
    }

    #[test]
    fn names_parse_back() {
        for state in ALL {
            assert_eq!(state.as_str().parse::<OperationState>().unwrap(), state);
        }
        assert_eq!("Hydra".parse::<LedgerKind>().unwrap(), LedgerKind::Hydra);
        assert!("Ethereum".parse::<LedgerKind>().is_err());
        assert_eq!(LedgerKind::Cardano.counterpart(), LedgerKind::Hydra);
    }
}
