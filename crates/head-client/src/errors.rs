//! Errors produced by the channel and the protocol client.

use hydra_bridge_primitives::errors::CborError;
use thiserror::Error;

use crate::{channel::ChannelState, pending::CommandKind};

/// Errors from the duplex channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A send was attempted while the channel was not connected.
    #[error("channel is not connected (state: {0:?})")]
    NotConnected(ChannelState),
}

/// Why a pending command did not succeed.
///
/// Cloned to every caller waiting on the same command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The node rejected a transaction.
    #[error("transaction {tx_hash} invalid: {reason}")]
    TxInvalid {
        /// Hash of the rejected transaction.
        tx_hash: String,

        /// Validation error reported by the node.
        reason: String,
    },

    /// The node could not execute a command.
    #[error("{tag} failed: {detail}")]
    CommandFailed {
        /// Tag of the failed command.
        tag: String,

        /// Raw message reported by the node.
        detail: String,
    },

    /// No response arrived in time.
    #[error("{0:?} timed out")]
    TimedOut(CommandKind),

    /// The command could not be written to the channel.
    #[error("{0:?} could not be sent: {1}")]
    SendFailed(CommandKind, ChannelError),

    /// The client went away before the command completed.
    #[error("{0:?} abandoned")]
    Abandoned(CommandKind),
}

/// Errors returned by [`crate::client::HeadClient`].
#[derive(Debug, Error)]
pub enum HeadClientError {
    /// The command was rejected or could not complete.
    #[error("{0}")]
    Rejected(#[from] Rejection),

    /// The transaction could not be decoded.
    #[error("invalid transaction: {0}")]
    Cbor(#[from] CborError),

    /// The command could not be encoded.
    #[error("could not encode command: {0}")]
    Encode(#[from] serde_json::Error),

    /// The response did not match the command.
    #[error("unexpected response to {0:?}")]
    UnexpectedResponse(CommandKind),
}

/// Errors raised while decoding server messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The frame is not valid JSON for any known message.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// A UTxO key is not a `<txHash>#<index>` reference.
    #[error("invalid utxo reference: {0}")]
    TxIn(#[from] hydra_bridge_primitives::types::TxInParseError),

    /// A transaction payload could not be decoded.
    #[error("invalid transaction payload: {0}")]
    Cbor(#[from] CborError),
}
