//! The pure part of the protocol client.
//!
//! [`HeadSM`] folds server messages into the head status and the local UTxO snapshot and reports
//! what happened. It performs no I/O; the client applies the returned [`Transition`] to the pending
//! table and to subscribers.

use hydra_bridge_primitives::{tx::Transaction, types::UtxoSet};
use tracing::{debug, info, warn};

use crate::{
    errors::{MessageError, Rejection},
    event::{HeadEvent, HeadStatus},
    messages::{decode_utxo_set, ServerOutput, WireTx, WireUtxoSet},
    pending::{CommandKind, Outcome, Resolution},
};

/// A pending-table update produced by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingUpdate {
    /// Complete the entry for this command and id.
    Complete(CommandKind, Option<String>, Outcome),

    /// Reject every entry of this command.
    RejectKind(CommandKind, Rejection),
}

/// Everything a single message caused.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Events to publish, in order.
    pub events: Vec<HeadEvent>,

    /// Pending-table updates to apply.
    pub pending: Vec<PendingUpdate>,
}

/// Head status and UTxO snapshot as seen by this client.
#[derive(Debug, Clone)]
pub struct HeadSM {
    status: HeadStatus,
    utxos: UtxoSet,
}

impl Default for HeadSM {
    fn default() -> Self {
        Self {
            status: HeadStatus::Disconnected,
            utxos: UtxoSet::new(),
        }
    }
}

impl HeadSM {
    /// Current status.
    pub fn status(&self) -> HeadStatus {
        self.status
    }

    /// Latest UTxO snapshot.
    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    /// Records a connection-level status change, ignored once the node has reported a head status.
    pub fn process_connection(&mut self, status: HeadStatus) -> Transition {
        let mut transition = Transition::default();
        let pre_greeting = matches!(
            self.status,
            HeadStatus::Disconnected | HeadStatus::Connecting | HeadStatus::Connected
        );
        if pre_greeting {
            self.set_status(status, &mut transition);
        }
        transition
    }

    /// Forgets the head status after the client hung up on purpose.
    pub fn reset(&mut self) -> Transition {
        let mut transition = Transition::default();
        self.set_status(HeadStatus::Disconnected, &mut transition);
        transition
    }

    /// Folds one server message into the state.
    pub fn process(&mut self, msg: ServerOutput) -> Transition {
        let mut t = Transition::default();

        match msg {
            ServerOutput::Greetings {
                head_status,
                snapshot_utxo,
            } => {
                match head_status.parse::<HeadStatus>() {
                    Ok(status) => self.set_status(status, &mut t),
                    Err(_) => warn!(%head_status, "unknown head status in greeting"),
                }
                if let Some(utxo) = snapshot_utxo {
                    self.replace_utxos(&utxo);
                }
            }
            ServerOutput::HeadIsInitializing {} => {
                self.set_status(HeadStatus::Initializing, &mut t);
                t.pending.push(PendingUpdate::Complete(
                    CommandKind::Init,
                    None,
                    Ok(Resolution::Initializing),
                ));
            }
            ServerOutput::HeadIsOpen { utxo } => {
                self.set_status(HeadStatus::Open, &mut t);
                if let Some(utxo) = utxo {
                    self.replace_utxos(&utxo);
                }
            }
            ServerOutput::HeadIsClosed {} => self.set_status(HeadStatus::Closed, &mut t),
            ServerOutput::ReadyToFanout {} => self.set_status(HeadStatus::FanoutPossible, &mut t),
            ServerOutput::HeadIsFinalized {} => self.set_status(HeadStatus::Final, &mut t),
            ServerOutput::HeadIsAborted {} => {
                self.set_status(HeadStatus::Idle, &mut t);
                t.events.push(HeadEvent::HeadAborted);
            }
            ServerOutput::SnapshotConfirmed { snapshot } => {
                self.replace_utxos(&snapshot.utxo);
                t.events.extend(
                    snapshot
                        .confirmed_transactions
                        .into_iter()
                        .map(HeadEvent::TransactionConfirmed),
                );
            }
            ServerOutput::TxValid { transaction } => match decode_tx(&transaction) {
                Ok((tx_hash, cbor)) => {
                    debug!(%tx_hash, "transaction valid");
                    t.pending.push(PendingUpdate::Complete(
                        CommandKind::NewTx,
                        Some(tx_hash.clone()),
                        Ok(Resolution::TxValid(tx_hash.clone())),
                    ));
                    t.events.push(HeadEvent::Transaction { tx_hash, cbor });
                }
                Err(e) => warn!(%e, "undecodable transaction in TxValid"),
            },
            ServerOutput::TxInvalid {
                transaction,
                validation_error,
            } => match decode_tx(&transaction) {
                Ok((tx_hash, _)) => {
                    info!(%tx_hash, reason = %validation_error.reason, "transaction invalid");
                    t.pending.push(PendingUpdate::Complete(
                        CommandKind::NewTx,
                        Some(tx_hash.clone()),
                        Err(Rejection::TxInvalid {
                            tx_hash,
                            reason: validation_error.reason,
                        }),
                    ));
                }
                Err(e) => warn!(%e, "undecodable transaction in TxInvalid"),
            },
            ServerOutput::GetUtxoResponse { utxo } => match decode_utxo_set(&utxo) {
                Ok(set) => {
                    self.utxos = set.clone();
                    t.pending.push(PendingUpdate::Complete(
                        CommandKind::GetUtxo,
                        None,
                        Ok(Resolution::Utxos(set)),
                    ));
                }
                Err(e) => warn!(%e, "undecodable utxo set in GetUTxOResponse"),
            },
            ServerOutput::CommandFailed { client_input } => {
                match CommandKind::from_tag(&client_input.tag) {
                    Some(kind) => {
                        warn!(tag = %client_input.tag, "command failed");
                        t.pending.push(PendingUpdate::RejectKind(
                            kind,
                            Rejection::CommandFailed {
                                detail: format!("{} rejected by node", client_input.tag),
                                tag: client_input.tag,
                            },
                        ));
                    }
                    None => debug!(tag = %client_input.tag, "untracked command failed"),
                }
            }
            ServerOutput::Unknown => {}
        }

        t
    }

    fn set_status(&mut self, status: HeadStatus, t: &mut Transition) {
        if self.status == status {
            return;
        }

        info!(from = %self.status, to = %status, "head status changed");
        self.status = status;
        t.events.push(HeadEvent::StatusChanged(status));
    }

    /// Replaces the snapshot wholesale. A snapshot that cannot be decoded leaves the old one in
    /// place rather than exposing a partial set.
    fn replace_utxos(&mut self, wire: &WireUtxoSet) {
        match decode_utxo_set(wire) {
            Ok(set) => self.utxos = set,
            Err(e) => warn!(%e, "ignoring undecodable snapshot"),
        }
    }
}

fn decode_tx(wire: &WireTx) -> Result<(String, Vec<u8>), MessageError> {
    let cbor = wire.to_bytes()?;
    let tx = Transaction::decode(cbor)?;
    Ok((tx.hash(), tx.into_bytes()))
}
