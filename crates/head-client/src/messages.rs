//! JSON messages exchanged with a head node.
//!
//! Inbound frames decode into [`ServerOutput`]; commands are encoded from [`ClientInput`]. UTxO sets
//! travel as a map from `"<txHash>#<index>"` to [`WireTxOut`] and are converted to and from the
//! ledger-neutral types in `hydra_bridge_primitives::types`.

use std::collections::BTreeMap;

use hydra_bridge_primitives::{
    cbor::{major_type, unwrap_prefix, MAJOR_BYTES},
    errors::CborError,
    types::{Asset, TxIn, TxOut, Utxo, UtxoSet, LOVELACE, POLICY_ID_HEX_LEN},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MessageError;

/// UTxO set as it appears on the wire.
pub type WireUtxoSet = BTreeMap<String, WireTxOut>;

/// A transaction output as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTxOut {
    /// Bech32 address.
    pub address: String,

    /// Hash of the attached datum.
    #[serde(default, rename = "datumhash", skip_serializing_if = "Option::is_none")]
    pub datum_hash: Option<String>,

    /// Inline datum, either hex CBOR or its JSON rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_datum: Option<Value>,

    /// Hex CBOR of the inline datum, when the node provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_datum_raw: Option<String>,

    /// Reference script, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_script: Option<Value>,

    /// Value: `lovelace` plus one map of asset name to quantity per policy.
    pub value: BTreeMap<String, WireValue>,
}

/// One entry of a wire value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    /// The lovelace amount.
    Coin(u64),

    /// Asset name to quantity for a single policy.
    Assets(BTreeMap<String, u64>),
}

/// A transaction as reported in `TxValid`/`TxInvalid`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireTx {
    /// Hex CBOR, possibly wrapped in a byte string header.
    Hex(String),

    /// Text envelope carrying the hex CBOR.
    Envelope {
        /// Hex CBOR of the transaction.
        #[serde(rename = "cborHex")]
        cbor_hex: String,
    },
}

impl WireTx {
    /// Returns the raw transaction bytes, with any byte string header removed.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        let hex_payload = match self {
            WireTx::Hex(s) => s,
            WireTx::Envelope { cbor_hex } => cbor_hex,
        };

        let bytes = hex::decode(hex_payload).map_err(CborError::from)?;
        match bytes.first() {
            Some(b) if major_type(*b) == MAJOR_BYTES => Ok(unwrap_prefix(&bytes)?.to_vec()),
            _ => Ok(bytes),
        }
    }
}

/// Snapshot payload of `SnapshotConfirmed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// The full UTxO set after the snapshot.
    #[serde(default)]
    pub utxo: WireUtxoSet,

    /// Transactions confirmed by the snapshot, in order.
    #[serde(default)]
    pub confirmed_transactions: Vec<String>,
}

/// Validation failure reported by `TxInvalid`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationError {
    /// Human readable reason.
    pub reason: String,
}

/// The command echoed back by `CommandFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientInputTag {
    /// Tag of the command that failed.
    pub tag: String,
}

/// Messages emitted by a head node that this client acts on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tag")]
pub enum ServerOutput {
    /// Sent once per connection.
    #[serde(rename_all = "camelCase")]
    Greetings {
        /// Current head status as named by the node.
        head_status: String,

        /// Latest confirmed UTxO set, if the head has one.
        #[serde(default)]
        snapshot_utxo: Option<WireUtxoSet>,
    },

    /// The head is collecting commits.
    HeadIsInitializing {},

    /// The head is open.
    HeadIsOpen {
        /// Initial UTxO set of the head.
        #[serde(default)]
        utxo: Option<WireUtxoSet>,
    },

    /// The head was closed on L1.
    HeadIsClosed {},

    /// The contestation period is over.
    ReadyToFanout {},

    /// Funds were fanned out to L1.
    HeadIsFinalized {},

    /// The head was aborted before opening.
    HeadIsAborted {},

    /// A new snapshot was signed by all parties.
    SnapshotConfirmed {
        /// The snapshot.
        snapshot: Snapshot,
    },

    /// A submitted transaction was applied.
    TxValid {
        /// The transaction.
        transaction: WireTx,
    },

    /// A submitted transaction was rejected.
    #[serde(rename_all = "camelCase")]
    TxInvalid {
        /// The transaction.
        transaction: WireTx,

        /// Why it was rejected.
        validation_error: ValidationError,
    },

    /// Answer to `GetUTxO`.
    #[serde(rename = "GetUTxOResponse")]
    GetUtxoResponse {
        /// Current UTxO set.
        utxo: WireUtxoSet,
    },

    /// A command could not be executed.
    #[serde(rename_all = "camelCase")]
    CommandFailed {
        /// The offending command.
        client_input: ClientInputTag,
    },

    /// Any other message.
    #[serde(other)]
    Unknown,
}

/// Commands sent to a head node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag")]
pub enum ClientInput {
    /// Initialize a new head.
    #[serde(rename_all = "camelCase")]
    Init {
        /// Contestation period in seconds.
        contestation_period: u64,
    },

    /// Submit a transaction to the head.
    NewTx {
        /// Hex CBOR of the transaction.
        transaction: String,
    },

    /// Ask for the current UTxO set.
    #[serde(rename = "GetUTxO")]
    GetUtxo,
}

/// Converts a wire UTxO set into the ledger-neutral form.
pub fn decode_utxo_set(wire: &WireUtxoSet) -> Result<UtxoSet, MessageError> {
    wire.iter()
        .map(|(key, out)| Ok((key.parse::<TxIn>()?, decode_tx_out(out))))
        .collect()
}

fn decode_tx_out(out: &WireTxOut) -> TxOut {
    let mut amount = Vec::with_capacity(out.value.len());
    for (key, value) in &out.value {
        match value {
            WireValue::Coin(n) if key == LOVELACE => amount.insert(0, Asset::lovelace(*n)),
            WireValue::Coin(n) => amount.push(Asset::new(key.clone(), *n)),
            WireValue::Assets(assets) => amount.extend(
                assets
                    .iter()
                    .map(|(name, n)| Asset::new(format!("{key}{name}"), *n)),
            ),
        }
    }

    let inline_datum = out.inline_datum_raw.clone().or_else(|| match &out.inline_datum {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    });

    let script_ref = match &out.reference_script {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    TxOut {
        address: out.address.clone(),
        amount,
        datum_hash: out.datum_hash.clone(),
        inline_datum,
        script_ref,
    }
}

/// Renders a UTxO in the wire form, as expected by the node's commit endpoint.
pub fn encode_utxo(utxo: &Utxo) -> WireUtxoSet {
    let mut value = BTreeMap::new();
    value.insert(LOVELACE.to_string(), WireValue::Coin(utxo.output.lovelace()));

    for asset in utxo.output.amount.iter().filter(|a| !a.is_lovelace()) {
        let (policy, name) = asset
            .unit
            .split_at(POLICY_ID_HEX_LEN.min(asset.unit.len()));
        let entry = value
            .entry(policy.to_string())
            .or_insert_with(|| WireValue::Assets(BTreeMap::new()));
        if let WireValue::Assets(assets) = entry {
            *assets.entry(name.to_string()).or_default() += asset.quantity;
        }
    }

    let out = WireTxOut {
        address: utxo.output.address.clone(),
        datum_hash: None,
        inline_datum: None,
        inline_datum_raw: None,
        reference_script: None,
        value,
    };

    BTreeMap::from([(utxo.input.to_string(), out)])
}
