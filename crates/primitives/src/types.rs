//! Ledger value types shared by both sides of the bridge.

use std::{collections::BTreeMap, fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

/// Unit name of the base currency.
pub const LOVELACE: &str = "lovelace";

/// Length of a minting policy id in hex characters.
pub const POLICY_ID_HEX_LEN: usize = 56;

/// A quantity of a single asset.
///
/// `unit` is either [`LOVELACE`] or the hex policy id immediately followed by the hex asset name.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// Asset unit.
    pub unit: String,

    /// Amount, serialized as a decimal string.
    #[serde_as(as = "DisplayFromStr")]
    pub quantity: u64,
}

impl Asset {
    /// Creates a new asset entry.
    pub fn new(unit: impl Into<String>, quantity: u64) -> Self {
        Self {
            unit: unit.into(),
            quantity,
        }
    }

    /// Creates a lovelace entry.
    pub fn lovelace(quantity: u64) -> Self {
        Self::new(LOVELACE, quantity)
    }

    /// Whether this is the base currency.
    pub fn is_lovelace(&self) -> bool {
        self.unit == LOVELACE
    }

    /// Splits a native asset unit into `(policy_id, asset_name)`, both hex.
    ///
    /// Returns `None` for lovelace or malformed units.
    pub fn policy_and_name(&self) -> Option<(&str, &str)> {
        if self.is_lovelace() || self.unit.len() < POLICY_ID_HEX_LEN {
            return None;
        }

        Some(self.unit.split_at(POLICY_ID_HEX_LEN))
    }
}

/// Sums the lovelace entries of `amount`.
pub fn lovelace_of(amount: &[Asset]) -> u64 {
    amount
        .iter()
        .filter(|asset| asset.is_lovelace())
        .map(|asset| asset.quantity)
        .sum()
}

/// Error returned when parsing a `<txHash>#<outputIndex>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxInParseError {
    /// The separator was missing.
    #[error("missing '#' separator in {0:?}")]
    MissingSeparator(String),

    /// The output index is not a number.
    #[error("invalid output index: {0}")]
    Index(#[from] ParseIntError),

    /// The hash part is empty.
    #[error("empty transaction hash")]
    EmptyHash,
}

/// Reference to a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    /// Hex hash of the producing transaction.
    pub tx_hash: String,

    /// Index of the output within that transaction.
    pub output_index: u32,
}

impl TxIn {
    /// Creates a new output reference.
    pub fn new(tx_hash: impl Into<String>, output_index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
        }
    }
}

impl fmt::Display for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

impl FromStr for TxIn {
    type Err = TxInParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) = s
            .rsplit_once('#')
            .ok_or_else(|| TxInParseError::MissingSeparator(s.to_string()))?;
        if hash.is_empty() {
            return Err(TxInParseError::EmptyHash);
        }

        Ok(Self::new(hash, index.parse()?))
    }
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOut {
    /// Bech32 address holding the output.
    pub address: String,

    /// Value locked in the output.
    pub amount: Vec<Asset>,

    /// Hash of the attached datum, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum_hash: Option<String>,

    /// Hex CBOR of the inline datum, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_datum: Option<String>,

    /// Hex CBOR of the reference script, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_ref: Option<String>,
}

impl TxOut {
    /// Creates an output holding only `amount` with no datum or script.
    pub fn new(address: impl Into<String>, amount: Vec<Asset>) -> Self {
        Self {
            address: address.into(),
            amount,
            datum_hash: None,
            inline_datum: None,
            script_ref: None,
        }
    }

    /// Lovelace held by the output.
    pub fn lovelace(&self) -> u64 {
        lovelace_of(&self.amount)
    }

    /// Whether the output holds nothing but the base currency.
    pub fn is_lovelace_only(&self) -> bool {
        self.amount.iter().all(Asset::is_lovelace)
    }
}

/// An unspent output together with its reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Where the output lives.
    pub input: TxIn,

    /// What it holds.
    pub output: TxOut,
}

/// The authoritative UTxO set of a ledger, keyed by output reference.
pub type UtxoSet = BTreeMap<TxIn, TxOut>;

/// Flattens a [`UtxoSet`] into a list of [`Utxo`]s in reference order.
pub fn utxo_list(set: &UtxoSet) -> Vec<Utxo> {
    set.iter()
        .map(|(input, output)| Utxo {
            input: input.clone(),
            output: output.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn asset_quantities_serialize_as_strings() {
        let asset = Asset::lovelace(20_000_000);
        assert_eq!(
            serde_json::to_value(&asset).unwrap(),
            json!({ "unit": "lovelace", "quantity": "20000000" })
        );
    }

    #[test]
    fn utxo_serializes_in_camel_case() {
        let utxo = Utxo {
            input: TxIn::new("ab", 1),
            output: TxOut::new("addr_test1", vec![Asset::lovelace(5)]),
        };

        assert_eq!(
            serde_json::to_value(&utxo).unwrap(),
            json!({
                "input": { "txHash": "ab", "outputIndex": 1 },
                "output": { "address": "addr_test1", "amount": [{ "unit": "lovelace", "quantity": "5" }] }
            })
        );
    }

    #[test]
    fn splits_native_asset_units() {
        let policy = "d47ea75b975baa070978b1acd882029d2f95541d678d06bd63b4b9aa";
        let asset = Asset::new(format!("{policy}48796472414441"), 1);
        assert_eq!(asset.policy_and_name(), Some((policy, "48796472414441")));
        assert_eq!(Asset::lovelace(1).policy_and_name(), None);
    }

    #[test]
    fn lovelace_only_outputs() {
        let mut out = TxOut::new("addr", vec![Asset::lovelace(3), Asset::lovelace(4)]);
        assert!(out.is_lovelace_only());
        assert_eq!(out.lovelace(), 7);

        out.amount.push(Asset::new("ff".repeat(28), 1));
        assert!(!out.is_lovelace_only());
    }

    #[test]
    fn txin_parse_errors() {
        assert!(matches!(
            "abc".parse::<TxIn>(),
            Err(TxInParseError::MissingSeparator(_))
        ));
        assert!(matches!("#1".parse::<TxIn>(), Err(TxInParseError::EmptyHash)));
        assert!(matches!("abc#x".parse::<TxIn>(), Err(TxInParseError::Index(_))));
    }

    proptest! {
        #[test]
        fn txin_string_form(hash in "[0-9a-f]{64}", index in any::<u32>()) {
            let txin = TxIn::new(hash.clone(), index);
            let s = txin.to_string();
            prop_assert_eq!(&s, &format!("{hash}#{index}"));
            prop_assert_eq!(s.parse::<TxIn>().unwrap(), txin);
        }
    }
}
