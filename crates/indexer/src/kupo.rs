//! Minimal client for the Kupo HTTP API.

use std::collections::BTreeMap;

use hydra_bridge_primitives::types::{Asset, TxIn, TxOut, Utxo};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::trace;

use crate::{constants::INLINE_DATUM, errors::IndexerError};

/// A point on the chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Point {
    /// Absolute slot.
    pub slot_no: u64,

    /// Hash of the block header.
    pub header_hash: String,
}

/// Value held by a match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchValue {
    /// Lovelace.
    pub coins: u64,

    /// Native assets keyed by `<policy>.<asset name>`, or just `<policy>` for an empty name.
    #[serde(default)]
    pub assets: BTreeMap<String, u64>,
}

/// An output matched by the indexer's pattern.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Match {
    /// Hash of the producing transaction.
    pub transaction_id: String,

    /// Index of the output within it.
    pub output_index: u32,

    /// Address holding the output.
    pub address: String,

    /// Value locked in the output.
    pub value: MatchValue,

    /// Hash of the attached datum.
    #[serde(default)]
    pub datum_hash: Option<String>,

    /// `inline` or `hash`, when a datum is attached.
    #[serde(default)]
    pub datum_type: Option<String>,

    /// Where the output was created.
    pub created_at: Point,

    /// Where the output was spent, if it was.
    #[serde(default)]
    pub spent_at: Option<Point>,
}

impl Match {
    /// Whether the output carries its datum inline.
    pub fn has_inline_datum(&self) -> bool {
        self.datum_type.as_deref() == Some(INLINE_DATUM) && self.datum_hash.is_some()
    }

    /// Converts the match into a [`Utxo`], attaching `inline_datum` when resolved.
    pub fn into_utxo(self, inline_datum: Option<String>) -> Utxo {
        let mut amount = vec![Asset::lovelace(self.value.coins)];
        amount.extend(
            self.value
                .assets
                .into_iter()
                .map(|(unit, quantity)| Asset::new(unit.replace('.', ""), quantity)),
        );

        let mut output = TxOut::new(self.address, amount);
        output.datum_hash = self.datum_hash;
        output.inline_datum = inline_datum;

        Utxo {
            input: TxIn::new(self.transaction_id, self.output_index),
            output,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DatumResponse {
    datum: String,
}

/// HTTP client for a Kupo instance.
#[derive(Debug, Clone)]
pub struct KupoClient {
    http: reqwest::Client,
    url: String,
}

impl KupoClient {
    /// Creates a client for the instance at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Unspent outputs matching `pattern`.
    pub async fn unspent_matches(&self, pattern: &str) -> Result<Vec<Match>, IndexerError> {
        self.get(&format!("{}/matches/{pattern}?unspent", self.url))
            .await
    }

    /// Hex CBOR of the datum whose hash is `hash`, if the indexer knows it.
    pub async fn datum(&self, hash: &str) -> Result<Option<String>, IndexerError> {
        let response: Option<DatumResponse> =
            self.get(&format!("{}/datums/{hash}", self.url)).await?;

        Ok(response.map(|r| r.datum))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, IndexerError> {
        trace!(%url, "querying indexer");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}
