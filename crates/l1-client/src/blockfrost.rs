//! The Blockfrost [`Ledger`] implementation.

use async_trait::async_trait;
use hydra_bridge_primitives::{
    ledger::{Ledger, LedgerError},
    types::{Asset, TxIn, TxOut, Utxo},
};
use reqwest::{header::CONTENT_TYPE, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};

use crate::{config::L1ClientConfig, errors::L1ClientError};

const PROJECT_ID_HEADER: &str = "project_id";

#[derive(Debug, Deserialize)]
struct AddressUtxo {
    tx_hash: String,
    output_index: u32,
    address: String,
    amount: Vec<Asset>,
    #[serde(default)]
    data_hash: Option<String>,
    #[serde(default)]
    inline_datum: Option<String>,
    #[serde(default)]
    reference_script_hash: Option<String>,
}

impl From<AddressUtxo> for Utxo {
    fn from(u: AddressUtxo) -> Self {
        let mut output = TxOut::new(u.address, u.amount);
        output.datum_hash = u.data_hash;
        output.inline_datum = u.inline_datum;
        output.script_ref = u.reference_script_hash;

        Utxo {
            input: TxIn::new(u.tx_hash, u.output_index),
            output,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TxOutput {
    output_index: u32,
    address: String,
    amount: Vec<Asset>,
    #[serde(default)]
    data_hash: Option<String>,
    #[serde(default)]
    inline_datum: Option<String>,
    #[serde(default)]
    reference_script_hash: Option<String>,
    #[serde(default)]
    consumed_by_tx: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxUtxos {
    hash: String,
    outputs: Vec<TxOutput>,
}

/// HTTP client for the Blockfrost API.
#[derive(Debug, Clone)]
pub struct BlockfrostClient {
    http: reqwest::Client,
    config: L1ClientConfig,
}

impl BlockfrostClient {
    /// Creates a client from `config`.
    pub fn new(config: L1ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{path}", self.config.url))
            .header(PROJECT_ID_HEADER, &self.config.project_id)
    }

    /// Every unspent output at `address`, following pagination. An unknown address has none.
    pub async fn address_utxos(
        &self,
        address: &str,
        asset: Option<&str>,
    ) -> Result<Vec<Utxo>, L1ClientError> {
        let path = match asset {
            Some(unit) => format!("/addresses/{address}/utxos/{unit}"),
            None => format!("/addresses/{address}/utxos"),
        };

        let mut utxos = Vec::new();
        for page in 1.. {
            let response = self
                .get(&path)
                .query(&[("page", page), ("count", self.config.page_size)])
                .send()
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }

            let batch: Vec<AddressUtxo> = json(response).await?;
            let last = batch.len() < self.config.page_size;
            utxos.extend(batch.into_iter().map(Utxo::from));
            if last {
                break;
            }
        }

        debug!(%address, count = utxos.len(), "fetched l1 utxos");
        Ok(utxos)
    }

    /// Outputs of `tx_hash` that have not been spent yet.
    pub async fn unspent_tx_outputs(&self, tx_hash: &str) -> Result<Vec<Utxo>, L1ClientError> {
        let response = self.get(&format!("/txs/{tx_hash}/utxos")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let tx: TxUtxos = json(response).await?;
        Ok(tx
            .outputs
            .into_iter()
            .filter(|out| out.consumed_by_tx.is_none())
            .map(|out| {
                let mut output = TxOut::new(out.address, out.amount);
                output.datum_hash = out.data_hash;
                output.inline_datum = out.inline_datum;
                output.script_ref = out.reference_script_hash;
                Utxo {
                    input: TxIn::new(tx.hash.clone(), out.output_index),
                    output,
                }
            })
            .collect())
    }

    /// Submits a signed transaction and returns the hash the API reports.
    pub async fn submit(&self, tx: &[u8]) -> Result<String, L1ClientError> {
        let response = self
            .http
            .post(format!("{}/tx/submit", self.config.url))
            .header(PROJECT_ID_HEADER, &self.config.project_id)
            .header(CONTENT_TYPE, "application/cbor")
            .body(tx.to_vec())
            .send()
            .await?;

        let tx_hash: String = json(response).await?;
        info!(%tx_hash, "submitted l1 transaction");
        Ok(tx_hash)
    }

    /// Whether `tx_hash` is on chain.
    pub async fn is_on_chain(&self, tx_hash: &str) -> Result<bool, L1ClientError> {
        let response = self.get(&format!("/txs/{tx_hash}")).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(L1ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, L1ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(L1ClientError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.json().await?)
}

#[async_trait]
impl Ledger for BlockfrostClient {
    async fn fetch_address_utxos(
        &self,
        address: &str,
        asset: Option<&str>,
    ) -> Result<Vec<Utxo>, LedgerError> {
        Ok(self.address_utxos(address, asset).await?)
    }

    async fn fetch_utxos_by_tx(&self, tx_hash: &str) -> Result<Vec<Utxo>, LedgerError> {
        Ok(self.unspent_tx_outputs(tx_hash).await?)
    }

    async fn submit_tx(&self, tx: &[u8]) -> Result<String, LedgerError> {
        Ok(self.submit(tx).await?)
    }

    async fn is_tx_confirmed(&self, tx_hash: &str) -> Result<bool, LedgerError> {
        Ok(self.is_on_chain(tx_hash).await?)
    }
}
