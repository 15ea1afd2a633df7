//! The seam to the service that assembles unsigned transactions.
//!
//! Script construction and fee calculation live outside the bridge. The bridge decides what goes
//! in and out of each transaction and signs the result.

use std::fmt;

use async_trait::async_trait;
use hydra_bridge_primitives::types::{Asset, TxOut, Utxo};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::TxBuilderError;

/// A mint of the wrapped asset inside the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Pure-lovelace output backing the script execution.
    pub collateral: Utxo,

    /// Wallet outputs available to fund the transaction.
    pub inputs: Vec<Utxo>,

    /// Minting policy id.
    pub policy_id: String,

    /// Hex asset name.
    pub asset_name: String,

    /// Amount to mint.
    pub quantity: u64,

    /// Address receiving the minted tokens.
    pub recipient: String,

    /// Outputs paid besides the minted tokens.
    pub extra_outputs: Vec<TxOut>,

    /// Where change goes.
    pub change_address: String,
}

/// A payment out of the L1 treasury.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    /// Treasury outputs to spend.
    pub inputs: Vec<Utxo>,

    /// Address to pay.
    pub recipient: String,

    /// Value paid to `recipient`.
    pub amount: Vec<Asset>,

    /// Where change goes, normally the treasury itself.
    pub change_address: String,

    /// Hex key hash that must sign the transaction.
    pub required_signer: String,
}

/// Assembles unsigned transactions.
#[async_trait]
pub trait TxBuilder: Send + Sync + fmt::Debug {
    /// Builds the mint for a deposit. The recipient's output comes first.
    async fn build_mint(&self, request: &MintRequest) -> Result<Vec<u8>, TxBuilderError>;

    /// Builds the release for a burn. The recipient's output comes first.
    async fn build_release(&self, request: &ReleaseRequest) -> Result<Vec<u8>, TxBuilderError>;
}

#[derive(Debug, Deserialize)]
struct BuiltTx {
    #[serde(rename = "cborHex")]
    cbor_hex: String,
}

/// [`TxBuilder`] backed by an HTTP service exposing `POST /mint` and `POST /release`.
#[derive(Debug, Clone)]
pub struct RemoteTxBuilder {
    http: reqwest::Client,
    url: String,
}

impl RemoteTxBuilder {
    /// Creates a builder for the service at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    async fn build<T: Serialize + Sync>(
        &self,
        path: &str,
        request: &T,
    ) -> Result<Vec<u8>, TxBuilderError> {
        let url = format!("{}/{path}", self.url);
        debug!(%url, "building transaction");
        let response = self.http.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TxBuilderError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let built: BuiltTx = response.json().await?;
        Ok(hex::decode(built.cbor_hex)?)
    }
}

#[async_trait]
impl TxBuilder for RemoteTxBuilder {
    async fn build_mint(&self, request: &MintRequest) -> Result<Vec<u8>, TxBuilderError> {
        self.build("mint", request).await
    }

    async fn build_release(&self, request: &ReleaseRequest) -> Result<Vec<u8>, TxBuilderError> {
        self.build("release", request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use hydra_bridge_primitives::types::TxIn;
    use serde_json::{json, Value};

    use super::*;

    type Seen = Arc<Mutex<Vec<Value>>>;

    async fn serve() -> (Seen, RemoteTxBuilder) {
        let seen = Seen::default();
        let router = Router::new()
            .route(
                "/mint",
                post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(body);
                    Json(json!({ "cborHex": "84a0a0f5f6" }))
                }),
            )
            .route(
                "/release",
                post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "not enough funds") }),
            )
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        (seen, RemoteTxBuilder::new(&format!("http://{addr}/")))
    }

    #[tokio::test]
    async fn posts_mint_requests_in_camel_case() {
        let (seen, builder) = serve().await;
        let collateral = Utxo {
            input: TxIn::new("aa", 0),
            output: TxOut::new("addr_test1wallet", vec![Asset::lovelace(5_000_000)]),
        };
        let request = MintRequest {
            collateral: collateral.clone(),
            inputs: vec![collateral],
            policy_id: "d4".into(),
            asset_name: "48".into(),
            quantity: 10,
            recipient: "addr_test1recipient".into(),
            extra_outputs: vec![TxOut::new("addr_test1recipient", vec![Asset::lovelace(1)])],
            change_address: "addr_test1wallet".into(),
        };

        let tx = builder.build_mint(&request).await.unwrap();
        assert_eq!(tx, vec![0x84, 0xa0, 0xa0, 0xf5, 0xf6]);

        let body = seen.lock().unwrap()[0].clone();
        assert_eq!(body["policyId"], "d4");
        assert_eq!(body["quantity"], 10);
        assert_eq!(body["changeAddress"], "addr_test1wallet");
        assert_eq!(body["collateral"]["input"]["txHash"], "aa");
        assert_eq!(body["extraOutputs"][0]["amount"][0]["quantity"], "1");
    }

    #[tokio::test]
    async fn builder_failures_carry_the_status() {
        let (_, builder) = serve().await;
        let request = ReleaseRequest {
            inputs: vec![],
            recipient: "addr_test1recipient".into(),
            amount: vec![Asset::lovelace(1)],
            change_address: "addr_test1treasury".into(),
            required_signer: "00".repeat(28),
        };

        let err = builder.build_release(&request).await.unwrap_err();
        assert!(matches!(err, TxBuilderError::Status { status: 422, ref body } if body == "not enough funds"));
    }
}
