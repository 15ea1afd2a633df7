//! Clients for a head node's `POST /commit` endpoint, which drafts the L1 transaction that locks
//! funds into the head.

use std::fmt;

use async_trait::async_trait;
use hydra_head_client::messages::WireUtxoSet;
use serde::Deserialize;
use tracing::debug;

use crate::errors::CommitError;

/// Drafts commit transactions.
#[async_trait]
pub trait CommitClient: Send + Sync + fmt::Debug {
    /// Asks the node for an unsigned commit transaction spending `utxos`. An empty set drafts a
    /// commit of nothing.
    async fn draft_commit(&self, utxos: &WireUtxoSet) -> Result<Vec<u8>, CommitError>;
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    #[serde(rename = "cborHex")]
    cbor_hex: String,
}

/// [`CommitClient`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCommitClient {
    http: reqwest::Client,
    url: String,
}

impl HttpCommitClient {
    /// Creates a client for the node's HTTP API at `base_url` (e.g. `http://127.0.0.1:4001`).
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/commit", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl CommitClient for HttpCommitClient {
    async fn draft_commit(&self, utxos: &WireUtxoSet) -> Result<Vec<u8>, CommitError> {
        debug!(url = %self.url, utxos = utxos.len(), "drafting commit");
        let response = self.http.post(&self.url).json(utxos).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CommitError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let draft: DraftResponse = response.json().await?;
        Ok(hex::decode(draft.cbor_hex)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn posts_the_utxo_set_and_decodes_the_draft() {
        let seen = Arc::new(Mutex::new(None));
        let router = Router::new()
            .route(
                "/commit",
                post(
                    |State(seen): State<Arc<Mutex<Option<Value>>>>, Json(body): Json<Value>| async move {
                        *seen.lock().unwrap() = Some(body);
                        Json(json!({ "cborHex": "84a0a0f5f6", "type": "Tx ConwayEra" }))
                    },
                ),
            )
            .with_state(seen.clone());
        let client = HttpCommitClient::new(&serve(router).await);

        let draft = client.draft_commit(&WireUtxoSet::new()).await.unwrap();
        assert_eq!(draft, vec![0x84, 0xa0, 0xa0, 0xf5, 0xf6]);
        assert_eq!(seen.lock().unwrap().clone(), Some(json!({})));
    }

    #[tokio::test]
    async fn error_statuses_are_reported() {
        let router = Router::new().route(
            "/commit",
            post(|| async { (StatusCode::BAD_REQUEST, "head not initializing") }),
        );
        let client = HttpCommitClient::new(&serve(router).await);

        let err = client.draft_commit(&WireUtxoSet::new()).await.unwrap_err();
        assert!(matches!(err, CommitError::Status { status: 400, ref body } if body == "head not initializing"));
    }
}
