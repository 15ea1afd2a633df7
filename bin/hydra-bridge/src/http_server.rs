//! The HTTP surface of the bridge node.
//!
//! - `GET /hydra/utxos[?address=…|txHash=…]`: the head's UTxO set, optionally filtered.
//! - `POST /hydra/submitTx` with `{ "tx": "<hex>" }`: submits a signed transaction to the head.
//! - `GET /bridge/operations/:id`: a recorded bridge operation.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hydra_bridge_engine::{engine::BridgeEngine, errors::BridgeError};
use hydra_bridge_primitives::{
    ledger::{Ledger, LedgerError},
    operation::BridgeOperation,
    types::Utxo,
};
use hydra_head_engine::engine::HeadEngine;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The head as seen by the HTTP surface.
#[async_trait]
pub(crate) trait HeadView: Ledger {
    /// The whole UTxO set of the head.
    async fn all_utxos(&self) -> Result<Vec<Utxo>, LedgerError>;
}

#[async_trait]
impl HeadView for HeadEngine {
    async fn all_utxos(&self) -> Result<Vec<Utxo>, LedgerError> {
        self.fetch_utxos()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))
    }
}

#[derive(Clone)]
struct AppState {
    head: Arc<dyn HeadView>,
    bridge: Arc<BridgeEngine>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let status = match e {
            LedgerError::Rejected(_) | LedgerError::InvalidData(_) => StatusCode::BAD_REQUEST,
            LedgerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UtxoQuery {
    address: Option<String>,
    tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitTx {
    tx: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Submitted {
    tx_hash: String,
}

async fn utxos(
    State(state): State<AppState>,
    Query(query): Query<UtxoQuery>,
) -> Result<Json<Vec<Utxo>>, ApiError> {
    let utxos = match (query.address, query.tx_hash) {
        (Some(address), _) => state.head.fetch_address_utxos(&address, None).await?,
        (None, Some(tx_hash)) => state.head.fetch_utxos_by_tx(&tx_hash).await?,
        (None, None) => state.head.all_utxos().await?,
    };
    Ok(Json(utxos))
}

async fn submit_tx(
    State(state): State<AppState>,
    Json(body): Json<SubmitTx>,
) -> Result<Json<Submitted>, ApiError> {
    let tx = hex::decode(body.tx.trim()).map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("tx is not hex: {e}"),
    })?;

    let tx_hash = state.head.submit_tx(&tx).await?;
    debug!(%tx_hash, "transaction submitted over http");
    Ok(Json(Submitted { tx_hash }))
}

async fn operation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BridgeOperation>, ApiError> {
    state
        .bridge
        .operation(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("no operation {id}"),
        })
}

fn router(head: Arc<dyn HeadView>, bridge: Arc<BridgeEngine>) -> Router {
    Router::new()
        .route("/hydra/utxos", get(utxos))
        .route("/hydra/submitTx", post(submit_tx))
        .route("/bridge/operations/:id", get(operation))
        .with_state(AppState { head, bridge })
}

/// Serves the HTTP surface on `listener` until `cancel` fires.
pub(crate) async fn serve(
    listener: TcpListener,
    head: Arc<dyn HeadView>,
    bridge: Arc<BridgeEngine>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "starting http server");
    axum::serve(listener, router(head, bridge))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    info!("http server stopped");

    Ok(())
}
