//! An in-process head node that speaks just enough of the websocket API for tests.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use futures::{SinkExt, StreamExt};
use hydra_bridge_primitives::cbor::wrap_bytes;
use serde_json::{json, Value};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, Notify},
    task::JoinHandle,
};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::constants::WS_QUERY;

type Responder = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

#[derive(Debug, Clone)]
enum Control {
    Text(String),
    Drop,
}

struct MockState {
    greeting: Option<String>,
    responder: Responder,
    outbound: broadcast::Sender<Control>,
    received: Mutex<Vec<String>>,
    closes: Mutex<Vec<Option<u16>>>,
    total: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    changed: Notify,
}

/// A websocket server standing in for a head node.
///
/// Every text frame it receives is recorded and handed to the responder, whose replies are sent
/// back on the same connection.
pub struct MockHeadNode {
    addr: SocketAddr,
    state: Arc<MockState>,
    accept_task: JoinHandle<()>,
}

impl std::fmt::Debug for MockHeadNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHeadNode")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl Drop for MockHeadNode {
    fn drop(&mut self) {
        self.accept_task.abort();
        let _ = self.state.outbound.send(Control::Drop);
    }
}

impl MockHeadNode {
    /// Starts a node that never answers.
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(None, |_| Vec::new()).await
    }

    /// Starts a node that sends `greeting` on every new connection and answers each inbound
    /// frame with whatever `responder` returns.
    pub async fn start_with(
        greeting: Option<String>,
        responder: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (outbound, _) = broadcast::channel(64);

        let state = Arc::new(MockState {
            greeting,
            responder: Arc::new(responder),
            outbound,
            received: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
            total: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            changed: Notify::new(),
        });

        let accept_state = state.clone();
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, accept_state.clone()));
            }
        });

        Ok(Self {
            addr,
            state,
            accept_task,
        })
    }

    /// `host:port` of the node.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Websocket URL of the node.
    pub fn url(&self) -> String {
        format!("ws://{}/{WS_QUERY}", self.addr)
    }

    /// Sends `msg` to every connected client.
    pub fn push(&self, msg: impl Into<String>) {
        let _ = self.state.outbound.send(Control::Text(msg.into()));
    }

    /// Drops every open socket without a closing handshake.
    pub fn drop_connections(&self) {
        let _ = self.state.outbound.send(Control::Drop);
    }

    /// Every frame received so far, in arrival order.
    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().unwrap().clone()
    }

    /// Received frames whose `tag` is `tag`.
    pub fn received_with_tag(&self, tag: &str) -> Vec<String> {
        self.received()
            .into_iter()
            .filter(|msg| tag_of(msg).as_deref() == Some(tag))
            .collect()
    }

    /// Number of websocket connections accepted so far.
    pub fn total_connections(&self) -> usize {
        self.state.total.load(Ordering::SeqCst)
    }

    /// Largest number of simultaneously open connections observed.
    pub fn max_concurrent_connections(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` frames were received.
    pub async fn wait_for_received(&self, n: usize) {
        self.wait_until(|s| s.received.lock().unwrap().len() >= n)
            .await
    }

    /// Waits until at least `n` connections were accepted.
    pub async fn wait_for_connections(&self, n: usize) {
        self.wait_until(|s| s.total.load(Ordering::SeqCst) >= n)
            .await
    }

    /// Waits for a client close frame and returns its code.
    pub async fn wait_for_close(&self) -> Option<u16> {
        self.wait_until(|s| !s.closes.lock().unwrap().is_empty())
            .await;
        self.state.closes.lock().unwrap()[0]
    }

    async fn wait_until(&self, cond: impl Fn(&MockState) -> bool) {
        loop {
            let notified = self.state.changed.notified();
            if cond(&self.state) {
                return;
            }
            notified.await;
        }
    }
}

async fn serve(stream: TcpStream, state: Arc<MockState>) {
    let Ok(socket) = accept_async(stream).await else {
        return;
    };
    let mut control = state.outbound.subscribe();
    let (mut sink, mut source) = socket.split();

    state.total.fetch_add(1, Ordering::SeqCst);
    let active = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_active.fetch_max(active, Ordering::SeqCst);
    state.changed.notify_waiters();

    if let Some(greeting) = &state.greeting {
        let _ = sink.send(Message::Text(greeting.clone())).await;
    }

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.received.lock().unwrap().push(text.clone());
                    state.changed.notify_waiters();
                    for reply in (state.responder)(&text) {
                        if sink.send(Message::Text(reply)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    state.closes.lock().unwrap().push(frame.map(|f| u16::from(f.code)));
                    state.changed.notify_waiters();
                    break;
                }
                Some(Ok(_)) => {}
                _ => break,
            },
            control = control.recv() => match control {
                Ok(Control::Text(text)) => {
                    let _ = sink.send(Message::Text(text)).await;
                }
                Ok(Control::Drop) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => {}
            },
        }
    }

    state.active.fetch_sub(1, Ordering::SeqCst);
    state.changed.notify_waiters();
}

/// Extracts the `tag` field of a JSON message.
pub fn tag_of(msg: &str) -> Option<String> {
    serde_json::from_str::<Value>(msg)
        .ok()?
        .get("tag")?
        .as_str()
        .map(str::to_string)
}

/// A `Greetings` message reporting `head_status` and an optional snapshot.
pub fn greetings(head_status: &str, snapshot_utxo: Option<Value>) -> String {
    let mut msg = json!({ "tag": "Greetings", "headStatus": head_status });
    if let Some(utxo) = snapshot_utxo {
        msg["snapshotUtxo"] = utxo;
    }
    msg.to_string()
}

/// A message carrying only a tag.
pub fn bare(tag: &str) -> String {
    json!({ "tag": tag }).to_string()
}

/// A `TxValid` message for the raw transaction `tx`, wrapped the way the node wraps it.
pub fn tx_valid(tx: &[u8]) -> String {
    json!({ "tag": "TxValid", "transaction": hex::encode(wrap_bytes(tx)) }).to_string()
}

/// A `TxInvalid` message for the raw transaction `tx`.
pub fn tx_invalid(tx: &[u8], reason: &str) -> String {
    json!({
        "tag": "TxInvalid",
        "transaction": hex::encode(wrap_bytes(tx)),
        "validationError": { "reason": reason },
    })
    .to_string()
}

/// A `SnapshotConfirmed` message.
pub fn snapshot_confirmed(utxo: Value, confirmed: &[&str]) -> String {
    json!({
        "tag": "SnapshotConfirmed",
        "snapshot": { "utxo": utxo, "confirmedTransactions": confirmed },
    })
    .to_string()
}

/// A `GetUTxOResponse` message.
pub fn utxo_response(utxo: Value) -> String {
    json!({ "tag": "GetUTxOResponse", "utxo": utxo }).to_string()
}

/// A `CommandFailed` message for the command tagged `tag`.
pub fn command_failed(tag: &str) -> String {
    json!({ "tag": "CommandFailed", "clientInput": { "tag": tag } }).to_string()
}
