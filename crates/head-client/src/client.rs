//! The protocol client: one [`Channel`] plus the head state machine and the pending table.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use hydra_bridge_primitives::{
    subscription::{EventBus, Subscription},
    tx::Transaction,
    types::UtxoSet,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    channel::{Channel, ChannelState},
    config::HeadClientConfig,
    errors::{HeadClientError, Rejection},
    event::{HeadEvent, HeadStatus},
    messages::{ClientInput, ServerOutput},
    pending::{CommandKind, PendingTable, Resolution},
    state_machine::{HeadSM, PendingUpdate, Transition},
};

#[derive(Debug)]
struct Inner {
    channel: Channel,
    sm: Mutex<HeadSM>,
    pending: Mutex<PendingTable>,
    events: EventBus<HeadEvent>,
    status: watch::Sender<HeadStatus>,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.channel.disconnect();
    }
}

impl Inner {
    fn sm(&self) -> MutexGuard<'_, HeadSM> {
        self.sm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, PendingTable> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the state machine and applies what it produced.
    fn apply(&self, f: impl FnOnce(&mut HeadSM) -> Transition) {
        let transition = {
            let mut sm = self.sm();
            let transition = f(&mut sm);
            let status = sm.status();
            self.status.send_if_modified(|current| {
                let changed = *current != status;
                *current = status;
                changed
            });
            transition
        };

        if !transition.pending.is_empty() {
            let mut pending = self.pending();
            for update in transition.pending {
                let notified = match update {
                    PendingUpdate::Complete(kind, id, outcome) => {
                        pending.complete(kind, id.as_deref(), outcome)
                    }
                    PendingUpdate::RejectKind(kind, rejection) => {
                        pending.reject_kind(kind, rejection)
                    }
                };
                trace!(%notified, "pending requests resolved");
            }
        }

        for event in transition.events {
            self.events.publish(event);
        }
    }
}

/// Client for a single head node.
///
/// Cheap to clone; all clones share the same connection and state. Must be created inside a tokio
/// runtime.
#[derive(Debug, Clone)]
pub struct HeadClient {
    inner: Arc<Inner>,
}

impl HeadClient {
    /// Creates a client for the node described by `config`. The client stays disconnected until
    /// [`HeadClient::connect`] is called.
    pub fn new(config: HeadClientConfig) -> Self {
        let channel = Channel::new(&config.url, config.reconnect_backoff);
        let frames = channel.subscribe();
        let channel_state = channel.watch_state();
        let cancel = CancellationToken::new();
        let (status, _) = watch::channel(HeadStatus::Disconnected);

        let inner = Arc::new(Inner {
            channel,
            sm: Mutex::new(HeadSM::default()),
            pending: Mutex::new(PendingTable::default()),
            events: EventBus::new(),
            status,
            request_timeout: config.request_timeout,
            cancel: cancel.clone(),
        });

        tokio::spawn(pump(Arc::downgrade(&inner), frames, channel_state, cancel));

        Self { inner }
    }

    /// Starts connecting to the node.
    pub fn connect(&self) {
        self.inner.channel.connect();
    }

    /// Closes the connection and forgets the head status.
    pub fn disconnect(&self) {
        self.inner.channel.disconnect();
        self.inner.apply(HeadSM::reset);
    }

    /// Whether the underlying channel is open.
    pub fn is_connected(&self) -> bool {
        self.inner.channel.is_open()
    }

    /// Resolves once the underlying channel is open.
    pub async fn wait_until_connected(&self) {
        self.inner.channel.wait_until_open().await
    }

    /// Current head status.
    pub fn status(&self) -> HeadStatus {
        *self.inner.status.borrow()
    }

    /// A receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<HeadStatus> {
        self.inner.status.subscribe()
    }

    /// Resolves with the first status, current or future, that satisfies `pred`.
    pub async fn wait_for_status(&self, pred: impl Fn(HeadStatus) -> bool) -> HeadStatus {
        let mut rx = self.watch_status();
        let status = match rx.wait_for(|status| pred(*status)).await {
            Ok(status) => *status,
            // the sender lives in `self.inner`
            Err(_) => self.status(),
        };
        status
    }

    /// Whether the head is open.
    pub fn is_open(&self) -> bool {
        self.status() == HeadStatus::Open
    }

    /// The last UTxO snapshot received from the node.
    pub fn utxos(&self) -> UtxoSet {
        self.inner.sm().utxos().clone()
    }

    /// Subscribes to head events.
    pub fn subscribe(&self) -> Subscription<HeadEvent> {
        self.inner.events.subscribe()
    }

    /// Asks the node to initialize a head and waits until it reports `HeadIsInitializing`.
    pub async fn init(&self, contestation_period: u64) -> Result<(), HeadClientError> {
        let input = ClientInput::Init {
            contestation_period,
        };
        match self.request(CommandKind::Init, None, &input).await? {
            Resolution::Initializing => Ok(()),
            _ => Err(HeadClientError::UnexpectedResponse(CommandKind::Init)),
        }
    }

    /// Submits a raw transaction to the head and waits for the node's verdict. Returns the
    /// transaction hash.
    ///
    /// Concurrent submissions of the same transaction share one `NewTx` command and observe the
    /// same outcome.
    pub async fn submit_tx(&self, tx: &[u8]) -> Result<String, HeadClientError> {
        let tx_hash = Transaction::decode(tx.to_vec())?.hash();
        let input = ClientInput::NewTx {
            transaction: hex::encode(tx),
        };
        debug!(%tx_hash, "submitting transaction to head");

        match self
            .request(CommandKind::NewTx, Some(tx_hash), &input)
            .await?
        {
            Resolution::TxValid(hash) => Ok(hash),
            _ => Err(HeadClientError::UnexpectedResponse(CommandKind::NewTx)),
        }
    }

    /// Asks the node for its current UTxO set.
    pub async fn fetch_utxos(&self) -> Result<UtxoSet, HeadClientError> {
        match self
            .request(CommandKind::GetUtxo, None, &ClientInput::GetUtxo)
            .await?
        {
            Resolution::Utxos(set) => Ok(set),
            _ => Err(HeadClientError::UnexpectedResponse(CommandKind::GetUtxo)),
        }
    }

    /// Registers a waiter for `(kind, id)` and sends `input` if no identical command is already in
    /// flight.
    async fn request(
        &self,
        kind: CommandKind,
        id: Option<String>,
        input: &ClientInput,
    ) -> Result<Resolution, HeadClientError> {
        let frame = serde_json::to_string(input)?;

        let (rx, is_new) = self.inner.pending().register(kind, id.clone());
        if is_new {
            if let Err(e) = self.inner.channel.send(frame) {
                warn!(?kind, %e, "could not send command");
                self.inner.pending().complete(
                    kind,
                    id.as_deref(),
                    Err(Rejection::SendFailed(kind, e)),
                );
            }
        } else {
            debug!(?kind, ?id, "joining in-flight command");
        }

        let outcome = match tokio::time::timeout(self.inner.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Rejection::Abandoned(kind)),
            Err(_) => {
                warn!(?kind, ?id, "command timed out");
                self.inner
                    .pending()
                    .complete(kind, id.as_deref(), Err(Rejection::TimedOut(kind)));
                Err(Rejection::TimedOut(kind))
            }
        };

        Ok(outcome?)
    }
}

const fn connection_status(state: ChannelState) -> HeadStatus {
    match state {
        ChannelState::Idle => HeadStatus::Disconnected,
        ChannelState::Connecting => HeadStatus::Connecting,
        ChannelState::Connected => HeadStatus::Connected,
    }
}

/// Feeds channel frames and state changes into the client until it is dropped.
async fn pump(
    inner: Weak<Inner>,
    mut frames: Subscription<String>,
    mut channel_state: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            changed = channel_state.changed() => {
                if changed.is_err() {
                    return;
                }
                let status = connection_status(*channel_state.borrow_and_update());
                let Some(inner) = inner.upgrade() else { return };
                inner.apply(|sm| sm.process_connection(status));
            }
            frame = frames.recv() => {
                let Some(frame) = frame else { return };
                let Some(inner) = inner.upgrade() else { return };
                match serde_json::from_str::<ServerOutput>(&frame) {
                    Ok(msg) => inner.apply(|sm| sm.process(msg)),
                    Err(e) => warn!(%e, %frame, "ignoring malformed message"),
                }
            }
        }
    }
}
