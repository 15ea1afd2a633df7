//! A single reconnecting websocket connection to one head node.
//!
//! The [`Channel`] owns exactly one supervisor task per call to [`Channel::connect`]. The
//! supervisor opens the socket, pumps frames in both directions and, whenever the socket goes away
//! for any reason other than [`Channel::disconnect`], waits for the configured backoff and dials
//! again. Every supervisor is stamped with a generation number; a supervisor whose generation is
//! no longer current never touches the shared state, so frames from a superseded socket can never
//! reach subscribers of the new one.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use hydra_bridge_primitives::subscription::{EventBus, Subscription};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
};
use tokio_tungstenite::{
    tungstenite::{
        protocol::{frame::coding::CloseCode, CloseFrame},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{constants::DISCONNECT_REASON, errors::ChannelError};

/// Connection state of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not connected and not trying to connect.
    Idle,

    /// Dialing, or waiting to redial after losing the connection.
    Connecting,

    /// The socket is open.
    Connected,
}

#[derive(Debug, Default)]
struct Link {
    generation: u64,
    outbox: Option<mpsc::UnboundedSender<Message>>,
    cancel: Option<CancellationToken>,
}

#[derive(Debug)]
struct Shared {
    url: String,
    backoff: Duration,
    link: Mutex<Link>,
    state: watch::Sender<ChannelState>,
    inbound: EventBus<String>,
}

impl Shared {
    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Updates the state only if `generation` is still the live one.
    fn set_state_if_current(&self, generation: u64, state: ChannelState) -> bool {
        let link = self.link();
        if link.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }
}

/// How a socket session ended.
#[derive(Debug)]
enum Closure {
    Requested,
    Remote(Option<u16>),
    Transport(String),
}

/// A reconnecting duplex text channel.
#[derive(Debug, Clone)]
pub struct Channel {
    shared: Arc<Shared>,
}

impl Channel {
    /// Creates an idle channel for `url`.
    pub fn new(url: &str, backoff: Duration) -> Self {
        let (state, _) = watch::channel(ChannelState::Idle);
        Self {
            shared: Arc::new(Shared {
                url: url.to_string(),
                backoff,
                link: Mutex::new(Link::default()),
                state,
                inbound: EventBus::new(),
            }),
        }
    }

    /// The endpoint this channel dials.
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    /// Whether the socket is open.
    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Resolves once the channel is connected.
    pub async fn wait_until_open(&self) {
        let mut rx = self.watch_state();
        // The sender lives in `self`, so this cannot fail while we hold it.
        let _ = rx.wait_for(|state| *state == ChannelState::Connected).await;
    }

    /// Subscribes to every inbound text frame, verbatim.
    pub fn subscribe(&self) -> Subscription<String> {
        self.shared.inbound.subscribe()
    }

    /// Starts connecting. Does nothing unless the channel is [`ChannelState::Idle`].
    pub fn connect(&self) {
        let mut link = self.shared.link();
        if *self.shared.state.borrow() != ChannelState::Idle {
            trace!(url = %self.shared.url, "connect ignored, channel not idle");
            return;
        }

        link.generation += 1;
        let generation = link.generation;
        let cancel = CancellationToken::new();
        link.cancel = Some(cancel.clone());
        self.shared.state.send_replace(ChannelState::Connecting);
        drop(link);

        info!(url = %self.shared.url, %generation, "connecting channel");
        tokio::spawn(supervise(self.shared.clone(), generation, cancel));
    }

    /// Closes the socket with code 1007 and forces the state to
    /// [`ChannelState::Idle`]. No reconnect is attempted afterwards.
    pub fn disconnect(&self) {
        let mut link = self.shared.link();
        link.generation += 1;
        link.outbox = None;
        if let Some(cancel) = link.cancel.take() {
            cancel.cancel();
        }
        self.shared.state.send_replace(ChannelState::Idle);
        drop(link);

        info!(url = %self.shared.url, "channel disconnected");
    }

    /// Sends a text frame. Fails without sending anything unless the channel is connected.
    pub fn send(&self, text: String) -> Result<(), ChannelError> {
        let link = self.shared.link();
        let state = *self.shared.state.borrow();
        if state != ChannelState::Connected {
            return Err(ChannelError::NotConnected(state));
        }

        let outbox = link.outbox.as_ref().ok_or(ChannelError::NotConnected(state))?;
        trace!(url = %self.shared.url, %text, "sending frame");
        outbox
            .send(Message::Text(text))
            .map_err(|_| ChannelError::NotConnected(state))
    }
}

/// Keeps one logical connection alive until cancelled or superseded.
async fn supervise(shared: Arc<Shared>, generation: u64, cancel: CancellationToken) {
    loop {
        let dialed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            res = tokio_tungstenite::connect_async(shared.url.as_str()) => res,
        };

        match dialed {
            Ok((socket, _)) => {
                let (outbox, outbox_rx) = mpsc::unbounded_channel();
                {
                    let mut link = shared.link();
                    if link.generation != generation || cancel.is_cancelled() {
                        return;
                    }
                    link.outbox = Some(outbox);
                    shared.state.send_replace(ChannelState::Connected);
                }
                info!(url = %shared.url, %generation, "channel connected");

                let closure = pump(socket, outbox_rx, &cancel, &shared.inbound).await;
                {
                    let mut link = shared.link();
                    if link.generation == generation {
                        link.outbox = None;
                    }
                }

                match closure {
                    Closure::Requested => return,
                    Closure::Remote(code) => {
                        warn!(url = %shared.url, ?code, "connection closed by peer, reconnecting")
                    }
                    Closure::Transport(e) => {
                        warn!(url = %shared.url, %e, "connection lost, reconnecting")
                    }
                }
            }
            Err(e) => {
                warn!(url = %shared.url, %e, "could not connect, retrying");
            }
        }

        if !shared.set_state_if_current(generation, ChannelState::Connecting) {
            return;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(shared.backoff) => {}
        }
    }
}

/// Moves frames between the socket and the channel until the socket ends.
async fn pump(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbox: mpsc::UnboundedReceiver<Message>,
    cancel: &CancellationToken,
    inbound: &EventBus<String>,
) -> Closure {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Invalid,
                    reason: DISCONNECT_REASON.into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    debug!(%e, "close frame not delivered");
                }
                return Closure::Requested;
            }
            Some(msg) = outbox.recv() => {
                if let Err(e) = sink.send(msg).await {
                    return Closure::Transport(e.to_string());
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => inbound.publish(text),
                Some(Ok(Message::Close(frame))) => {
                    return Closure::Remote(frame.map(|f| u16::from(f.code)));
                }
                Some(Ok(other)) => trace!(?other, "ignoring non-text frame"),
                Some(Err(e)) => return Closure::Transport(e.to_string()),
                None => return Closure::Transport("stream ended".to_string()),
            },
        }
    }
}
