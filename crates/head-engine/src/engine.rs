//! The head engine: brings a head up, commits funds into it and exposes it as a [`Ledger`].

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use async_trait::async_trait;
use hydra_bridge_primitives::{
    address::Network,
    keys::PaymentKey,
    ledger::{filter_by_address, Ledger, LedgerError},
    subscription::Subscription,
    tx::Transaction,
    types::{utxo_list, Utxo},
};
use hydra_head_client::{
    client::HeadClient,
    errors::{HeadClientError, Rejection},
    event::{HeadEvent, HeadStatus},
    messages::{encode_utxo, WireUtxoSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{commit::CommitClient, config::HeadEngineConfig, errors::HeadEngineError};

/// What a single start attempt achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The head was past the point where funds can be committed; nothing was done.
    HeadActive(HeadStatus),

    /// The head is initializing and the commits were submitted to L1.
    Committed {
        /// Hash of our own commit transaction.
        commit_tx: String,

        /// Hashes of the commits submitted for the other participants.
        peer_commits: Vec<String>,
    },

    /// The funding address holds nothing to commit.
    NoFunds,
}

/// Transaction hashes confirmed by snapshots, forgetting the oldest past `capacity`.
#[derive(Debug)]
struct RecentHashes {
    order: VecDeque<String>,
    hashes: HashSet<String>,
    capacity: usize,
}

impl RecentHashes {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            hashes: HashSet::new(),
            capacity,
        }
    }

    fn insert(&mut self, hash: String) {
        if self.capacity == 0 || !self.hashes.insert(hash.clone()) {
            return;
        }
        self.order.push_back(hash);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.hashes.remove(&oldest);
            }
        }
    }

    fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }
}

struct Inner {
    client: HeadClient,
    l1: Arc<dyn Ledger>,
    commit: Arc<dyn CommitClient>,
    peers: Vec<Arc<dyn CommitClient>>,
    funding_key: PaymentKey,
    network: Network,
    config: HeadEngineConfig,
    confirmed: Mutex<RecentHashes>,
    cancel: CancellationToken,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadEngine")
            .field("client", &self.client)
            .field("commit", &self.commit)
            .field("peers", &self.peers)
            .field("network", &self.network)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Inner {
    fn confirmed(&self) -> MutexGuard<'_, RecentHashes> {
        self.confirmed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the head client for one participant.
///
/// Cheap to clone. Must be created inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct HeadEngine {
    inner: Arc<Inner>,
}

impl HeadEngine {
    /// Creates the engine. Nothing is dialed until [`HeadEngine::start`] or [`HeadEngine::run`].
    ///
    /// `commit` drafts the commit of our own funds; each of `peers` drafts an empty commit on
    /// behalf of another participant.
    pub fn new(
        client: HeadClient,
        l1: Arc<dyn Ledger>,
        commit: Arc<dyn CommitClient>,
        peers: Vec<Arc<dyn CommitClient>>,
        funding_key: PaymentKey,
        network: Network,
        config: HeadEngineConfig,
    ) -> Self {
        let events = client.subscribe();
        let cancel = CancellationToken::new();
        let confirmed = Mutex::new(RecentHashes::new(config.confirmed_capacity));
        let inner = Arc::new(Inner {
            client,
            l1,
            commit,
            peers,
            funding_key,
            network,
            config,
            confirmed,
            cancel: cancel.clone(),
        });

        tokio::spawn(track_confirmations(Arc::downgrade(&inner), events, cancel));

        Self { inner }
    }

    /// The underlying head client.
    pub fn client(&self) -> &HeadClient {
        &self.inner.client
    }

    /// Subscribes to head events, including every transaction applied in the head.
    pub fn subscribe(&self) -> Subscription<HeadEvent> {
        self.inner.client.subscribe()
    }

    /// The last UTxO snapshot, without a round-trip.
    pub fn utxos(&self) -> Vec<Utxo> {
        utxo_list(&self.inner.client.utxos())
    }

    /// Address that funds our commits.
    pub fn funding_address(&self) -> Result<String, HeadEngineError> {
        Ok(self
            .inner
            .funding_key
            .enterprise_address(self.inner.network)?
            .to_string())
    }

    /// Runs one start attempt: connects, initializes the head if none is live, and commits the
    /// first UTxO at the funding address followed by an empty commit for each peer.
    pub async fn start(&self) -> Result<StartOutcome, HeadEngineError> {
        let client = &self.inner.client;
        client.connect();
        client.wait_until_connected().await;

        let status = tokio::time::timeout(
            self.inner.config.greeting_timeout,
            client.wait_for_status(|s| !awaiting_greeting(s)),
        )
        .await
        .unwrap_or_else(|_| client.status());

        if awaiting_greeting(status) {
            return Err(HeadEngineError::NoGreeting(status));
        }

        if !status.can_init() {
            info!(%status, "head is live, skipping init");
            return Ok(StartOutcome::HeadActive(status));
        }

        match client.init(self.inner.config.contestation_period).await {
            Ok(()) => info!("head initializing"),
            Err(e) if client.status() == HeadStatus::Initializing => {
                info!(%e, "head is already initializing")
            }
            Err(e) => return Err(e.into()),
        }

        let address = self.funding_address()?;
        info!(%address, "looking up funds to commit");

        let utxos = self.inner.l1.fetch_address_utxos(&address, None).await?;
        let Some(utxo) = utxos.first() else {
            warn!(%address, "no funds to commit, add funds to the funding address");
            return Ok(StartOutcome::NoFunds);
        };
        debug!(utxo = %utxo.input, "committing");

        let draft = self.inner.commit.draft_commit(&encode_utxo(utxo)).await?;
        let signed = Transaction::decode(draft)?.sign(&self.inner.funding_key)?;
        let commit_tx = self.inner.l1.submit_tx(&signed).await?;
        info!(%commit_tx, utxo = %utxo.input, "submitted commit");

        let mut peer_commits = Vec::with_capacity(self.inner.peers.len());
        for peer in &self.inner.peers {
            let draft = peer.draft_commit(&WireUtxoSet::new()).await?;
            let tx_hash = self.inner.l1.submit_tx(&draft).await?;
            info!(%tx_hash, ?peer, "submitted peer commit");
            peer_commits.push(tx_hash);
        }

        Ok(StartOutcome::Committed {
            commit_tx,
            peer_commits,
        })
    }

    /// Keeps the head up until `cancel` fires.
    ///
    /// Failed attempts are retried after the configured delay, and an aborted head triggers a new
    /// start.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut events = self.subscribe();

        loop {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                attempt = self.start() => attempt,
            };

            let delay = match attempt {
                Ok(StartOutcome::NoFunds) => self.inner.config.no_funds_retry_delay,
                Ok(outcome) => {
                    info!(?outcome, "head engine started");
                    if !wait_for_abort(&mut events, &cancel).await {
                        break;
                    }
                    warn!("head aborted, restarting");
                    Duration::ZERO
                }
                Err(e) => {
                    error!(%e, "start attempt failed");
                    self.inner.config.start_retry_delay
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.inner.client.disconnect();
        info!("head engine stopped");
    }

    /// Whether a snapshot has confirmed `tx_hash`.
    pub fn is_confirmed(&self, tx_hash: &str) -> bool {
        self.inner.confirmed().contains(tx_hash)
    }

    /// The head's UTxO set: a live round-trip when the head is open and the socket is up, the
    /// last snapshot otherwise.
    pub async fn fetch_utxos(&self) -> Result<Vec<Utxo>, HeadClientError> {
        let client = &self.inner.client;
        if client.is_open() && client.is_connected() {
            return Ok(utxo_list(&client.fetch_utxos().await?));
        }

        debug!(
            status = %client.status(),
            connected = client.is_connected(),
            "head not reachable, serving last snapshot"
        );
        Ok(self.utxos())
    }
}

/// Whether the node has yet to report a head status on the current connection.
const fn awaiting_greeting(status: HeadStatus) -> bool {
    matches!(
        status,
        HeadStatus::Disconnected | HeadStatus::Connecting | HeadStatus::Connected
    )
}

/// Resolves `true` on the next abort, `false` if cancelled first.
async fn wait_for_abort(events: &mut Subscription<HeadEvent>, cancel: &CancellationToken) -> bool {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            event = events.recv() => match event {
                Some(HeadEvent::HeadAborted) => return true,
                Some(_) => {}
                None => return false,
            },
        }
    }
}

async fn track_confirmations(
    inner: Weak<Inner>,
    mut events: Subscription<HeadEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            event = events.recv() => event,
        };

        let Some(event) = event else { return };
        let HeadEvent::TransactionConfirmed(tx_hash) = event else {
            continue;
        };
        let Some(inner) = inner.upgrade() else { return };

        debug!(%tx_hash, "transaction confirmed in head");
        inner.confirmed().insert(tx_hash);
    }
}

fn ledger_error(e: HeadClientError) -> LedgerError {
    match e {
        HeadClientError::Rejected(
            r @ (Rejection::TxInvalid { .. } | Rejection::CommandFailed { .. }),
        ) => LedgerError::Rejected(r.to_string()),
        HeadClientError::Cbor(e) => LedgerError::InvalidData(e.to_string()),
        other => LedgerError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl Ledger for HeadEngine {
    async fn fetch_address_utxos(
        &self,
        address: &str,
        asset: Option<&str>,
    ) -> Result<Vec<Utxo>, LedgerError> {
        let utxos = self.fetch_utxos().await.map_err(ledger_error)?;
        Ok(filter_by_address(&utxos, address, asset))
    }

    async fn fetch_utxos_by_tx(&self, tx_hash: &str) -> Result<Vec<Utxo>, LedgerError> {
        let utxos = self.fetch_utxos().await.map_err(ledger_error)?;
        Ok(utxos
            .into_iter()
            .filter(|utxo| utxo.input.tx_hash == tx_hash)
            .collect())
    }

    async fn submit_tx(&self, tx: &[u8]) -> Result<String, LedgerError> {
        self.inner.client.submit_tx(tx).await.map_err(ledger_error)
    }

    async fn is_tx_confirmed(&self, tx_hash: &str) -> Result<bool, LedgerError> {
        Ok(self.is_confirmed(tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use hydra_bridge_primitives::{
        test_utils::{MockLedger, TxFixture},
        types::{Asset, TxIn, TxOut},
    };
    use hydra_head_client::{
        config::HeadClientConfig,
        mock::{self, MockHeadNode},
    };
    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::errors::CommitError;

    const WAIT: Duration = Duration::from_secs(5);
    const SEED: [u8; 32] = [7; 32];

    #[derive(Debug)]
    struct StubCommit {
        draft: Vec<u8>,
        requests: Mutex<Vec<WireUtxoSet>>,
    }

    impl StubCommit {
        fn new(fee: u64) -> Arc<Self> {
            Arc::new(Self {
                draft: TxFixture::default().with_fee(fee).build(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommitClient for StubCommit {
        async fn draft_commit(&self, utxos: &WireUtxoSet) -> Result<Vec<u8>, CommitError> {
            self.requests.lock().unwrap().push(utxos.clone());
            Ok(self.draft.clone())
        }
    }

    fn funding_utxo() -> Utxo {
        let address = PaymentKey::from_bytes(&SEED)
            .enterprise_address(Network::Testnet)
            .unwrap()
            .to_string();
        Utxo {
            input: TxIn::new("ab".repeat(32), 0),
            output: TxOut::new(address, vec![Asset::lovelace(50_000_000)]),
        }
    }

    struct Fixture {
        node: MockHeadNode,
        l1: Arc<MockLedger>,
        commit: Arc<StubCommit>,
        peer: Arc<StubCommit>,
        engine: HeadEngine,
    }

    async fn fixture(greeting: &str, fail_init: bool, funds: Vec<Utxo>) -> Fixture {
        fixture_with(
            Some(greeting),
            fail_init,
            funds,
            HeadEngineConfig::default(),
        )
        .await
    }

    async fn fixture_with(
        greeting: Option<&str>,
        fail_init: bool,
        funds: Vec<Utxo>,
        config: HeadEngineConfig,
    ) -> Fixture {
        let greeting = greeting.map(|status| mock::greetings(status, None));
        let node = MockHeadNode::start_with(greeting, move |msg| {
            match (mock::tag_of(msg).as_deref(), fail_init) {
                (Some("Init"), false) => vec![mock::bare("HeadIsInitializing")],
                (Some("Init"), true) => vec![mock::command_failed("Init")],
                _ => vec![],
            }
        })
        .await
        .unwrap();

        let client = HeadClient::new(
            HeadClientConfig::new(&node.host()).with_reconnect_backoff(Duration::from_millis(50)),
        );
        let l1 = Arc::new(MockLedger::with_utxos(funds));
        let commit = StubCommit::new(1);
        let peer = StubCommit::new(2);
        let engine = HeadEngine::new(
            client,
            l1.clone(),
            commit.clone(),
            vec![peer.clone()],
            PaymentKey::from_bytes(&SEED),
            Network::Testnet,
            config,
        );

        Fixture {
            node,
            l1,
            commit,
            peer,
            engine,
        }
    }

    #[tokio::test]
    async fn start_initializes_and_commits_funds() {
        let f = fixture("Idle", false, vec![funding_utxo()]).await;

        let outcome = timeout(WAIT, f.engine.start()).await.unwrap().unwrap();
        let StartOutcome::Committed {
            commit_tx,
            peer_commits,
        } = outcome
        else {
            panic!("expected a commit, got {outcome:?}");
        };

        assert_eq!(f.node.received_with_tag("Init").len(), 1);
        assert_eq!(
            f.commit.requests.lock().unwrap().clone(),
            vec![encode_utxo(&funding_utxo())]
        );
        assert_eq!(f.peer.requests.lock().unwrap().clone(), vec![WireUtxoSet::new()]);

        let submitted = f.l1.submitted();
        assert_eq!(submitted.len(), 2);
        let ours = Transaction::decode(submitted[0].clone()).unwrap();
        assert_eq!(ours.hash(), commit_tx);
        assert_eq!(
            ours.first_vkey().unwrap(),
            Some(PaymentKey::from_bytes(&SEED).vkey())
        );
        assert_eq!(submitted[1], f.peer.draft);
        assert_eq!(peer_commits.len(), 1);
    }

    #[tokio::test]
    async fn start_without_funds_asks_to_retry() {
        let f = fixture("Idle", false, vec![]).await;

        let outcome = timeout(WAIT, f.engine.start()).await.unwrap().unwrap();
        assert_eq!(outcome, StartOutcome::NoFunds);
        assert!(f.commit.requests.lock().unwrap().is_empty());
        assert!(f.l1.submitted().is_empty());
    }

    #[tokio::test]
    async fn start_leaves_an_open_head_alone() {
        let f = fixture("Open", false, vec![funding_utxo()]).await;

        let outcome = timeout(WAIT, f.engine.start()).await.unwrap().unwrap();
        assert_eq!(outcome, StartOutcome::HeadActive(HeadStatus::Open));
        assert!(f.node.received_with_tag("Init").is_empty());
        assert!(f.l1.submitted().is_empty());
    }

    #[tokio::test]
    async fn failed_init_is_tolerated_while_initializing() {
        let f = fixture("Initializing", true, vec![funding_utxo()]).await;

        let outcome = timeout(WAIT, f.engine.start()).await.unwrap().unwrap();
        assert!(matches!(outcome, StartOutcome::Committed { .. }));
    }

    #[tokio::test]
    async fn failed_init_fails_the_attempt_otherwise() {
        let f = fixture("Final", true, vec![funding_utxo()]).await;

        let err = timeout(WAIT, f.engine.start()).await.unwrap().unwrap_err();
        assert!(matches!(err, HeadEngineError::Head(_)));
        assert!(f.l1.submitted().is_empty());
    }

    #[tokio::test]
    async fn records_confirmed_transactions() {
        let f = fixture("Open", false, vec![]).await;
        timeout(WAIT, f.engine.start()).await.unwrap().unwrap();

        f.node.push(mock::snapshot_confirmed(json!({}), &["h1", "h2"]));
        timeout(WAIT, async {
            while !f.engine.is_confirmed("h2") {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(f.engine.is_tx_confirmed("h1").await.unwrap());
        assert!(!f.engine.is_tx_confirmed("h3").await.unwrap());
    }

    #[tokio::test]
    async fn serves_the_snapshot_when_the_head_is_not_open() {
        let snapshot = json!({
            "cd#0": { "address": "addr_test1alice", "value": { "lovelace": 3 } },
            "cd#1": { "address": "addr_test1bob", "value": { "lovelace": 4 } }
        });
        let node = MockHeadNode::start_with(Some(mock::greetings("Closed", Some(snapshot))), |_| {
            vec![]
        })
        .await
        .unwrap();
        let client = HeadClient::new(HeadClientConfig::new(&node.host()));
        let engine = HeadEngine::new(
            client,
            Arc::new(MockLedger::default()),
            StubCommit::new(1),
            vec![],
            PaymentKey::from_bytes(&SEED),
            Network::Testnet,
            HeadEngineConfig::default(),
        );

        let outcome = timeout(WAIT, engine.start()).await.unwrap().unwrap();
        assert_eq!(outcome, StartOutcome::HeadActive(HeadStatus::Closed));

        let bob = engine
            .fetch_address_utxos("addr_test1bob", None)
            .await
            .unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0].input, TxIn::new("cd", 1));
        assert_eq!(engine.fetch_utxos_by_tx("cd").await.unwrap().len(), 2);
        assert!(node.received_with_tag("GetUTxO").is_empty());
    }

    #[tokio::test]
    async fn run_restarts_after_an_abort() {
        let f = fixture("Open", false, vec![]).await;
        let cancel = CancellationToken::new();
        let engine = f.engine.clone();
        let runner = tokio::spawn({
            let cancel = cancel.clone();
            async move { engine.run(cancel).await }
        });

        timeout(WAIT, f.engine.client().wait_for_status(|s| s == HeadStatus::Open))
            .await
            .unwrap();
        f.node.push(mock::bare("HeadIsAborted"));

        timeout(WAIT, async {
            while f.node.received_with_tag("Init").is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        timeout(WAIT, runner).await.unwrap().unwrap();
        assert_eq!(f.engine.client().status(), HeadStatus::Disconnected);
    }

    #[tokio::test]
    async fn start_without_a_greeting_fails_the_attempt() {
        let config = HeadEngineConfig::default().with_greeting_timeout(Duration::from_millis(100));
        let f = fixture_with(None, false, vec![funding_utxo()], config).await;

        let err = timeout(WAIT, f.engine.start()).await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            HeadEngineError::NoGreeting(HeadStatus::Connected)
        ));
        assert!(f.node.received_with_tag("Init").is_empty());
    }

    #[tokio::test]
    async fn run_initializes_a_head_that_greets_late() {
        let config = HeadEngineConfig::default()
            .with_greeting_timeout(Duration::from_millis(200))
            .with_retry_delays(Duration::from_millis(50), Duration::from_secs(60));
        let f = fixture_with(None, false, vec![], config).await;
        let cancel = CancellationToken::new();
        let engine = f.engine.clone();
        let runner = tokio::spawn({
            let cancel = cancel.clone();
            async move { engine.run(cancel).await }
        });

        timeout(WAIT, f.node.wait_for_connections(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        f.node.push(mock::greetings("Idle", None));

        timeout(WAIT, async {
            while f.node.received_with_tag("Init").is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        timeout(WAIT, runner).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serves_the_snapshot_while_the_socket_is_down() {
        let snapshot = json!({
            "ef#0": { "address": "addr_test1alice", "value": { "lovelace": 5 } }
        });
        let live = json!({
            "ef#1": { "address": "addr_test1alice", "value": { "lovelace": 6 } }
        });
        let node = MockHeadNode::start_with(
            Some(mock::greetings("Open", Some(snapshot))),
            move |msg| match mock::tag_of(msg).as_deref() {
                Some("GetUTxO") => vec![mock::utxo_response(live.clone())],
                _ => vec![],
            },
        )
        .await
        .unwrap();
        let client = HeadClient::new(
            HeadClientConfig::new(&node.host()).with_reconnect_backoff(Duration::from_secs(60)),
        );
        let engine = HeadEngine::new(
            client,
            Arc::new(MockLedger::default()),
            StubCommit::new(1),
            vec![],
            PaymentKey::from_bytes(&SEED),
            Network::Testnet,
            HeadEngineConfig::default(),
        );

        let outcome = timeout(WAIT, engine.start()).await.unwrap().unwrap();
        assert_eq!(outcome, StartOutcome::HeadActive(HeadStatus::Open));
        let fetched = timeout(WAIT, engine.fetch_utxos()).await.unwrap().unwrap();
        assert_eq!(fetched[0].input, TxIn::new("ef", 1));

        node.drop_connections();
        timeout(WAIT, async {
            while engine.client().is_connected() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(engine.client().status(), HeadStatus::Open);

        let alice = engine
            .fetch_address_utxos("addr_test1alice", None)
            .await
            .unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(node.received_with_tag("GetUTxO").len(), 1);
    }

    #[tokio::test]
    async fn forgets_the_oldest_confirmations_past_capacity() {
        let config = HeadEngineConfig::default().with_confirmed_capacity(2);
        let f = fixture_with(Some("Open"), false, vec![], config).await;
        timeout(WAIT, f.engine.start()).await.unwrap().unwrap();

        f.node
            .push(mock::snapshot_confirmed(json!({}), &["h1", "h2", "h3"]));
        timeout(WAIT, async {
            while !f.engine.is_confirmed("h3") {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(!f.engine.is_confirmed("h1"));
        assert!(f.engine.is_confirmed("h2"));
    }

    #[test]
    fn recent_hashes_evict_in_insertion_order() {
        let mut recent = RecentHashes::new(2);
        recent.insert("a".into());
        recent.insert("b".into());
        recent.insert("a".into());
        recent.insert("c".into());

        assert!(!recent.contains("a"));
        assert!(recent.contains("b"));
        assert!(recent.contains("c"));

        let mut none = RecentHashes::new(0);
        none.insert("a".into());
        assert!(!none.contains("a"));
    }
}
