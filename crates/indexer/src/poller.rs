//! Periodic polling of the indexer.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use hydra_bridge_primitives::{
    subscription::{EventBus, Subscription},
    types::Utxo,
};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::IndexerConfig,
    errors::IndexerError,
    kupo::{KupoClient, Match},
};

#[derive(Debug, Default)]
struct Snapshot {
    matches: Vec<Match>,
    utxos: Vec<Utxo>,
}

#[derive(Debug)]
struct Inner {
    client: KupoClient,
    config: IndexerConfig,
    snapshot: Mutex<Snapshot>,
    datums: Mutex<HashMap<String, String>>,
    bus: EventBus<Vec<Utxo>>,
}

impl Inner {
    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn datums(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.datums.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Polls the indexer and publishes the full list of unspent matches each time it changes.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct KupoPoller {
    inner: Arc<Inner>,
}

impl KupoPoller {
    /// Creates a poller. Nothing is fetched until [`KupoPoller::poll_once`] or
    /// [`KupoPoller::run`].
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: KupoClient::new(config.url()),
                config,
                snapshot: Mutex::new(Snapshot::default()),
                datums: Mutex::new(HashMap::new()),
                bus: EventBus::new(),
            }),
        }
    }

    /// Subscribes to changes of the unspent set.
    pub fn subscribe(&self) -> Subscription<Vec<Utxo>> {
        self.inner.bus.subscribe()
    }

    /// The unspent set as of the last successful poll.
    pub fn utxos(&self) -> Vec<Utxo> {
        self.inner.snapshot().utxos.clone()
    }

    /// Fetches the matches once. Returns whether they changed, in which case subscribers were
    /// notified.
    pub async fn poll_once(&self) -> Result<bool, IndexerError> {
        let matches: Vec<Match> = self
            .inner
            .client
            .unspent_matches(self.inner.config.pattern())
            .await?
            .into_iter()
            .filter(|m| m.spent_at.is_none())
            .collect();

        let unchanged = self.inner.snapshot().matches == matches;
        if unchanged {
            return Ok(false);
        }

        let mut utxos = Vec::with_capacity(matches.len());
        for m in matches.iter().cloned() {
            let datum = match m.datum_hash.as_deref() {
                Some(hash) if m.has_inline_datum() => self.resolve_datum(hash).await?,
                _ => None,
            };
            utxos.push(m.into_utxo(datum));
        }

        // datums are only kept for outputs that are still unspent
        let live: HashSet<&str> = matches
            .iter()
            .filter_map(|m| m.datum_hash.as_deref())
            .collect();
        self.inner.datums().retain(|hash, _| live.contains(hash.as_str()));

        debug!(count = utxos.len(), "indexer matches changed");
        *self.inner.snapshot() = Snapshot {
            matches,
            utxos: utxos.clone(),
        };
        self.inner.bus.publish(utxos);

        Ok(true)
    }

    /// Polls on the configured interval until `cancel` fires. Failed polls are logged and retried
    /// on the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = time::interval(self.inner.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(url = %self.inner.config.url(), pattern = %self.inner.config.pattern(), "polling indexer");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if let Err(e) = self.poll_once().await {
                warn!(%e, "indexer poll failed");
            }
        }

        info!("indexer poller stopped");
    }

    async fn resolve_datum(&self, hash: &str) -> Result<Option<String>, IndexerError> {
        let cached = self.inner.datums().get(hash).cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let datum = self.inner.client.datum(hash).await?;
        if let Some(datum) = &datum {
            self.inner.datums().insert(hash.to_string(), datum.clone());
        }

        Ok(datum)
    }
}
