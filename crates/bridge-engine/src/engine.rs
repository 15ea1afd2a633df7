//! Wires detection and processing to the ledgers' event feeds.

use std::{fmt, sync::Arc};

use hydra_bridge_db::operations::OperationDb;
use hydra_bridge_primitives::{
    ledger::Ledger,
    operation::{BridgeOperation, LedgerKind, NewBridgeOperation},
    subscription::Subscription,
    tx::Transaction,
    types::Utxo,
};
use hydra_head_client::event::HeadEvent;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::BridgeConfig,
    detector::{detect_burn, detect_deposit},
    errors::BridgeError,
    processor::{BridgeKeys, Processor},
    tx_builder::TxBuilder,
};

/// Records bridge operations as they appear on either ledger and processes them.
pub struct BridgeEngine {
    db: Arc<dyn OperationDb>,
    config: BridgeConfig,
    processor: Processor,
}

impl fmt::Debug for BridgeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeEngine")
            .field("config", &self.config)
            .field("processor", &self.processor)
            .finish_non_exhaustive()
    }
}

impl BridgeEngine {
    /// Creates an engine. `l1` is the base ledger and `l2` the head.
    pub fn new(
        db: Arc<dyn OperationDb>,
        l1: Arc<dyn Ledger>,
        l2: Arc<dyn Ledger>,
        builder: Arc<dyn TxBuilder>,
        keys: BridgeKeys,
        config: BridgeConfig,
    ) -> Self {
        let processor = Processor::new(db.clone(), l1, l2, builder, keys, config.clone());
        Self {
            db,
            config,
            processor,
        }
    }

    /// The processor driving recorded operations.
    pub const fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Looks up a recorded operation.
    pub async fn operation(&self, id: i64) -> Result<Option<BridgeOperation>, BridgeError> {
        Ok(self.db.get_operation(id).await?)
    }

    /// Records a deposit for every new valid output in `utxos`.
    ///
    /// `utxos` is the full unspent set at the bridge address, so outputs already recorded are
    /// skipped. Every output is attempted; if any could not be recorded the first error is
    /// returned once the rest are done. Returns the operations created.
    pub async fn record_deposits(
        &self,
        utxos: &[Utxo],
    ) -> Result<Vec<BridgeOperation>, BridgeError> {
        let mut created = Vec::new();
        let mut failure = None;

        for utxo in utxos {
            match self.record_deposit(utxo).await {
                Ok(op) => created.extend(op),
                Err(e) => {
                    warn!(input = %utxo.input, %e, "could not record deposit");
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(created),
        }
    }

    async fn record_deposit(&self, utxo: &Utxo) -> Result<Option<BridgeOperation>, BridgeError> {
        let known = self
            .db
            .find_by_origin(
                LedgerKind::Cardano,
                &utxo.input.tx_hash,
                utxo.input.output_index,
            )
            .await?;
        if known.is_some() {
            return Ok(None);
        }

        match detect_deposit(utxo) {
            Ok(deposit) => self.record(deposit).await,
            Err(e) => {
                debug!(input = %utxo.input, %e, "ignoring output at the bridge address");
                Ok(None)
            }
        }
    }

    /// Records a release if the head transaction `cbor` burns the wrapped asset.
    pub async fn record_head_transaction(
        &self,
        cbor: &[u8],
    ) -> Result<Option<BridgeOperation>, BridgeError> {
        let tx = Transaction::decode(cbor.to_vec())?;

        match detect_burn(&tx, self.config.wrapped(), self.config.network()) {
            Ok(Some(burn)) => self.record(burn).await,
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(tx_hash = %tx.hash(), %e, "ignoring malformed burn");
                Ok(None)
            }
        }
    }

    async fn record(&self, op: NewBridgeOperation) -> Result<Option<BridgeOperation>, BridgeError> {
        let created = self.db.create_operation(&op).await?;
        match &created {
            Some(op) => info!(
                id = %op.id,
                origin = %op.origin,
                origin_tx = %op.origin_tx_hash,
                destination = %op.destination_address,
                "recorded bridge operation"
            ),
            None => debug!(origin_tx = %op.origin_tx_hash, "bridge operation already recorded"),
        }
        Ok(created)
    }

    /// Consumes both feeds and runs the processor until `cancel` fires or a feed closes.
    ///
    /// The deposit feed only publishes when the unspent set changes, so a set that could not be
    /// fully recorded is rescanned every processor interval until it is. Head transactions that
    /// hit a store error are retried on the same schedule.
    pub async fn run(
        &self,
        mut deposits: Subscription<Vec<Utxo>>,
        mut head: Subscription<HeadEvent>,
        cancel: CancellationToken,
    ) {
        let events = async {
            let mut unrecorded: Option<Vec<Utxo>> = None;
            let mut burns: Vec<Vec<u8>> = Vec::new();

            loop {
                let retry = unrecorded.is_some() || !burns.is_empty();
                tokio::select! {
                    utxos = deposits.recv() => {
                        let Some(utxos) = utxos else { break };
                        unrecorded = self.scan_deposits(utxos).await;
                    }
                    event = head.recv() => match event {
                        Some(HeadEvent::Transaction { cbor, .. }) => {
                            if !self.scan_head_transaction(&cbor).await {
                                burns.push(cbor);
                            }
                        }
                        Some(_) => {}
                        None => break,
                    },
                    _ = tokio::time::sleep(self.config.processor_interval), if retry => {
                        if let Some(utxos) = unrecorded.take() {
                            unrecorded = self.scan_deposits(utxos).await;
                        }
                        let mut retried = Vec::with_capacity(burns.len());
                        for cbor in burns.drain(..) {
                            if !self.scan_head_transaction(&cbor).await {
                                retried.push(cbor);
                            }
                        }
                        burns = retried;
                    }
                }
            }
            warn!("bridge event feed closed");
        };

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = events => {}
            _ = self.processor.run(cancel.clone()) => {}
        }

        info!("bridge engine stopped");
    }

    /// Hands `utxos` back if part of the set still has to be recorded.
    async fn scan_deposits(&self, utxos: Vec<Utxo>) -> Option<Vec<Utxo>> {
        match self.record_deposits(&utxos).await {
            Ok(_) => None,
            Err(e) => {
                warn!(%e, "could not record every deposit, rescanning later");
                Some(utxos)
            }
        }
    }

    /// Returns `false` if recording should be retried.
    async fn scan_head_transaction(&self, cbor: &[u8]) -> bool {
        match self.record_head_transaction(cbor).await {
            Ok(_) => true,
            Err(e @ BridgeError::Db(_)) => {
                warn!(%e, "could not record head transaction, retrying later");
                false
            }
            Err(e) => {
                warn!(%e, "could not record head transaction");
                true
            }
        }
    }
}
