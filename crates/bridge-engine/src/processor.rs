//! Drives pending bridge operations to completion.
//!
//! Each tick picks up every `Pending` operation and processes them concurrently. An operation
//! follows `Pending -> Processing -> Submitting -> Submitted -> Confirmed`; any error on the way
//! moves it to `Failed` without affecting the others.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::future::join_all;
use hydra_bridge_db::operations::OperationDb;
use hydra_bridge_primitives::{
    keys::PaymentKey,
    ledger::Ledger,
    operation::{BridgeOperation, LedgerKind, OperationState},
    tx::Transaction,
    types::{lovelace_of, Asset, TxOut},
};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    coin_selection::select_largest_first,
    config::BridgeConfig,
    errors::BridgeError,
    tx_builder::{MintRequest, ReleaseRequest, TxBuilder},
};

/// Output of the destination transaction that pays the recipient.
const RECIPIENT_OUTPUT_INDEX: u32 = 0;

/// Signing keys of the bridge operator.
#[derive(Debug, Clone)]
pub struct BridgeKeys {
    /// Owns the head wallet that funds mints.
    pub head_wallet: PaymentKey,

    /// Controls the L1 treasury that pays releases.
    pub treasury: PaymentKey,
}

/// Releases the tick guard when a tick ends, however it ends.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Processes pending operations against both ledgers.
pub struct Processor {
    db: Arc<dyn OperationDb>,
    l1: Arc<dyn Ledger>,
    l2: Arc<dyn Ledger>,
    builder: Arc<dyn TxBuilder>,
    keys: BridgeKeys,
    config: BridgeConfig,
    running: AtomicBool,
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("builder", &self.builder)
            .field("keys", &self.keys)
            .field("config", &self.config)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Processor {
    /// Creates a processor. `l2` is the head, `l1` the base ledger.
    pub fn new(
        db: Arc<dyn OperationDb>,
        l1: Arc<dyn Ledger>,
        l2: Arc<dyn Ledger>,
        builder: Arc<dyn TxBuilder>,
        keys: BridgeKeys,
        config: BridgeConfig,
    ) -> Self {
        Self {
            db,
            l1,
            l2,
            builder,
            keys,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Processes every pending operation once.
    ///
    /// Returns `None` without doing anything if the previous tick is still running, otherwise the
    /// final state of each operation picked up.
    pub async fn tick(&self) -> Option<Vec<(i64, OperationState)>> {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("previous tick still running, skipping");
            return None;
        }
        let _guard = TickGuard(&self.running);

        let pending = match self.db.operations_in_state(OperationState::Pending).await {
            Ok(pending) => pending,
            Err(e) => {
                error!(%e, "could not load pending operations");
                return Some(Vec::new());
            }
        };
        if !pending.is_empty() {
            info!(count = pending.len(), "processing pending operations");
        }

        let results = join_all(pending.into_iter().map(|op| async move {
            let id = op.id;
            (id, self.process(op).await)
        }))
        .await;

        Some(results)
    }

    /// Ticks on the configured interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = time::interval(self.config.processor_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.tick() => {}
            }
        }

        info!("bridge processor stopped");
    }

    /// Runs one operation to a terminal state and returns it.
    async fn process(&self, op: BridgeOperation) -> OperationState {
        let id = op.id;
        match self.drive(op).await {
            Ok(()) => {
                info!(%id, "bridge operation confirmed");
                OperationState::Confirmed
            }
            Err(e) => {
                error!(%id, %e, "bridge operation failed");
                if let Err(e) = self.db.update_state(id, OperationState::Failed).await {
                    warn!(%id, %e, "could not record failure");
                }
                OperationState::Failed
            }
        }
    }

    async fn drive(&self, op: BridgeOperation) -> Result<(), BridgeError> {
        self.db
            .update_state(op.id, OperationState::Processing)
            .await?;

        let (ledger, unsigned, key) = match op.origin {
            LedgerKind::Cardano => (
                &self.l2,
                self.build_mint(&op).await?,
                &self.keys.head_wallet,
            ),
            LedgerKind::Hydra => (
                &self.l1,
                self.build_release(&op).await?,
                &self.keys.treasury,
            ),
        };

        self.db
            .update_state(op.id, OperationState::Submitting)
            .await?;
        let signed = Transaction::decode(unsigned)?.sign(key)?;
        let tx_hash = ledger.submit_tx(&signed).await?;
        info!(id = %op.id, %tx_hash, destination = %op.destination, "submitted bridge transaction");

        self.db
            .mark_submitted(op.id, &tx_hash, RECIPIENT_OUTPUT_INDEX)
            .await?;
        self.wait_for_confirmation(ledger.as_ref(), &tx_hash).await?;

        self.db
            .update_state(op.id, OperationState::Confirmed)
            .await?;
        Ok(())
    }

    async fn build_mint(&self, op: &BridgeOperation) -> Result<Vec<u8>, BridgeError> {
        let quantity = lovelace_of(&op.amount);
        if quantity == 0 {
            return Err(BridgeError::NoAmount(op.id));
        }

        let wallet = self
            .keys
            .head_wallet
            .enterprise_address(self.config.network)?
            .to_string();
        let utxos = self.l2.fetch_address_utxos(&wallet, None).await?;
        let collateral = utxos
            .iter()
            .find(|utxo| utxo.output.is_lovelace_only())
            .cloned()
            .ok_or_else(|| BridgeError::NoCollateral(wallet.clone()))?;

        let request = MintRequest {
            collateral,
            inputs: utxos,
            policy_id: self.config.wrapped.policy_id.clone(),
            asset_name: self.config.wrapped.asset_name.clone(),
            quantity,
            recipient: op.destination_address.clone(),
            extra_outputs: self
                .config
                .mint_outputs
                .iter()
                .map(|lovelace| {
                    TxOut::new(&op.destination_address, vec![Asset::lovelace(*lovelace)])
                })
                .collect(),
            change_address: wallet,
        };

        Ok(self.builder.build_mint(&request).await?)
    }

    async fn build_release(&self, op: &BridgeOperation) -> Result<Vec<u8>, BridgeError> {
        let amount = lovelace_of(&op.amount);
        let fee = self.config.bridge_fee;
        if amount <= fee {
            return Err(BridgeError::BelowFee { amount, fee });
        }
        let payout = amount - fee;

        let treasury = &self.config.treasury_address;
        let utxos = self.l1.fetch_address_utxos(treasury, None).await?;
        let inputs = select_largest_first(&utxos, payout)?;

        let request = ReleaseRequest {
            inputs,
            recipient: op.destination_address.clone(),
            amount: vec![Asset::lovelace(payout)],
            change_address: treasury.clone(),
            required_signer: hex::encode(self.keys.treasury.key_hash()),
        };

        Ok(self.builder.build_release(&request).await?)
    }

    /// Polls `ledger` until `tx_hash` is confirmed or the confirmation timeout expires.
    async fn wait_for_confirmation(
        &self,
        ledger: &dyn Ledger,
        tx_hash: &str,
    ) -> Result<(), BridgeError> {
        let poll = async {
            loop {
                match ledger.is_tx_confirmed(tx_hash).await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(e) => warn!(%tx_hash, %e, "confirmation check failed"),
                }
                time::sleep(self.config.confirmation_poll_interval).await;
            }
        };

        time::timeout(self.config.confirmation_timeout, poll)
            .await
            .map_err(|_| BridgeError::ConfirmationTimeout(tx_hash.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use hydra_bridge_db::inmemory::OperationsInMemory;
    use hydra_bridge_primitives::{
        address::Network,
        operation::NewBridgeOperation,
        test_utils::{MockLedger, TxFixture, POLICY, WRAPPED_ASSET},
        tx::tx_hash,
        types::{TxIn, Utxo},
    };

    use super::*;
    use crate::{config::WrappedAsset, errors::TxBuilderError};

    const TREASURY: &str = "addr_test1treasury";
    const RECIPIENT: &str = "addr_test1recipient";

    #[derive(Debug, Default)]
    struct StubBuilder {
        mints: Mutex<Vec<MintRequest>>,
        releases: Mutex<Vec<ReleaseRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl TxBuilder for StubBuilder {
        async fn build_mint(&self, request: &MintRequest) -> Result<Vec<u8>, TxBuilderError> {
            if self.fail {
                return Err(TxBuilderError::Status {
                    status: 500,
                    body: "boom".into(),
                });
            }
            let mut mints = self.mints.lock().unwrap();
            mints.push(request.clone());
            Ok(TxFixture::default().with_fee(mints.len() as u64).build())
        }

        async fn build_release(
            &self,
            request: &ReleaseRequest,
        ) -> Result<Vec<u8>, TxBuilderError> {
            let mut releases = self.releases.lock().unwrap();
            releases.push(request.clone());
            Ok(TxFixture::default()
                .with_fee(1_000 + releases.len() as u64)
                .build())
        }
    }

    struct Fixture {
        db: Arc<OperationsInMemory>,
        l1: Arc<MockLedger>,
        l2: Arc<MockLedger>,
        builder: Arc<StubBuilder>,
        keys: BridgeKeys,
    }

    impl Fixture {
        fn new(builder: StubBuilder) -> Self {
            let keys = BridgeKeys {
                head_wallet: PaymentKey::from_bytes(&[1; 32]),
                treasury: PaymentKey::from_bytes(&[2; 32]),
            };
            let wallet = keys
                .head_wallet
                .enterprise_address(Network::Testnet)
                .unwrap()
                .to_string();

            let l2 = MockLedger::with_utxos(vec![
                utxo(&wallet, 0, vec![Asset::lovelace(3), Asset::new("ff", 1)]),
                utxo(&wallet, 1, vec![Asset::lovelace(100_000_000)]),
            ]);
            let l1 = MockLedger::with_utxos(vec![
                utxo(TREASURY, 0, vec![Asset::lovelace(4_000_000)]),
                utxo(TREASURY, 1, vec![Asset::lovelace(30_000_000)]),
            ]);

            Self {
                db: Arc::new(OperationsInMemory::default()),
                l1: Arc::new(l1),
                l2: Arc::new(l2),
                builder: Arc::new(builder),
                keys,
            }
        }

        fn processor(&self) -> Processor {
            let config = BridgeConfig::new(
                Network::Testnet,
                WrappedAsset::new(POLICY, WRAPPED_ASSET),
                TREASURY,
            )
            .with_bridge_fee(1_000_000)
            .with_confirmation(Duration::from_secs(300), Duration::from_secs(5));

            Processor::new(
                self.db.clone(),
                self.l1.clone(),
                self.l2.clone(),
                self.builder.clone(),
                self.keys.clone(),
                config,
            )
        }

        async fn record(&self, origin: LedgerKind, tx: &str, lovelace: u64) -> i64 {
            self.db
                .create_operation(&NewBridgeOperation {
                    origin,
                    origin_address: "addr_test1sender".into(),
                    origin_tx_hash: tx.into(),
                    origin_output_index: 0,
                    amount: vec![Asset::lovelace(lovelace)],
                    destination_address: RECIPIENT.into(),
                })
                .await
                .unwrap()
                .unwrap()
                .id
        }

        async fn state(&self, id: i64) -> BridgeOperation {
            self.db.get_operation(id).await.unwrap().unwrap()
        }
    }

    fn utxo(address: &str, index: u32, amount: Vec<Asset>) -> Utxo {
        Utxo {
            input: TxIn::new("ee".repeat(32), index),
            output: TxOut::new(address, amount),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn deposits_are_minted_in_the_head() {
        let fx = Fixture::new(StubBuilder::default());
        fx.l2.confirm_on_submit(true);
        let id = fx.record(LedgerKind::Cardano, "abc", 10_000_000).await;

        let results = fx.processor().tick().await.unwrap();
        assert_eq!(results, vec![(id, OperationState::Confirmed)]);

        let mints = fx.builder.mints.lock().unwrap().clone();
        assert_eq!(mints.len(), 1);
        let mint = &mints[0];
        assert_eq!(mint.collateral.input.output_index, 1);
        assert_eq!(mint.quantity, 10_000_000);
        assert_eq!(mint.recipient, RECIPIENT);
        assert_eq!(mint.policy_id, POLICY);
        let extra: Vec<u64> = mint.extra_outputs.iter().map(TxOut::lovelace).collect();
        assert_eq!(extra, vec![20_000_000, 15_000_000, 5_000_000]);

        let submitted = fx.l2.submitted();
        assert_eq!(submitted.len(), 1);
        let tx = Transaction::decode(submitted[0].clone()).unwrap();
        assert_eq!(tx.first_vkey().unwrap(), Some(fx.keys.head_wallet.vkey()));
        assert!(fx.l1.submitted().is_empty());

        let op = fx.state(id).await;
        assert_eq!(op.state, OperationState::Confirmed);
        assert_eq!(op.destination_tx_hash, Some(tx_hash(&submitted[0]).unwrap()));
        assert_eq!(op.destination_output_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn burns_are_released_on_l1_minus_the_fee() {
        let fx = Fixture::new(StubBuilder::default());
        fx.l1.confirm_on_submit(true);
        let id = fx.record(LedgerKind::Hydra, "def", 25_000_000).await;

        let results = fx.processor().tick().await.unwrap();
        assert_eq!(results, vec![(id, OperationState::Confirmed)]);

        let release = fx.builder.releases.lock().unwrap()[0].clone();
        assert_eq!(release.amount, vec![Asset::lovelace(24_000_000)]);
        assert_eq!(release.change_address, TREASURY);
        assert_eq!(release.inputs.len(), 1);
        assert_eq!(release.inputs[0].input.output_index, 1);
        assert_eq!(
            release.required_signer,
            hex::encode(fx.keys.treasury.key_hash())
        );

        let signed = Transaction::decode(fx.l1.submitted()[0].clone()).unwrap();
        assert_eq!(signed.first_vkey().unwrap(), Some(fx.keys.treasury.vkey()));
        assert!(fx.l2.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_transactions_time_out() {
        let fx = Fixture::new(StubBuilder::default());
        let id = fx.record(LedgerKind::Cardano, "abc", 10_000_000).await;

        let results = fx.processor().tick().await.unwrap();
        assert_eq!(results, vec![(id, OperationState::Failed)]);

        let op = fx.state(id).await;
        assert_eq!(op.state, OperationState::Failed);
        assert!(op.destination_tx_hash.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_isolated_per_operation() {
        let fx = Fixture::new(StubBuilder::default());
        fx.l1.confirm_on_submit(true);
        let below_fee = fx.record(LedgerKind::Hydra, "small", 500_000).await;
        let too_large = fx.record(LedgerKind::Hydra, "large", 100_000_000).await;
        let fine = fx.record(LedgerKind::Hydra, "fine", 5_000_000).await;

        let results = fx.processor().tick().await.unwrap();
        assert_eq!(
            results,
            vec![
                (below_fee, OperationState::Failed),
                (too_large, OperationState::Failed),
                (fine, OperationState::Confirmed),
            ]
        );
        assert_eq!(fx.l1.submitted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_submissions_fail_the_operation() {
        let fx = Fixture::new(StubBuilder::default());
        fx.l2.reject_with(Some("BadInputsUTxO"));
        let id = fx.record(LedgerKind::Cardano, "abc", 10_000_000).await;

        fx.processor().tick().await.unwrap();
        let op = fx.state(id).await;
        assert_eq!(op.state, OperationState::Failed);
        assert_eq!(op.destination_tx_hash, None);
    }

    #[tokio::test(start_paused = true)]
    async fn builder_errors_fail_the_operation() {
        let fx = Fixture::new(StubBuilder {
            fail: true,
            ..Default::default()
        });
        let id = fx.record(LedgerKind::Cardano, "abc", 10_000_000).await;

        assert_eq!(
            fx.processor().tick().await.unwrap(),
            vec![(id, OperationState::Failed)]
        );
        assert!(fx.l2.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ticks_are_skipped() {
        let fx = Fixture::new(StubBuilder::default());
        fx.record(LedgerKind::Cardano, "abc", 10_000_000).await;
        let processor = fx.processor();

        // never confirms, so the first tick waits out the full timeout
        let (first, second) = tokio::join!(processor.tick(), async {
            time::sleep(Duration::from_secs(1)).await;
            processor.tick().await
        });
        assert_eq!(first.map(|r| r.len()), Some(1));
        assert_eq!(second, None);

        // the guard is released once the tick finishes
        assert_eq!(processor.tick().await, Some(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn operations_are_processed_once() {
        let fx = Fixture::new(StubBuilder::default());
        fx.l2.confirm_on_submit(true);
        fx.record(LedgerKind::Cardano, "abc", 10_000_000).await;
        let processor = fx.processor();

        assert_eq!(processor.tick().await.unwrap().len(), 1);
        assert_eq!(processor.tick().await, Some(vec![]));
        assert_eq!(fx.l2.submitted().len(), 1);
    }
}
