//! Builds every service of the node from the params and config and spawns them.

use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use hydra_bridge_db::persistent::sqlite::SqliteDb;
use hydra_bridge_engine::{
    config::{BridgeConfig, WrappedAsset},
    engine::BridgeEngine,
    processor::BridgeKeys,
    tx_builder::RemoteTxBuilder,
};
use hydra_bridge_indexer::{config::IndexerConfig, poller::KupoPoller};
use hydra_bridge_l1::{blockfrost::BlockfrostClient, config::L1ClientConfig};
use hydra_bridge_primitives::{keys::PaymentKey, ledger::Ledger};
use hydra_head_client::{client::HeadClient, config::HeadClientConfig};
use hydra_head_engine::{
    commit::{CommitClient, HttpCommitClient},
    config::HeadEngineConfig,
    engine::HeadEngine,
};
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{config::Config, constants::DB_FILE_NAME, http_server, params::Params};

fn parse_key(name: &str, hex: &str) -> anyhow::Result<PaymentKey> {
    PaymentKey::from_str(hex).with_context(|| format!("invalid {name} key"))
}

fn head_client_config(config: &Config) -> HeadClientConfig {
    let head = &config.head;
    let mut client = HeadClientConfig::new(&head.host);
    if let Some(url) = &head.ws_url {
        client = client.with_url(url);
    }
    if let Some(backoff) = head.reconnect_backoff {
        client = client.with_reconnect_backoff(backoff);
    }
    if let Some(timeout) = head.request_timeout {
        client = client.with_request_timeout(timeout);
    }
    client
}

fn head_engine_config(params: &Params, config: &Config) -> HeadEngineConfig {
    let head = &config.head;
    let defaults = HeadEngineConfig::default();
    HeadEngineConfig {
        contestation_period: params.contestation_period,
        start_retry_delay: head.start_retry_delay.unwrap_or(defaults.start_retry_delay),
        no_funds_retry_delay: head
            .no_funds_retry_delay
            .unwrap_or(defaults.no_funds_retry_delay),
        greeting_timeout: head.greeting_timeout.unwrap_or(defaults.greeting_timeout),
        confirmed_capacity: defaults.confirmed_capacity,
    }
}

fn bridge_config(params: &Params, config: &Config) -> BridgeConfig {
    let bridge = &config.bridge;
    let wrapped = WrappedAsset::new(&params.wrapped.policy_id, &params.wrapped.asset_name);
    let mut out = BridgeConfig::new(params.network, wrapped, &bridge.treasury_address)
        .with_bridge_fee(params.bridge_fee)
        .with_mint_outputs(params.mint_outputs.clone());

    if let Some(interval) = bridge.processor_interval {
        out = out.with_processor_interval(interval);
    }
    if bridge.confirmation_timeout.is_some() || bridge.confirmation_poll_interval.is_some() {
        let defaults = BridgeConfig::new(params.network, params.wrapped.clone(), "");
        out = out.with_confirmation(
            bridge
                .confirmation_timeout
                .unwrap_or(defaults.confirmation_timeout()),
            bridge
                .confirmation_poll_interval
                .unwrap_or(defaults.confirmation_poll_interval()),
        );
    }
    out
}

/// Connects to every collaborator and spawns the node's long-running tasks.
///
/// The tasks stop once `cancel` fires.
pub(crate) async fn bootstrap(
    params: Params,
    config: Config,
    cancel: CancellationToken,
) -> anyhow::Result<JoinSet<()>> {
    let funding = parse_key("funding", &config.keys.funding)?;
    let keys = BridgeKeys {
        head_wallet: parse_key("head wallet", &config.keys.head_wallet)?,
        treasury: parse_key("treasury", &config.keys.treasury)?,
    };

    tokio::fs::create_dir_all(&config.datadir)
        .await
        .with_context(|| format!("could not create {}", config.datadir.display()))?;
    let db_url = format!("sqlite://{}", config.datadir.join(DB_FILE_NAME).display());
    let db = SqliteDb::connect(&db_url, config.db.clone())
        .await
        .context("could not open the operation database")?;
    info!(%db_url, "database connected");

    let mut l1_config = L1ClientConfig::new(&config.l1.url, &config.l1.project_id);
    if let Some(page_size) = config.l1.page_size {
        l1_config = l1_config.with_page_size(page_size);
    }
    let l1: Arc<dyn Ledger> = Arc::new(BlockfrostClient::new(l1_config));

    let peers = config
        .head
        .peers
        .iter()
        .map(|url| Arc::new(HttpCommitClient::new(url)) as Arc<dyn CommitClient>)
        .collect();
    let head = HeadEngine::new(
        HeadClient::new(head_client_config(&config)),
        l1.clone(),
        Arc::new(HttpCommitClient::new(&config.head.api_url)),
        peers,
        funding,
        params.network,
        head_engine_config(&params, &config),
    );
    info!(funding = %head.funding_address()?, "head engine ready");

    let mut indexer_config =
        IndexerConfig::new(&config.indexer.url).with_pattern(&config.indexer.pattern);
    if let Some(interval) = config.indexer.poll_interval {
        indexer_config = indexer_config.with_poll_interval(interval);
    }
    let poller = KupoPoller::new(indexer_config);

    let bridge = Arc::new(BridgeEngine::new(
        Arc::new(db),
        l1,
        Arc::new(head.clone()),
        Arc::new(RemoteTxBuilder::new(&config.tx_builder.url)),
        keys,
        bridge_config(&params, &config),
    ));

    let listener = TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("could not bind {}", config.http_addr))?;

    // subscribe before anything runs so no event is missed
    let deposits = poller.subscribe();
    let head_events = head.subscribe();

    let mut tasks = JoinSet::new();
    tasks.spawn({
        let (head, cancel) = (head.clone(), cancel.clone());
        async move { head.run(cancel).await }
    });
    tasks.spawn({
        let cancel = cancel.clone();
        async move { poller.run(cancel).await }
    });
    tasks.spawn({
        let (bridge, cancel) = (bridge.clone(), cancel.clone());
        async move { bridge.run(deposits, head_events, cancel).await }
    });
    tasks.spawn(async move {
        if let Err(e) = http_server::serve(listener, Arc::new(head), bridge, cancel).await {
            error!(%e, "http server failed");
        }
    });

    Ok(tasks)
}
