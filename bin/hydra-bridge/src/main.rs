//! The hydra bridge node moves lovelace between Cardano and a Hydra head.

use std::{fmt, fs, path::Path};

use anyhow::Context;
use clap::Parser;
use config::Config;
use constants::{DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_THREAD_COUNT};
use hydra_bridge_common::logging::{self, LoggerConfig};
use params::Params;
use serde::de::DeserializeOwned;
use tokio::{runtime, task::JoinSet, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

mod args;
mod bootstrap;
mod config;
mod http_server;
mod params;

mod constants;

fn main() -> anyhow::Result<()> {
    let mut logger = LoggerConfig::with_base_name("hydra-bridge");
    if let Some(url) = logging::get_otlp_url_from_env() {
        logger.set_otlp_url(url);
    }
    logging::init(logger);

    let cli = args::Cli::parse();
    info!(params = ?cli.params, config = ?cli.config, "starting bridge node");

    let params = parse_toml::<Params>(&cli.params)?;
    let config = parse_toml::<Config>(&cli.config)?;

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .context("could not create runtime")?;

    runtime.block_on(run(params, config))?;

    info!("bridge node shutdown complete");
    Ok(())
}

async fn run(params: Params, config: Config) -> anyhow::Result<()> {
    let shutdown_timeout = config.shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
    let cancel = CancellationToken::new();
    let mut tasks = bootstrap::bootstrap(params, config, cancel.clone()).await?;

    shutdown_signal().await?;
    info!("shutdown requested");
    cancel.cancel();

    drain(&mut tasks, shutdown_timeout).await;
    Ok(())
}

async fn drain(tasks: &mut JoinSet<()>, timeout: std::time::Duration) {
    let drained = time::timeout(timeout, async {
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                warn!(%e, "task ended abnormally");
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(?timeout, remaining = tasks.len(), "tasks did not stop in time, aborting");
        tasks.abort_all();
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).context("could not listen for SIGTERM")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("could not listen for Ctrl-C")?,
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("could not listen for Ctrl-C")?;

    Ok(())
}

/// Reads and parses a TOML file from the given path into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> anyhow::Result<T>
where
    T: fmt::Debug + DeserializeOwned,
{
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read TOML file {}", path.display()))?;
    trace!(?path, bytes = raw.len(), "read file");

    let parsed = toml::from_str::<T>(&raw)
        .with_context(|| format!("failed to parse TOML file {}", path.display()))?;
    debug!(?parsed, "parsed TOML file");

    Ok(parsed)
}
