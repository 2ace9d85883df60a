//! Wires the directory store to the UDP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use udpfetch_server::UdpFetchServer;
use udpfetch_store::DirectoryStore;

use crate::config::Config;

/// Serves `root` until Ctrl+C.
pub async fn run(config: Config, root: PathBuf) -> anyhow::Result<()> {
    let store = DirectoryStore::new(&root)
        .with_context(|| format!("cannot serve {}", root.display()))?;
    tracing::info!(root = %store.root().display(), "serving directory");

    let server = UdpFetchServer::bind(config.server_config()?, Arc::new(store)).await?;
    let stats = server.stats();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C: {e}"),
        }
    });

    server.run(cancel).await?;
    tracing::info!(
        received = stats.received(),
        peak_active = stats.peak_active(),
        "request totals"
    );
    Ok(())
}
