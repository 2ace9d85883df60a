//! udpfetch server daemon entry point.

mod app;
mod config;

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(root) = std::env::args_os().nth(1).map(PathBuf::from) else {
        anyhow::bail!("usage: udpfetchd <root-dir>");
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %root.display(),
        "starting udpfetch server"
    );

    let config = config::Config::load()?;
    tracing::info!(port = config.port, workers = config.workers, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, root))?;

    tracing::info!("server shut down cleanly");
    Ok(())
}
