//! udpfetch interactive client entry point.

mod config;
mod repl;

use tracing_subscriber::EnvFilter;
use udpfetch_client::{TransferClient, UdpTransport};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load()?;
    tracing::debug!(
        server = %config.server_address,
        port = config.port,
        "configuration loaded"
    );

    // One request in flight at a time; no need for worker threads.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let transport = UdpTransport::resolve(&config.server_address, config.port).await?;
        tracing::info!(
            server = %transport.server_addr(),
            local = %transport.local_addr()?,
            "client ready"
        );

        let mut client = TransferClient::new(transport, config.client_options());
        repl::run(&mut client, config.download_dir.as_deref()).await
    })
}
