//! Server configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/udpfetch/server.toml`
//! - Windows: `%APPDATA%/udpfetch/server.toml`

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use udpfetch_protocol::DEFAULT_PORT;
use udpfetch_server::{FaultConfig, ServerConfig};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local address to bind.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// UDP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Concurrent request handlers (0 = available parallelism).
    #[serde(default)]
    pub workers: usize,

    /// Probability of dropping a chunk reply, for testing client retries.
    #[serde(default)]
    pub loss_rate: f64,

    /// Delay before each chunk reply in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            workers: 0,
            loss_rate: 0.0,
            delay_ms: 0,
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Converts into the server's runtime configuration.
    pub fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind_address {:?}: {e}", self.bind_address))?;

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(ip, self.port),
            workers: self.workers,
            faults: FaultConfig {
                loss_rate: self.loss_rate,
                delay: Duration::from_millis(self.delay_ms),
            },
        })
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("udpfetch")
            .join("server.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("udpfetch").join("server.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/udpfetch/server.toml"))
    }
}
