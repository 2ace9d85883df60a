//! Client configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/udpfetch/client.toml`
//! - Windows: `%APPDATA%/udpfetch/client.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use udpfetch_client::ClientOptions;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server host name or IP address.
    #[serde(default = "default_server_address")]
    pub server_address: String,

    /// Server UDP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Receive timeout per attempt in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Send attempts per request before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Where `get` saves files. Unset prints content to the console.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

fn default_server_address() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    udpfetch_protocol::DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    ClientOptions::default().timeout.as_millis() as u64
}

fn default_max_retries() -> u32 {
    ClientOptions::default().max_retries
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            download_dir: None,
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

    /// Retry and timeout policy for the transfer engine.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
        }
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
            .join("client.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("udpfetch").join("client.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/udpfetch/client.toml"))
    }
}
