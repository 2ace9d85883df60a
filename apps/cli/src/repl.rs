//! Interactive command loop.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use udpfetch_client::{TransferClient, TransferError, Transport};

const HELP: &str = "Available commands: 'index' or 'get <filename>' or 'exit'";

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Index,
    Get(String),
    Help,
    Exit,
    Empty,
    Unknown(String),
}

impl Input {
    /// Parses a line. Verbs are case-insensitive; everything after `get`
    /// is the resource name, so names may contain spaces.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "index" if rest.is_empty() => Input::Index,
            "get" if !rest.is_empty() => Input::Get(rest.to_string()),
            "help" => Input::Help,
            "exit" => Input::Exit,
            _ => Input::Unknown(line.to_string()),
        }
    }
}

/// Reads commands from stdin until `exit` or end of input.
pub async fn run<T: Transport>(
    client: &mut TransferClient<T>,
    download_dir: Option<&Path>,
) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nEnter command: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Index => show_index(client).await,
            Input::Get(name) => get(client, &name, download_dir).await,
            Input::Help => println!("{HELP}"),
            Input::Exit => break,
            Input::Empty => {}
            Input::Unknown(line) => {
                tracing::debug!(%line, "unrecognized input");
                println!("[Warning] Unexpected command");
            }
        }
    }

    Ok(())
}

async fn show_index<T: Transport>(client: &mut TransferClient<T>) {
    match client.list().await {
        Ok(names) => {
            println!("--- Files on Server ---");
            for name in names {
                println!("{name}");
            }
        }
        Err(e) => report(&e),
    }
}

async fn get<T: Transport>(
    client: &mut TransferClient<T>,
    name: &str,
    download_dir: Option<&Path>,
) {
    let data = match client.get(name).await {
        Ok(data) => data,
        Err(e) => {
            report(&e);
            return;
        }
    };

    let Some(dir) = download_dir else {
        println!("--- {name} ({} bytes) ---", data.len());
        println!("{}", String::from_utf8_lossy(&data));
        return;
    };

    match save(dir, name, &data) {
        Ok(path) => println!("Saved {} bytes to {}", data.len(), path.display()),
        Err(e) => println!("[Error] could not save {name}: {e}"),
    }
}

/// Writes a downloaded resource into `dir`, refusing names that would land
/// outside it.
fn save(dir: &Path, name: &str, data: &[u8]) -> anyhow::Result<PathBuf> {
    let file_name = Path::new(name)
        .file_name()
        .filter(|file_name| *file_name == name)
        .ok_or_else(|| anyhow::anyhow!("unsafe file name {name:?}"))?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, data)?;
    Ok(path)
}

fn report(error: &TransferError) {
    match error {
        TransferError::NotFound(name) => println!("[Error] File not found: {name}"),
        TransferError::MetadataTimeout { .. } | TransferError::ChunkTimeout { .. } => {
            tracing::warn!("{error}");
            println!("[Error] Server timed out: {error}");
        }
        TransferError::Io(e) => {
            tracing::error!("transport failure: {e}");
            println!("[Error] {e}");
        }
    }
}
