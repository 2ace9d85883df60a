//! End-to-end transfers over real UDP sockets on loopback.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use udpfetch_client::{ClientOptions, TransferClient, TransferError, UdpTransport};
use udpfetch_server::{FaultConfig, ServerConfig, UdpFetchServer};
use udpfetch_store::DirectoryStore;

struct Fixture {
    _dir: tempfile::TempDir,
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Fixture {
    async fn start(files: &[(&str, Vec<u8>)], faults: FaultConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, data) in files {
            std::fs::write(dir.path().join(name), data).unwrap();
        }
        let store = DirectoryStore::new(dir.path()).unwrap();

        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            workers: 4,
            faults,
        };
        let server = UdpFetchServer::bind(config, Arc::new(store)).await.unwrap();
        let addr = server.local_addr().unwrap();

        let cancel = CancellationToken::new();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            server.run(run_cancel).await.unwrap();
        });

        Self {
            _dir: dir,
            addr,
            cancel,
            handle,
        }
    }

    async fn client(&self, options: ClientOptions) -> TransferClient<UdpTransport> {
        let transport = UdpTransport::connect(self.addr).await.unwrap();
        TransferClient::new(transport, options)
    }

    async fn stop(self) {
        self.cancel.cancel();
        self.handle.await.unwrap();
    }
}

fn quick() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_millis(200),
        ..ClientOptions::default()
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

#[tokio::test]
async fn downloads_and_lists_directory() {
    let a = pattern(2500);
    let fixture = Fixture::start(
        &[("a.txt", a.clone()), ("b.txt", Vec::new())],
        FaultConfig::default(),
    )
    .await;
    let mut client = fixture.client(quick()).await;

    assert_eq!(client.get("a.txt").await.unwrap(), a);
    assert!(client.get("b.txt").await.unwrap().is_empty());
    assert_eq!(client.list().await.unwrap(), ["a.txt", "b.txt"]);

    fixture.stop().await;
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let fixture = Fixture::start(&[("a.txt", pattern(10))], FaultConfig::default()).await;
    let mut client = fixture.client(quick()).await;

    let err = client.get("missing.txt").await.unwrap_err();
    assert!(matches!(err, TransferError::NotFound(_)));

    let err = client.get("../a.txt").await.unwrap_err();
    assert!(matches!(err, TransferError::NotFound(_)));

    fixture.stop().await;
}

#[tokio::test]
async fn recovers_from_lossy_server() {
    let data = pattern(20 * 1024 + 17);
    let fixture = Fixture::start(
        &[("big.bin", data.clone())],
        FaultConfig {
            loss_rate: 0.3,
            ..FaultConfig::default()
        },
    )
    .await;
    let mut client = fixture
        .client(ClientOptions {
            timeout: Duration::from_millis(50),
            max_retries: 30,
        })
        .await;

    assert_eq!(client.get("big.bin").await.unwrap(), data);

    fixture.stop().await;
}

#[tokio::test]
async fn concurrent_clients_get_identical_bytes() {
    let data = pattern(8 * 1024 + 3);
    let fixture = Fixture::start(&[("shared.bin", data.clone())], FaultConfig::default()).await;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let mut client = fixture.client(quick()).await;
        tasks.push(tokio::spawn(async move {
            client.get("shared.bin").await.unwrap()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), data);
    }

    fixture.stop().await;
}

#[tokio::test]
async fn unreachable_server_times_out() {
    // Bind and drop to get a port nothing listens on.
    let addr = {
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.local_addr().unwrap()
    };
    let transport = UdpTransport::connect(addr).await.unwrap();
    let mut client = TransferClient::new(
        transport,
        ClientOptions {
            timeout: Duration::from_millis(50),
            max_retries: 2,
        },
    );

    let err = client.get("a.txt").await.unwrap_err();
    assert!(matches!(
        err,
        TransferError::MetadataTimeout { attempts: 2, .. }
    ));
}
