//! UDP receive loop and bounded worker pool.
//!
//! The receive loop only copies datagrams off the socket and never waits on
//! handler work; all parsing, store access and replying happens on workers.
//! Workers share the socket, the read-only dispatcher and the stats counters.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use udpfetch_protocol::{DEFAULT_PORT, RECV_BUFFER_SIZE};
use udpfetch_store::ResourceStore;

use crate::ServerError;
use crate::dispatch::{Dispatcher, Reply};
use crate::fault::{FaultConfig, FaultInjector};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (port 0 = OS-assigned).
    pub bind_addr: SocketAddr,
    /// Maximum requests handled concurrently (0 = available parallelism).
    pub workers: usize,
    /// Fault injection for chunk replies.
    pub faults: FaultConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            workers: 0,
            faults: FaultConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Worker count with `0` resolved to the available parallelism.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Counters shared by the receive loop and its handlers.
///
/// Cheap to clone; every clone observes the same server.
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    received: AtomicU64,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl ServerStats {
    /// Datagrams read off the socket.
    pub fn received(&self) -> u64 {
        self.inner.received.load(Ordering::Relaxed)
    }

    /// Handlers currently holding a worker slot.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    /// Highest number of handlers that ever held a worker slot at once.
    pub fn peak_active(&self) -> usize {
        self.inner.peak_active.load(Ordering::Relaxed)
    }

    fn record_received(&self) {
        self.inner.received.fetch_add(1, Ordering::Relaxed);
    }

    fn enter(&self) -> ActiveHandler {
        let now = self.inner.active.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.peak_active.fetch_max(now, Ordering::Relaxed);
        ActiveHandler(self.clone())
    }
}

/// Marks one handler as running until dropped.
struct ActiveHandler(ServerStats);

impl Drop for ActiveHandler {
    fn drop(&mut self) {
        self.0.inner.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A bound udpfetch server.
pub struct UdpFetchServer<S: ResourceStore> {
    socket: Arc<UdpSocket>,
    dispatcher: Dispatcher<S>,
    faults: FaultInjector,
    workers: usize,
    stats: ServerStats,
}

impl<S: ResourceStore> UdpFetchServer<S> {
    /// Binds the socket. Serving starts with [`run`](Self::run).
    pub async fn bind(config: ServerConfig, store: Arc<S>) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;

        let workers = config.effective_workers();
        let faults = FaultInjector::new(config.faults);
        if faults.is_active() {
            warn!(
                loss_rate = config.faults.loss_rate,
                delay_ms = config.faults.delay.as_millis() as u64,
                "fault injection enabled"
            );
        }

        Ok(Self {
            socket: Arc::new(socket),
            dispatcher: Dispatcher::new(store),
            faults,
            workers,
            stats: ServerStats::default(),
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Counters for this server, valid before, during and after [`run`](Self::run).
    pub fn stats(&self) -> ServerStats {
        self.stats.clone()
    }

    /// Serves requests until `cancel` fires.
    ///
    /// The receive itself has no timeout. Every datagram is handed to its own
    /// task straight away and the loop goes back to the socket; at most
    /// `workers` of those tasks run a handler at once, the rest wait in
    /// arrival order for a free slot.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
        let local_addr = self.local_addr()?;
        info!(%local_addr, workers = self.workers, "udpfetch server listening");

        let pool = Arc::new(Semaphore::new(self.workers));
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let (n, peer) = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(received = self.stats.received(), "server shutting down");
                    return Ok(());
                }
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(received) => received,
                    Err(e) => {
                        // ICMP errors from earlier sends surface here on some platforms.
                        warn!("receive error: {e}");
                        continue;
                    }
                }
            };
            self.stats.record_received();

            let datagram = buf[..n].to_vec();
            let pool = Arc::clone(&pool);
            let socket = Arc::clone(&self.socket);
            let dispatcher = self.dispatcher.clone();
            let faults = self.faults;
            let stats = self.stats.clone();

            tokio::spawn(async move {
                let Ok(_permit) = pool.acquire_owned().await else {
                    return;
                };
                let _active = stats.enter();
                handle_request(socket, dispatcher, faults, datagram, peer).await;
            });
        }
    }
}

async fn handle_request<S: ResourceStore>(
    socket: Arc<UdpSocket>,
    dispatcher: Dispatcher<S>,
    faults: FaultInjector,
    datagram: Vec<u8>,
    peer: SocketAddr,
) {
    // Store access is blocking file I/O.
    let reply = match tokio::task::spawn_blocking(move || dispatcher.handle(&datagram)).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(e) => {
            error!(%peer, "request handler failed: {e}");
            return;
        }
    };

    if let Reply::Chunk { seq, .. } = &reply {
        if faults.should_drop() {
            debug!(%peer, seq, "fault injection: dropping chunk reply");
            return;
        }
        faults.delay().await;
    }

    if let Err(e) = socket.send_to(&reply.to_bytes(), peer).await {
        error!(%peer, "failed to send reply: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use udpfetch_protocol::decode_chunk;
    use udpfetch_store::{DirectoryStore, MemoryStore};

    async fn start<S: ResourceStore>(
        store: S,
        faults: FaultConfig,
    ) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<()>) {
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
        (addr, cancel, handle)
    }

    async fn request(client: &UdpSocket, server: SocketAddr, text: &str) -> Option<Vec<u8>> {
        client.send_to(text.as_bytes(), server).await.unwrap();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        match tokio::time::timeout(Duration::from_millis(300), client.recv_from(&mut buf)).await {
            Ok(Ok((n, _))) => Some(buf[..n].to_vec()),
            Ok(Err(e)) => panic!("recv failed: {e}"),
            Err(_) => None,
        }
    }

    #[tokio::test]
    async fn serves_directory_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let a: Vec<u8> = (0..2500).map(|i| (i % 199) as u8).collect();
        std::fs::write(dir.path().join("a.txt"), &a).unwrap();
        std::fs::write(dir.path().join("b.txt"), b"").unwrap();
        let store = DirectoryStore::new(dir.path()).unwrap();

        let (addr, cancel, handle) = start(store, FaultConfig::default()).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        assert_eq!(request(&client, addr, "INFO a.txt").await.unwrap(), b"ok 3");
        assert_eq!(request(&client, addr, "INFO b.txt").await.unwrap(), b"ok 0");
        assert_eq!(
            request(&client, addr, "INFO missing.txt").await.unwrap(),
            b"error"
        );

        let packet = request(&client, addr, "FETCH a.txt 0").await.unwrap();
        let (seq, payload) = decode_chunk(&packet).unwrap();
        assert_eq!(seq, 0);
        assert_eq!(payload, &a[..1024]);

        let packet = request(&client, addr, "FETCH a.txt 2").await.unwrap();
        let (seq, payload) = decode_chunk(&packet).unwrap();
        assert_eq!(seq, 2);
        assert_eq!(payload, &a[2048..]);

        assert_eq!(request(&client, addr, "INDEX").await.unwrap(), b"ok 1");
        let packet = request(&client, addr, "FETCH_INDEX 0").await.unwrap();
        assert_eq!(decode_chunk(&packet).unwrap().1, b"a.txt\nb.txt\n");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn out_of_range_gets_no_reply() {
        let store = MemoryStore::new().with("a.txt", vec![1u8; 2500]);
        let (addr, cancel, handle) = start(store, FaultConfig::default()).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        assert!(request(&client, addr, "FETCH a.txt 3").await.is_none());
        assert!(request(&client, addr, "FETCH_INDEX 0").await.is_none());

        // The server keeps serving after a silent drop.
        assert_eq!(request(&client, addr, "INFO a.txt").await.unwrap(), b"ok 3");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_and_malformed_commands() {
        let store = MemoryStore::new();
        let (addr, cancel, handle) = start(store, FaultConfig::default()).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        assert_eq!(
            request(&client, addr, "LIST").await.unwrap(),
            udpfetch_protocol::UNKNOWN_COMMAND_REPLY.as_bytes()
        );
        assert!(request(&client, addr, "FETCH_INDEX x").await.is_none());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_requests_each_get_a_reply() {
        let mut store = MemoryStore::new();
        for i in 0..16 {
            store.insert(format!("f{i}"), vec![i as u8; 100 * (i + 1)]);
        }
        let (addr, cancel, handle) = start(store, FaultConfig::default()).await;

        let mut tasks = Vec::new();
        for i in 0..16usize {
            tasks.push(tokio::spawn(async move {
                let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
                let reply = request(&client, addr, &format!("FETCH f{i} 0")).await.unwrap();
                let (seq, payload) = decode_chunk(&reply).unwrap();
                assert_eq!(seq, 0);
                assert_eq!(payload.len(), (100 * (i + 1)).min(1024));
                assert!(payload.iter().all(|&b| b == i as u8));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn total_loss_drops_chunks_but_not_info() {
        let store = MemoryStore::new().with("a.txt", vec![1u8; 10]);
        let faults = FaultConfig {
            loss_rate: 1.0,
            ..FaultConfig::default()
        };
        let (addr, cancel, handle) = start(store, faults).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        assert_eq!(request(&client, addr, "INFO a.txt").await.unwrap(), b"ok 1");
        assert!(request(&client, addr, "FETCH a.txt 0").await.is_none());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_pool_keeps_receiving_but_runs_one_handler() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            workers: 1,
            faults: FaultConfig {
                loss_rate: 0.0,
                delay: Duration::from_millis(2500),
            },
        };
        let store = MemoryStore::new().with("a.txt", vec![1u8; 10]);
        let server = UdpFetchServer::bind(config, Arc::new(store)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let stats = server.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(server.run(cancel.clone()));

        let start = tokio::time::Instant::now();
        let mut clients = Vec::new();
        for _ in 0..3 {
            let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            client.send_to(b"FETCH a.txt 0", addr).await.unwrap();
            clients.push(client);
        }

        // Every request is read while the only worker is still busy.
        while stats.received() < 3 || stats.active() < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(start.elapsed() < Duration::from_millis(2500));
        assert_eq!(stats.active(), 1);

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut finished = Vec::new();
        for client in &clients {
            let (n, _) = client.recv_from(&mut buf).await.unwrap();
            assert_eq!(decode_chunk(&buf[..n]).unwrap().0, 0);
            finished.push(start.elapsed());
        }
        finished.sort();
        assert!(finished[0] >= Duration::from_millis(2500));
        assert!(finished[1] >= Duration::from_millis(5000));
        assert!(finished[2] >= Duration::from_millis(7500));
        assert_eq!(stats.peak_active(), 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn pool_allows_configured_concurrency() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            workers: 3,
            faults: FaultConfig {
                loss_rate: 0.0,
                delay: Duration::from_millis(200),
            },
        };
        let store = MemoryStore::new().with("a.txt", vec![1u8; 10]);
        let server = UdpFetchServer::bind(config, Arc::new(store)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let stats = server.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(server.run(cancel.clone()));

        let mut tasks = Vec::new();
        for _ in 0..6 {
            tasks.push(tokio::spawn(async move {
                let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
                client.send_to(b"FETCH a.txt 0", addr).await.unwrap();
                let mut buf = vec![0u8; RECV_BUFFER_SIZE];
                client.recv_from(&mut buf).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(stats.received(), 6);
        assert!(stats.peak_active() <= 3);

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            bind_addr: taken.local_addr().unwrap(),
            ..ServerConfig::default()
        };
        let result = UdpFetchServer::bind(config, Arc::new(MemoryStore::new())).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn zero_workers_uses_parallelism() {
        let config = ServerConfig::default();
        assert!(config.effective_workers() >= 1);
        let fixed = ServerConfig {
            workers: 3,
            ..ServerConfig::default()
        };
        assert_eq!(fixed.effective_workers(), 3);
    }
}
