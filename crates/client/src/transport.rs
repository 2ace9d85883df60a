//! Datagram transport used by the transfer engine.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::net::UdpSocket;
use tracing::debug;

/// A boxed future returned by transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// An unreliable datagram channel to one server.
///
/// Implementations may lose, duplicate or reorder datagrams; the engine
/// copes with all of these. `recv` yields only datagrams from the server and
/// may wait forever; the engine bounds it with its own timeout.
pub trait Transport: Send + Sync {
    /// Sends one datagram to the server.
    fn send<'a>(&'a self, datagram: &'a [u8]) -> TransportFuture<'a, ()>;

    /// Receives the next datagram from the server into `buf`, returning its length.
    fn recv<'a>(&'a self, buf: &'a mut [u8]) -> TransportFuture<'a, usize>;
}

/// UDP transport bound to an ephemeral local port.
pub struct UdpTransport {
    socket: UdpSocket,
    server: SocketAddr,
}

impl UdpTransport {
    /// Binds an ephemeral socket for talking to `server`.
    pub async fn connect(server: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if server.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        debug!(local = %socket.local_addr()?, %server, "UDP transport bound");
        Ok(Self { socket, server })
    }

    /// Resolves `host:port` and binds a transport for the first address.
    pub async fn resolve(host: &str, port: u16) -> io::Result<Self> {
        let server = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {host}:{port}"),
                )
            })?;
        Self::connect(server).await
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn send<'a>(&'a self, datagram: &'a [u8]) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            self.socket.send_to(datagram, self.server).await?;
            Ok(())
        })
    }

    fn recv<'a>(&'a self, buf: &'a mut [u8]) -> TransportFuture<'a, usize> {
        Box::pin(async move {
            loop {
                match self.socket.recv_from(buf).await {
                    Ok((n, from)) if from == self.server => return Ok(n),
                    Ok((_, from)) => {
                        debug!(%from, "ignoring datagram from unexpected peer");
                    }
                    // ICMP port-unreachable for an earlier send; treat like loss.
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        debug!("server unreachable: {e}");
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }
}
