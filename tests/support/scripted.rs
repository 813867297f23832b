//! Scripted connections for protocol tests.
//!
//! Streams are `tokio_test::io::Mock`s: every write must match the script
//! and reads return exactly the scripted pieces, then end of stream. A mock
//! dropped with unread data panics, so a passing test has consumed its whole
//! script.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};

use async_trait::async_trait;
use rawfetch_core::download::build_request;
use rawfetch_core::{Connector, DownloadError};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_test::io::{Builder, Mock};

/// Counts what happened to one stream.
#[derive(Debug, Default)]
pub struct Probe {
    shutdowns: AtomicUsize,
    drops: AtomicUsize,
}

impl Probe {
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// A stream wrapper that reports shutdowns and drops to its [`Probe`].
pub struct Tracked<S> {
    inner: S,
    probe: Arc<Probe>,
}

impl<S> Drop for Tracked<S> {
    fn drop(&mut self) {
        self.probe.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Tracked<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Tracked<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let result = ready!(Pin::new(&mut this.inner).poll_shutdown(cx));
        this.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(result)
    }
}

/// Resolves known hosts to fake addresses and hands out one scripted stream
/// per host.
///
/// Unknown hosts fail resolution; hosts registered with
/// [`refusing`](Self::refusing) resolve but fail to connect.
#[derive(Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, IpAddr>,
    streams: Mutex<HashMap<IpAddr, Tracked<Mock>>>,
    probes: HashMap<String, Arc<Probe>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ip(&self) -> IpAddr {
        let n = u8::try_from(self.hosts.len() + 1).expect("too many scripted hosts");
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, n))
    }

    /// Serves `mock` to the first connection to `host`.
    pub fn host(mut self, host: &str, mock: Mock) -> Self {
        let ip = self.next_ip();
        let probe = Arc::new(Probe::default());
        self.streams.get_mut().expect("lock").insert(
            ip,
            Tracked {
                inner: mock,
                probe: Arc::clone(&probe),
            },
        );
        self.hosts.insert(host.to_string(), ip);
        self.probes.insert(host.to_string(), probe);
        self
    }

    /// Makes `host` resolvable but refuses connections to it.
    pub fn refusing(mut self, host: &str) -> Self {
        let ip = self.next_ip();
        self.hosts.insert(host.to_string(), ip);
        self
    }

    /// Returns the probe of the stream scripted for `host`.
    pub fn probe(&self, host: &str) -> Arc<Probe> {
        Arc::clone(self.probes.get(host).expect("host has no scripted stream"))
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Stream = Tracked<Mock>;

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, DownloadError> {
        self.hosts
            .get(host)
            .map(|ip| SocketAddr::new(*ip, port))
            .ok_or_else(|| {
                DownloadError::dns(
                    host,
                    io::Error::new(io::ErrorKind::NotFound, "unknown scripted host"),
                )
            })
    }

    async fn connect(&self, addr: SocketAddr) -> Result<Tracked<Mock>, DownloadError> {
        self.streams
            .lock()
            .expect("lock")
            .remove(&addr.ip())
            .ok_or_else(|| {
                DownloadError::connect(
                    addr,
                    io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
                )
            })
    }
}

/// Builds a complete response carrying `body`.
pub fn response(body: &[u8]) -> Vec<u8> {
    let mut bytes = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Scripts one exchange: the exact request, then each read in order.
pub fn exchange(host: &str, path: &str, reads: &[&[u8]]) -> Mock {
    let mut builder = Builder::new();
    builder.write(&build_request(host, path));
    for read in reads {
        builder.read(read);
    }
    builder.build()
}
