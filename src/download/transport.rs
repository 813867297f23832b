//! Byte-stream transport for one session.
//!
//! [`Connector`] turns a host name into a connected stream in two steps
//! (resolve, connect). [`Transport`] owns that stream for the rest of the
//! session and knows nothing about HTTP. Both poll-style and `async` entry
//! points are provided so that every session style drives the same code.

use std::future::poll_fn;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use super::DownloadError;

/// Establishes connections for sessions.
///
/// Implementations must return [`DownloadError::DnsFailure`] from
/// [`resolve`](Self::resolve) and [`DownloadError::ConnectFailure`] from
/// [`connect`](Self::connect).
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The connected stream type.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Resolves `host` to the IPv4 address sessions connect to.
    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, DownloadError>;

    /// Opens a stream to `addr`.
    async fn connect(&self, addr: SocketAddr) -> Result<Self::Stream, DownloadError>;
}

/// Connects over TCP using the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, DownloadError> {
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| DownloadError::dns(host, e))?;
        addrs.find(SocketAddr::is_ipv4).ok_or_else(|| {
            DownloadError::dns(
                host,
                io::Error::new(io::ErrorKind::NotFound, "no IPv4 address"),
            )
        })
    }

    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream, DownloadError> {
        TcpStream::connect(addr)
            .await
            .map_err(|e| DownloadError::connect(addr, e))
    }
}

/// The connection owned by one session.
///
/// A transport starts out empty; [`attach`](Self::attach) hands it the
/// stream once the connection succeeds. [`close`](Self::close) is
/// idempotent: the first call shuts the stream down (if one was ever
/// attached) and drops it, later calls do nothing.
#[derive(Debug)]
pub struct Transport<S> {
    stream: Option<S>,
    closed: bool,
}

impl<S> Default for Transport<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Transport<S> {
    /// Creates a transport with no connection yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: None,
            closed: false,
        }
    }

    /// Returns true while a stream is attached and not yet closed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns true once [`close`](Self::close) has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Takes ownership of a freshly connected stream.
    pub fn attach(&mut self, stream: S) {
        debug_assert!(!self.closed, "attach after close");
        self.stream = Some(stream);
    }

    /// Connects through `connector` and attaches the resulting stream.
    ///
    /// # Errors
    ///
    /// Propagates the connector's [`DownloadError::ConnectFailure`].
    pub async fn connect<C>(
        &mut self,
        connector: &C,
        addr: SocketAddr,
    ) -> Result<(), DownloadError>
    where
        C: Connector<Stream = S> + ?Sized,
    {
        let stream = connector.connect(addr).await?;
        self.attach(stream);
        Ok(())
    }

    /// Attempts to write some of `buf`; partial writes are legal.
    pub fn poll_write(&mut self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.stream.as_mut() {
            Some(stream) => Pin::new(stream).poll_write(cx, buf),
            None => Poll::Ready(Err(not_connected())),
        }
    }

    /// Attempts to read into `buf`. `Ok(0)` means the peer closed the
    /// connection.
    pub fn poll_read(&mut self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        let Some(stream) = self.stream.as_mut() else {
            return Poll::Ready(Err(not_connected()));
        };
        let mut read_buf = ReadBuf::new(buf);
        ready!(Pin::new(stream).poll_read(cx, &mut read_buf))?;
        let n = read_buf.filled().len();
        trace!(bytes = n, "read");
        Poll::Ready(Ok(n))
    }

    /// Releases the connection. Shutdown errors are logged, never returned.
    pub fn poll_close(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = ready!(Pin::new(stream).poll_shutdown(cx)) {
                debug!(error = %e, "shutdown failed, closing anyway");
            }
            self.stream = None;
        }
        self.closed = true;
        Poll::Ready(())
    }

    /// Writes some of `buf`, returning how many bytes were accepted.
    ///
    /// # Errors
    ///
    /// Returns the stream's write error, or `NotConnected` when no stream is
    /// attached.
    pub async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        poll_fn(|cx| self.poll_write(cx, buf)).await
    }

    /// Reads into `buf`, returning how many bytes arrived (0 at end of
    /// stream).
    ///
    /// # Errors
    ///
    /// Returns the stream's read error, or `NotConnected` when no stream is
    /// attached.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        poll_fn(|cx| self.poll_read(cx, buf)).await
    }

    /// Releases the connection. See [`poll_close`](Self::poll_close).
    pub async fn close(&mut self) {
        poll_fn(|cx| self.poll_close(cx)).await;
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport has no connection")
}
