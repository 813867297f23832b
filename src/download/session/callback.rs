//! Callback-chaining sessions.
//!
//! [`CallbackSession`] is an explicit state machine. Its `poll` starts the
//! I/O for the current state; when that I/O completes, the matching
//! completion handler (`on_resolved`, `on_connected`, `on_sent`,
//! `on_header_read`, `on_body_read`) updates the session and picks the next
//! state. Only one I/O operation is ever outstanding, so the session is
//! never mutated from two places at once.

use std::fmt;
use std::future::Future;
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Target;
use crate::download::{
    BodyBuffer, Connector, DownloadError, HeaderAccumulator, RequestEmitter, SessionConfig,
    Transport,
};

/// The result a session reports exactly once.
pub type DownloadResult = Result<Vec<u8>, DownloadError>;

enum State<S> {
    Resolving(BoxFuture<'static, Result<SocketAddr, DownloadError>>),
    Connecting(BoxFuture<'static, Result<S, DownloadError>>),
    Sending(RequestEmitter),
    ReceivingHeader(HeaderAccumulator),
    ReceivingBody(BodyBuffer),
    /// Shutting the transport down before reporting the outcome.
    Closing(DownloadResult),
    Done,
}

impl<S> State<S> {
    fn name(&self) -> &'static str {
        match self {
            Self::Resolving(_) => "resolving",
            Self::Connecting(_) => "connecting",
            Self::Sending(_) => "sending",
            Self::ReceivingHeader(_) => "receiving_header",
            Self::ReceivingBody(_) => "receiving_body",
            Self::Closing(Ok(_)) => "closing",
            Self::Closing(Err(_)) => "failed",
            Self::Done => "done",
        }
    }
}

/// One download driven as an explicit state machine.
///
/// Resolves to the body or the first error, after the transport has been
/// closed.
#[must_use = "futures do nothing unless polled"]
pub struct CallbackSession<C: Connector> {
    connector: Arc<C>,
    config: SessionConfig,
    target: Target,
    transport: Transport<C::Stream>,
    state: State<C::Stream>,
}

impl<C: Connector> fmt::Debug for CallbackSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSession")
            .field("target", &self.target)
            .field("state", &self.state.name())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> CallbackSession<C> {
    /// Creates a session that begins resolving `target` on first poll.
    pub fn new(connector: Arc<C>, config: SessionConfig, target: Target) -> Self {
        let resolving = {
            let connector = Arc::clone(&connector);
            let host = target.host.clone();
            let port = config.port();
            Box::pin(async move { connector.resolve(&host, port).await })
        };
        Self {
            connector,
            config,
            target,
            transport: Transport::new(),
            state: State::Resolving(resolving),
        }
    }

    /// Returns the name of the current state.
    #[must_use]
    pub fn state(&self) -> &'static str {
        self.state.name()
    }

    fn on_resolved(&mut self, resolved: Result<SocketAddr, DownloadError>) -> State<C::Stream> {
        match resolved {
            Ok(addr) => {
                let connector = Arc::clone(&self.connector);
                State::Connecting(Box::pin(async move { connector.connect(addr).await }))
            }
            Err(e) => State::Closing(Err(e)),
        }
    }

    fn on_connected(&mut self, connected: Result<C::Stream, DownloadError>) -> State<C::Stream> {
        match connected {
            Ok(stream) => {
                self.transport.attach(stream);
                debug!(host = %self.target.host, "connected");
                State::Sending(RequestEmitter::new(&self.target.host, &self.target.path))
            }
            Err(e) => State::Closing(Err(e)),
        }
    }

    fn on_sent(
        &mut self,
        mut request: RequestEmitter,
        written: io::Result<usize>,
    ) -> State<C::Stream> {
        if let Err(e) = request.advance(written) {
            return State::Closing(Err(e));
        }
        if request.is_complete() {
            debug!(host = %self.target.host, "request sent");
            State::ReceivingHeader(HeaderAccumulator::new(&self.target.host, &self.config))
        } else {
            State::Sending(request)
        }
    }

    fn on_header_read(
        &mut self,
        mut header: HeaderAccumulator,
        read: io::Result<usize>,
    ) -> State<C::Stream> {
        let accepted = read
            .map_err(|e| DownloadError::receive(&self.target.host, e))
            .and_then(|n| header.accept(n));
        match accepted {
            Ok(false) => State::ReceivingHeader(header),
            Ok(true) => match header.into_body() {
                Ok(body) => {
                    debug!(
                        content_length = body.len(),
                        bundled = body.offset(),
                        "receiving body"
                    );
                    Self::after_body_progress(body)
                }
                Err(e) => State::Closing(Err(e)),
            },
            Err(e) => State::Closing(Err(e)),
        }
    }

    fn on_body_read(&mut self, mut body: BodyBuffer, read: io::Result<usize>) -> State<C::Stream> {
        let accepted = read
            .map_err(|e| DownloadError::receive(&self.target.host, e))
            .and_then(|n| body.accept(n));
        match accepted {
            Ok(()) => Self::after_body_progress(body),
            Err(e) => State::Closing(Err(e)),
        }
    }

    fn after_body_progress(body: BodyBuffer) -> State<C::Stream> {
        if body.is_complete() {
            State::Closing(Ok(body.into_bytes()))
        } else {
            State::ReceivingBody(body)
        }
    }
}

impl<C: Connector> Future for CallbackSession<C> {
    type Output = DownloadResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            let next = match mem::replace(&mut this.state, State::Done) {
                State::Resolving(mut resolving) => match resolving.as_mut().poll(cx) {
                    Poll::Ready(resolved) => this.on_resolved(resolved),
                    Poll::Pending => {
                        this.state = State::Resolving(resolving);
                        return Poll::Pending;
                    }
                },
                State::Connecting(mut connecting) => match connecting.as_mut().poll(cx) {
                    Poll::Ready(connected) => this.on_connected(connected),
                    Poll::Pending => {
                        this.state = State::Connecting(connecting);
                        return Poll::Pending;
                    }
                },
                State::Sending(request) => match this.transport.poll_write(cx, request.unsent()) {
                    Poll::Ready(written) => this.on_sent(request, written),
                    Poll::Pending => {
                        this.state = State::Sending(request);
                        return Poll::Pending;
                    }
                },
                State::ReceivingHeader(mut header) => {
                    match this.transport.poll_read(cx, header.scratch()) {
                        Poll::Ready(read) => this.on_header_read(header, read),
                        Poll::Pending => {
                            this.state = State::ReceivingHeader(header);
                            return Poll::Pending;
                        }
                    }
                }
                State::ReceivingBody(mut body) => match this.transport.poll_read(cx, body.window()) {
                    Poll::Ready(read) => this.on_body_read(body, read),
                    Poll::Pending => {
                        this.state = State::ReceivingBody(body);
                        return Poll::Pending;
                    }
                },
                State::Closing(outcome) => match this.transport.poll_close(cx) {
                    Poll::Ready(()) => return Poll::Ready(outcome),
                    Poll::Pending => {
                        this.state = State::Closing(outcome);
                        return Poll::Pending;
                    }
                },
                State::Done => panic!("CallbackSession polled after completion"),
            };
            this.state = next;
        }
    }
}

/// Starts a session for `target`; the returned future is the session itself.
pub fn download<C: Connector>(
    connector: Arc<C>,
    config: SessionConfig,
    target: Target,
) -> CallbackSession<C> {
    CallbackSession::new(connector, config, target)
}

/// Spawns a session and hands its result to `on_complete`, exactly once.
///
/// Must be called from within a Tokio runtime.
pub fn download_with_callback<C, F>(
    connector: Arc<C>,
    config: SessionConfig,
    target: Target,
    on_complete: F,
) -> JoinHandle<()>
where
    C: Connector,
    F: FnOnce(DownloadResult) + Send + 'static,
{
    let session = CallbackSession::new(connector, config, target);
    tokio::spawn(async move { on_complete(session.await) })
}
