//! Continuation-chaining sessions.
//!
//! Each step returns a future and the steps are glued together with
//! `and_then`. Steps own their state and hand it to the next continuation.
//! The connection lives behind a shared [`Link`] so the final continuation
//! can close it whichever step failed.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt, TryFutureExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::debug;

use super::Target;
use super::repeat::repeat_while;
use crate::download::{
    BodyBuffer, Connector, DownloadError, HeaderAccumulator, RequestEmitter, SessionConfig,
    Transport,
};

/// A session's connection, shared between its continuations.
///
/// Only one continuation runs at a time, so the lock is never contended.
type Link<S> = Arc<Mutex<Transport<S>>>;

/// Downloads `target` as a chain of continuations.
///
/// Resolves to the body, or to the first error. The transport is closed in
/// the last continuation, before the result is delivered.
pub fn download<C: Connector>(
    connector: Arc<C>,
    config: SessionConfig,
    target: Target,
) -> BoxFuture<'static, Result<Vec<u8>, DownloadError>> {
    let link: Link<C::Stream> = Arc::new(Mutex::new(Transport::new()));
    let target = Arc::new(target);

    resolve(Arc::clone(&connector), Arc::clone(&target), config)
        .and_then({
            let link = Arc::clone(&link);
            move |addr| connect(connector, link, addr)
        })
        .and_then({
            let link = Arc::clone(&link);
            let target = Arc::clone(&target);
            move |()| send_request(link, target)
        })
        .and_then({
            let link = Arc::clone(&link);
            let target = Arc::clone(&target);
            move |()| receive_header(link, target, config)
        })
        .and_then({
            let link = Arc::clone(&link);
            let target = Arc::clone(&target);
            move |body| receive_body(link, target, body)
        })
        .then(move |result| async move {
            link.lock().await.close().await;
            result
        })
        .boxed()
}

async fn resolve<C: Connector>(
    connector: Arc<C>,
    target: Arc<Target>,
    config: SessionConfig,
) -> Result<SocketAddr, DownloadError> {
    connector.resolve(&target.host, config.port()).await
}

async fn connect<C: Connector>(
    connector: Arc<C>,
    link: Link<C::Stream>,
    addr: SocketAddr,
) -> Result<(), DownloadError> {
    link.lock().await.connect(connector.as_ref(), addr).await?;
    debug!(%addr, "connected");
    Ok(())
}

fn send_request<S>(
    link: Link<S>,
    target: Arc<Target>,
) -> impl Future<Output = Result<(), DownloadError>> + Send + 'static
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let request = RequestEmitter::new(&target.host, &target.path);
    repeat_while(
        |request: &RequestEmitter| !request.is_complete(),
        move |mut request: RequestEmitter| {
            let link = Arc::clone(&link);
            async move {
                let written = link.lock().await.write(request.unsent()).await;
                request.advance(written)?;
                Ok::<_, DownloadError>(request)
            }
        },
        request,
    )
    .map_ok(move |_| debug!(host = %target.host, "request sent"))
}

fn receive_header<S>(
    link: Link<S>,
    target: Arc<Target>,
    config: SessionConfig,
) -> impl Future<Output = Result<BodyBuffer, DownloadError>> + Send + 'static
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let header = HeaderAccumulator::new(&target.host, &config);
    repeat_while(
        |header: &HeaderAccumulator| !header.is_complete(),
        move |mut header: HeaderAccumulator| {
            let link = Arc::clone(&link);
            let target = Arc::clone(&target);
            async move {
                let n = link
                    .lock()
                    .await
                    .read(header.scratch())
                    .await
                    .map_err(|e| DownloadError::receive(&target.host, e))?;
                header.accept(n)?;
                Ok::<_, DownloadError>(header)
            }
        },
        header,
    )
    .and_then(|header| future::ready(header.into_body()))
}

fn receive_body<S>(
    link: Link<S>,
    target: Arc<Target>,
    body: BodyBuffer,
) -> impl Future<Output = Result<Vec<u8>, DownloadError>> + Send + 'static
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    debug!(content_length = body.len(), bundled = body.offset(), "receiving body");
    repeat_while(
        |body: &BodyBuffer| !body.is_complete(),
        move |mut body: BodyBuffer| {
            let link = Arc::clone(&link);
            let target = Arc::clone(&target);
            async move {
                let n = link
                    .lock()
                    .await
                    .read(body.window())
                    .await
                    .map_err(|e| DownloadError::receive(&target.host, e))?;
                body.accept(n)?;
                Ok::<_, DownloadError>(body)
            }
        },
        body,
    )
    .map_ok(BodyBuffer::into_bytes)
}
