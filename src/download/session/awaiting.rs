//! Suspend/resume sessions: the whole exchange as one linear `async fn`.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::Target;
use crate::download::{
    Connector, DownloadError, HeaderAccumulator, RequestEmitter, SessionConfig, Transport,
};

/// Downloads `target`, suspending at every resolve, connect, write and read.
///
/// The transport is closed before the result is returned, on every path.
///
/// # Errors
///
/// Returns the first [`DownloadError`] the exchange hits.
#[instrument(skip(connector, config), fields(host = %target.host, path = %target.path))]
pub async fn download<C: Connector>(
    connector: Arc<C>,
    config: SessionConfig,
    target: Target,
) -> Result<Vec<u8>, DownloadError> {
    let mut transport = Transport::new();
    let result = exchange(connector.as_ref(), &config, &target, &mut transport).await;
    transport.close().await;
    result
}

async fn exchange<C: Connector>(
    connector: &C,
    config: &SessionConfig,
    target: &Target,
    transport: &mut Transport<C::Stream>,
) -> Result<Vec<u8>, DownloadError> {
    let addr = connector.resolve(&target.host, config.port()).await?;
    transport.connect(connector, addr).await?;
    debug!(%addr, "connected");

    let mut request = RequestEmitter::new(&target.host, &target.path);
    while !request.is_complete() {
        let written = transport.write(request.unsent()).await;
        request.advance(written)?;
    }
    debug!("request sent");

    let mut header = HeaderAccumulator::new(&target.host, config);
    loop {
        let n = transport
            .read(header.scratch())
            .await
            .map_err(|e| DownloadError::receive(&target.host, e))?;
        if header.accept(n)? {
            break;
        }
    }

    let mut body = header.into_body()?;
    debug!(content_length = body.len(), bundled = body.offset(), "receiving body");
    while !body.is_complete() {
        let n = transport
            .read(body.window())
            .await
            .map_err(|e| DownloadError::receive(&target.host, e))?;
        body.accept(n)?;
    }

    Ok(body.into_bytes())
}
