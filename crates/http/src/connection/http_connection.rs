use bytes::Bytes;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use http::header::CONNECTION;
use http::{Request, Response, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, PeerAddr};

use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// An HTTP connection that decodes requests and streams responses back
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    peer_addr: Option<SocketAddr>,
    shutdown: Option<CancellationToken>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            peer_addr: None,
            shutdown: None,
        }
    }

    /// Records the remote address; every request of this connection carries it as [`PeerAddr`].
    #[must_use]
    pub fn peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Stops the connection once `shutdown` is cancelled.
    ///
    /// The token is checked between requests only: a request already being handled gets its
    /// response, then the connection closes.
    #[must_use]
    pub fn shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.framed_read.decoder_mut().set_max_body_size(max_body_size);
        self
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        loop {
            let next = match &self.shutdown {
                Some(shutdown) => tokio::select! {
                    biased;
                    () = shutdown.cancelled() => {
                        debug!("shutdown requested, connection closed");
                        return Ok(());
                    }
                    next = self.framed_read.next() => next,
                },
                None => self.framed_read.next().await,
            };

            match next {
                Some(Ok(request)) => {
                    let keep_alive = is_keep_alive(&request);
                    self.do_process(request, handler.as_ref()).await?;
                    if !keep_alive {
                        debug!("request asked to close, connection shutdown");
                        return Ok(());
                    }
                }

                Some(Err(e)) => {
                    error!("can't receive next request, cause {}", e);
                    let error_response = build_error_response(e.status_code());
                    self.framed_write.send(error_response).await?;
                    return Err(e.into());
                }

                None => {
                    debug!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, mut request: Request<Bytes>, handler: &H) -> Result<(), HttpError>
    where
        H: Handler,
    {
        if let Some(peer_addr) = self.peer_addr {
            request.extensions_mut().insert(PeerAddr(peer_addr));
        }

        let response = match handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                let cause: Box<dyn Error + Send + Sync> = e.into();
                error!("handle response error, cause: {}", cause);
                build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        self.framed_write.send(response).await?;
        Ok(())
    }
}

fn is_keep_alive<T>(request: &Request<T>) -> bool {
    let connection = request.headers().get(CONNECTION).and_then(|value| value.to_str().ok());
    match request.version() {
        Version::HTTP_10 => connection.is_some_and(|value| value.eq_ignore_ascii_case("keep-alive")),
        _ => !connection.is_some_and(|value| value.eq_ignore_ascii_case("close")),
    }
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status_code;
    response
}
