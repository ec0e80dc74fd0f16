//! The native messaging host loop.
//!
//! One frame is read, decoded, dispatched and answered before the next read
//! begins. The loop ends when stdin closes between frames, or when the frame
//! boundary can no longer be trusted.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::backend::Downloader;
use crate::dispatch::Dispatcher;
use crate::error::{FrameError, HostError};
use crate::failure_log::FailureLog;
use crate::transport::{protocol, FrameChannel, Response};

/// Sent when no better response could be built. The outbound limit must fit it.
pub const INTERNAL_ERROR: &[u8] = br#"{"success":false,"error":"Internal error"}"#;

/// Owns the channel and everything needed to answer a request.
pub struct Host<R, W, D> {
    channel: FrameChannel<R, W>,
    dispatcher: Dispatcher<D>,
    failure_log: FailureLog,
}

impl<R, W, D> Host<R, W, D>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    D: Downloader,
{
    pub const fn new(
        channel: FrameChannel<R, W>,
        dispatcher: Dispatcher<D>,
        failure_log: FailureLog,
    ) -> Self {
        Self {
            channel,
            dispatcher,
            failure_log,
        }
    }

    /// Serve requests until the input closes.
    ///
    /// Returns `Ok(())` on a clean end of stream and the `FrameError` that
    /// ended the channel otherwise.
    pub async fn run(mut self) -> Result<(), FrameError> {
        let mut handled: u64 = 0;

        loop {
            let body = match self.channel.receive().await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!(handled, "Input closed, shutting down");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, handled, "Framing error, closing channel");
                    return Err(e);
                }
            };

            let response = self.respond(&body).await;
            let bytes = self.encode(&response);
            self.channel.send(&bytes).await?;

            handled += 1;
            debug!(handled, success = response.success, "Response sent");
        }
    }

    async fn respond(&self, body: &[u8]) -> Response {
        let request = match protocol::decode(body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting undecodable message");
                return Response::failure(format!("Invalid message: {e}"));
            }
        };

        debug!(action = %request.action(), "Dispatching request");

        match self.dispatcher.route(request).await {
            Ok(response) => response,
            Err(e) => self.recover(&e),
        }
    }

    /// Encode `response`, falling back to a fixed error body if that fails.
    fn encode(&self, response: &Response) -> Vec<u8> {
        let max = self.channel.limits().max_outbound;
        let encoded = protocol::encode(response)
            .map_err(HostError::from)
            .and_then(|bytes| {
                if bytes.len() > max as usize {
                    Err(HostError::ResponseTooLarge {
                        len: bytes.len(),
                        max,
                    })
                } else {
                    Ok(bytes)
                }
            });

        encoded.unwrap_or_else(|e| {
            self.recover(&e);
            INTERNAL_ERROR.to_vec()
        })
    }

    fn recover(&self, e: &HostError) -> Response {
        error!(error = %e, "Unexpected failure");
        self.failure_log.record(&e.to_string());
        Response::failure(e.to_string())
    }
}
