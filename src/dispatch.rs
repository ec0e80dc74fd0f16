//! Request routing and the `download` action handler.

use tracing::{info, warn};

use crate::backend::Downloader;
use crate::error::{ExecError, HostError};
use crate::transport::{DownloadRequest, Request, Response};

pub const UNKNOWN_ACTION: &str = "Unknown action";
pub const NO_URL_PROVIDED: &str = "No URL provided";

/// Routes decoded requests to their handlers.
pub struct Dispatcher<D> {
    download: DownloadHandler<D>,
}

impl<D: Downloader> Dispatcher<D> {
    pub const fn new(downloader: D) -> Self {
        Self {
            download: DownloadHandler::new(downloader),
        }
    }

    /// Produce the response for `request`.
    ///
    /// Unknown actions are an ordinary failure response. `Err` means
    /// something went wrong that the caller has to log.
    pub async fn route(&self, request: Request) -> Result<Response, HostError> {
        match request {
            Request::Download(req) => self.download.execute(&req).await,
            Request::Unknown { action } => {
                warn!(action = %action, "Unknown action");
                Ok(Response::failure(UNKNOWN_ACTION))
            }
        }
    }
}

/// Validates a `download` request and maps the downloader's exit to a response.
pub struct DownloadHandler<D> {
    downloader: D,
}

impl<D: Downloader> DownloadHandler<D> {
    pub const fn new(downloader: D) -> Self {
        Self { downloader }
    }

    pub async fn execute(&self, request: &DownloadRequest) -> Result<Response, HostError> {
        let Some(url) = request.url.as_deref().filter(|url| !url.is_empty()) else {
            return Ok(Response::failure(NO_URL_PROVIDED));
        };

        info!(url = %url, "Starting download");

        match self.downloader.download(url).await {
            Ok(result) if result.succeeded() => {
                info!(url = %url, "Download finished");
                Ok(Response::ok())
            }
            Ok(result) => {
                warn!(url = %url, exit_code = result.exit_code, "Download failed");
                Ok(Response::failure(result.stderr))
            }
            Err(ExecError::TimedOut(after)) => {
                warn!(url = %url, "Download timed out");
                Ok(Response::failure(timeout_message(after.as_secs())))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Error text sent when the downloader is killed for running too long.
pub fn timeout_message(secs: u64) -> String {
    format!("Download timed out after {secs}s")
}
