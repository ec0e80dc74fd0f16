//! Downloader trait and implementations.
//!
//! The host never downloads anything itself; it hands the URL to an
//! external tool and reports how that tool exited.

mod process;

pub use process::ProcessDownloader;

use async_trait::async_trait;

use crate::error::ExecError;

/// Result of running the downloader once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the process (0 = success, -1 = killed by a signal).
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ExecutionResult {
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can fetch a URL and report how it went.
///
/// Implementations must not inherit the host's stdio: stdout is the
/// native messaging channel.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Run the download for `url` to completion.
    async fn download(&self, url: &str) -> Result<ExecutionResult, ExecError>;
}
