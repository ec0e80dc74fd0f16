//! Child-process downloader.
//!
//! Runs `<program> [args...] <url>` with captured output and kills it if it
//! outlives the configured timeout.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::{Downloader, ExecutionResult};
use crate::error::ExecError;

/// Downloader backed by an external executable such as `beatportdl`.
#[derive(Debug, Clone)]
pub struct ProcessDownloader {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessDownloader {
    /// `args` are passed before the URL, which is always the last argument.
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Downloader for ProcessDownloader {
    #[instrument(skip(self), fields(program = %self.program, timeout = ?self.timeout))]
    async fn download(&self, url: &str) -> Result<ExecutionResult, ExecError> {
        debug!("Spawning downloader");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut child_stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("downloader stdout not captured"))?;
        let mut child_stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("downloader stderr not captured"))?;

        // Drain both pipes and reap the child under one deadline.
        let run = async {
            let mut stdout_buf = Vec::new();
            let mut stderr_buf = Vec::new();
            let (r1, r2) = tokio::join!(
                child_stdout.read_to_end(&mut stdout_buf),
                child_stderr.read_to_end(&mut stderr_buf),
            );
            r1?;
            r2?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, stdout_buf, stderr_buf))
        };

        let (status, stdout_buf, stderr_buf) =
            if let Ok(result) = tokio::time::timeout(self.timeout, run).await {
                result?
            } else {
                warn!("Downloader exceeded its timeout, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, pid = ?child.id(), "Failed to kill downloader");
                }
                return Err(ExecError::TimedOut(self.timeout));
            };

        let result = ExecutionResult {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        };

        debug!(exit_code = result.exit_code, "Downloader finished");

        Ok(result)
    }
}
