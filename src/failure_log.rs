//! Append-only log of failures the host could not handle cleanly.
//!
//! Writing here is best-effort: a full disk or missing permission is
//! reported on stderr and otherwise ignored so the host keeps serving.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Per-user failure log, created lazily on the first record.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure line. Never fails.
    pub fn record(&self, message: &str) {
        match self.append(message) {
            Ok(()) => debug!(path = %self.path.display(), "Recorded failure"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Cannot write failure log"),
        }
    }

    fn append(&self, message: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // One line per failure; multi-line stderr is flattened.
        let line = format!("Error: {}\n", message.trim_end().replace(['\r', '\n'], " "));
        file.write_all(line.as_bytes())
    }
}
