//! Startup configuration.
//!
//! Browsers launch the host without any way to pass settings, so
//! configuration comes from an optional JSON file in `~/.beatportdl/` plus
//! `BEATPORTDL_HOST_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::host::INTERNAL_ERROR;
use crate::transport::{FrameLimits, MAX_INBOUND_SIZE, MAX_OUTBOUND_SIZE};

/// Directory under the user's home holding the config and failure log.
const APP_DIR: &str = ".beatportdl";
const CONFIG_FILE: &str = "native-host.json";
const LOG_FILE: &str = "native-host.log";

/// Host configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Downloader executable, looked up on `PATH` if not absolute.
    pub downloader: String,

    /// Extra arguments placed before the URL.
    pub downloader_args: Vec<String>,

    /// How long one download may run before it is killed.
    pub download_timeout_seconds: u64,

    /// How long the rest of a frame may take once its first byte has arrived.
    pub frame_timeout_seconds: u64,

    /// Largest accepted request body.
    pub max_inbound_bytes: u32,

    /// Largest response body the host will write.
    pub max_outbound_bytes: u32,

    /// Failure log location. Defaults to `~/.beatportdl/native-host.log`.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloader: "beatportdl".into(),
            downloader_args: Vec::new(),
            download_timeout_seconds: 600,
            frame_timeout_seconds: 30,
            max_inbound_bytes: MAX_INBOUND_SIZE,
            max_outbound_bytes: MAX_OUTBOUND_SIZE,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Priority: environment variables > `explicit` file > default file in
    /// `~/.beatportdl/` (if present) > built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Reading config file");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse JSON")
    }

    /// Apply `BEATPORTDL_HOST_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(downloader) = lookup("BEATPORTDL_HOST_DOWNLOADER") {
            self.downloader = downloader;
        }
        if let Some(log_file) = lookup("BEATPORTDL_HOST_LOG_FILE") {
            self.log_file = Some(PathBuf::from(log_file));
        }
        if let Some(secs) = lookup("BEATPORTDL_HOST_DOWNLOAD_TIMEOUT") {
            self.download_timeout_seconds = secs
                .parse()
                .with_context(|| format!("BEATPORTDL_HOST_DOWNLOAD_TIMEOUT is not a number: {secs}"))?;
        }
        if let Some(secs) = lookup("BEATPORTDL_HOST_FRAME_TIMEOUT") {
            self.frame_timeout_seconds = secs
                .parse()
                .with_context(|| format!("BEATPORTDL_HOST_FRAME_TIMEOUT is not a number: {secs}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.downloader.trim().is_empty(), "downloader must not be empty");
        anyhow::ensure!(
            self.download_timeout_seconds > 0,
            "download_timeout_seconds must be positive"
        );
        anyhow::ensure!(
            self.frame_timeout_seconds > 0,
            "frame_timeout_seconds must be positive"
        );
        anyhow::ensure!(self.max_inbound_bytes > 0, "max_inbound_bytes must be positive");
        anyhow::ensure!(
            self.max_outbound_bytes as usize >= INTERNAL_ERROR.len(),
            "max_outbound_bytes must be at least {} bytes",
            INTERNAL_ERROR.len()
        );
        Ok(())
    }

    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds)
    }

    pub const fn frame_limits(&self) -> FrameLimits {
        FrameLimits {
            max_inbound: self.max_inbound_bytes,
            max_outbound: self.max_outbound_bytes,
            body_timeout: Duration::from_secs(self.frame_timeout_seconds),
        }
    }

    /// Resolve the failure log path.
    ///
    /// Falls back to a path relative to the working directory when no home
    /// directory can be determined.
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_default()
                .join(APP_DIR)
                .join(LOG_FILE)
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR).join(CONFIG_FILE))
}
