//! beatportdl native messaging host
//!
//! Started by the browser when the extension connects. Speaks
//! length-prefixed JSON on stdin/stdout and hands download requests to
//! `beatportdl`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beatportdl_native_host::{
    backend::ProcessDownloader, config::Config, dispatch::Dispatcher, failure_log::FailureLog,
    host::Host, transport::FrameChannel,
};

#[derive(Parser, Debug)]
#[command(name = "beatportdl-native-host")]
#[command(about = "Native messaging host for the beatportdl browser extension")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// JSON config file (default: ~/.beatportdl/native-host.json if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Caller details the browser appends (extension origin, manifest path,
    /// --parent-window on Windows). Logged, otherwise unused.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    caller: Vec<String>,
}

// One message at a time; a single thread is all the host needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr so stdout is free for native messaging)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    info!(
        caller = ?args.caller,
        downloader = %config.downloader,
        "Native host starting"
    );

    serve(config).await
}

async fn serve(config: Config) -> Result<()> {
    let downloader = ProcessDownloader::new(
        config.downloader.clone(),
        config.downloader_args.clone(),
        config.download_timeout(),
    );
    let failure_log = FailureLog::new(config.log_path());
    info!(
        program = %downloader.program(),
        failure_log = %failure_log.path().display(),
        "Serving on stdio"
    );

    let channel = FrameChannel::new(
        tokio::io::stdin(),
        tokio::io::stdout(),
        config.frame_limits(),
    );
    let host = Host::new(channel, Dispatcher::new(downloader), failure_log);

    host.run().await.context("Native messaging channel failed")?;

    info!("Native host exiting");
    Ok(())
}
