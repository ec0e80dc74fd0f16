//! beatportdl native messaging host library
//!
//! This crate provides the pieces the host binary wires together:
//! - Length-prefixed framing and the JSON message codec
//! - Request dispatch and the `download` handler
//! - The downloader backend that runs `beatportdl`
//! - Best-effort failure log and startup configuration

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod failure_log;
pub mod host;
pub mod transport;
