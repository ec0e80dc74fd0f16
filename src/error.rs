//! Error taxonomy for the native messaging host.
//!
//! Only [`FrameError`] is fatal to the host loop. Everything else is turned
//! into a failure response for the message that caused it.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// The frame boundary can no longer be trusted; the channel must close.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("stream ended inside the length prefix ({received} of 4 bytes)")]
    TruncatedHeader { received: usize },

    #[error("stream ended inside the message body ({received} of {expected} bytes)")]
    TruncatedBody { expected: usize, received: usize },

    #[error("message of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: u32 },

    #[error("message body not received within {0:?}")]
    Timeout(Duration),

    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A frame body that is not a usable request.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no string 'action' field")]
    MissingAction,

    #[error("invalid '{action}' message: {source}")]
    InvalidField {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to run the downloader to completion.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn downloader '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("downloader I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("downloader timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Failures nobody converted into a response; these go to the failure log.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Execution(#[from] ExecError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("response of {len} bytes exceeds the {max} byte limit")]
    ResponseTooLarge { len: usize, max: u32 },
}
