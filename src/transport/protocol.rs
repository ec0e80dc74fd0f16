//! Native messaging message types.
//!
//! Requests arrive as `{"action": "...", ...}`; responses go back as
//! `{"success": true}` or `{"success": false, "error": "..."}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Request decoded from a frame body, keyed by its `action` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Hand a URL to the downloader.
    Download(DownloadRequest),
    /// Any action this host has no handler for.
    Unknown { action: String },
}

impl Request {
    pub fn action(&self) -> &str {
        match self {
            Self::Download(_) => "download",
            Self::Unknown { action } => action,
        }
    }
}

/// Fields of a `download` request. Validation of `url` is left to the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Reply sent for every successfully framed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Decode a frame body into a [`Request`].
///
/// Unrecognized actions decode fine; they are rejected at dispatch.
pub fn decode(body: &[u8]) -> Result<Request, DecodeError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(mut fields) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let action = match fields.remove("action") {
        Some(Value::String(action)) => action,
        _ => return Err(DecodeError::MissingAction),
    };

    if action != "download" {
        return Ok(Request::Unknown { action });
    }

    serde_json::from_value(Value::Object(fields))
        .map(Request::Download)
        .map_err(|source| DecodeError::InvalidField { action, source })
}

/// Encode a [`Response`] as compact JSON.
pub fn encode(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_download() {
        let req = decode(br#"{"action":"download","url":"http://example.com/t"}"#).unwrap();
        assert_eq!(
            req,
            Request::Download(DownloadRequest {
                url: Some("http://example.com/t".to_string())
            })
        );
        assert_eq!(req.action(), "download");
    }

    #[test]
    fn decode_download_without_url() {
        let req = decode(br#"{"action":"download"}"#).unwrap();
        assert_eq!(req, Request::Download(DownloadRequest { url: None }));

        let req = decode(br#"{"action":"download","url":null}"#).unwrap();
        assert_eq!(req, Request::Download(DownloadRequest { url: None }));
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let req = decode(br#"{"action":"download","url":"u","trackId":7,"extra":{}}"#).unwrap();
        assert_eq!(
            req,
            Request::Download(DownloadRequest {
                url: Some("u".to_string())
            })
        );
    }

    #[test]
    fn decode_unknown_action() {
        let req = decode(br#"{"action":"pause"}"#).unwrap();
        assert_eq!(
            req,
            Request::Unknown {
                action: "pause".to_string()
            }
        );
    }

    #[test]
    fn decode_rejects_bad_bodies() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode(b""), Err(DecodeError::Json(_))));
        assert!(matches!(decode(&[0xff, 0xfe]), Err(DecodeError::Json(_))));
        assert!(matches!(decode(b"[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode(b"{}"), Err(DecodeError::MissingAction)));
        assert!(matches!(
            decode(br#"{"action":42}"#),
            Err(DecodeError::MissingAction)
        ));
    }

    #[test]
    fn decode_rejects_non_string_url() {
        let err = decode(br#"{"action":"download","url":123}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { ref action, .. } if action == "download"));
    }

    #[test]
    fn encode_success_omits_error() {
        let json = encode(&Response::ok()).unwrap();
        assert_eq!(json, br#"{"success":true}"#);
    }

    #[test]
    fn encode_failure_carries_error() {
        let json = encode(&Response::failure("Unknown action")).unwrap();
        assert_eq!(json, br#"{"success":false,"error":"Unknown action"}"#);
    }

    #[test]
    fn response_survives_encoding() {
        for response in [
            Response::ok(),
            Response::failure("network error\n"),
            Response::failure(""),
        ] {
            let bytes = encode(&response).unwrap();
            let back: Response = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(back, response);
        }
    }
}
