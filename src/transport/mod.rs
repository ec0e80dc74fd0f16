//! Transport layer for browser ↔ host communication.
//!
//! Provides `FrameChannel` and the length-prefixed framing it speaks.
//! Format: [4-byte little-endian length][UTF-8 JSON payload]
//!
//! Browsers write the prefix in native byte order. Every platform that ships
//! native messaging is little-endian, so the order is pinned here instead of
//! following whatever machine the host happens to run on.

pub mod protocol;

pub use protocol::{DownloadRequest, Request, Response};

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::FrameError;

/// Largest message a browser sends to a native host (64 MiB).
pub const MAX_INBOUND_SIZE: u32 = 64 * 1024 * 1024;

/// Largest message a browser accepts from a native host (1 MiB).
pub const MAX_OUTBOUND_SIZE: u32 = 1024 * 1024;

/// How long the rest of a frame may take once its first byte has arrived.
pub const DEFAULT_BODY_TIMEOUT: Duration = Duration::from_secs(30);

const PREFIX_LEN: usize = 4;

/// Size and time bounds applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_inbound: u32,
    pub max_outbound: u32,
    pub body_timeout: Duration,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_inbound: MAX_INBOUND_SIZE,
            max_outbound: MAX_OUTBOUND_SIZE,
            body_timeout: DEFAULT_BODY_TIMEOUT,
        }
    }
}

/// A pair of byte streams carrying length-prefixed frames.
///
/// Reads and writes go straight to the underlying streams; the only
/// buffering is the single frame being assembled.
pub struct FrameChannel<R, W> {
    reader: R,
    writer: W,
    limits: FrameLimits,
}

impl<R, W> FrameChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub const fn new(reader: R, writer: W, limits: FrameLimits) -> Self {
        Self {
            reader,
            writer,
            limits,
        }
    }

    pub const fn limits(&self) -> &FrameLimits {
        &self.limits
    }

    /// Read the next frame body.
    ///
    /// Returns `Ok(None)` when the stream ends before a new frame begins.
    /// A stream that ends (or stalls past `body_timeout`) partway through a
    /// frame is a `FrameError`.
    pub async fn receive(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let mut prefix = [0u8; PREFIX_LEN];
        // Idle between frames is unbounded; the first byte starts the clock.
        if read_full(&mut self.reader, &mut prefix[..1]).await? == 0 {
            return Ok(None);
        }

        let timeout = self.limits.body_timeout;
        let received = 1 + tokio::time::timeout(timeout, read_full(&mut self.reader, &mut prefix[1..]))
            .await
            .map_err(|_| FrameError::Timeout(timeout))??;
        if received < PREFIX_LEN {
            return Err(FrameError::TruncatedHeader { received });
        }

        let len = u32::from_le_bytes(prefix);
        if len > self.limits.max_inbound {
            return Err(FrameError::TooLarge {
                len: len as usize,
                max: self.limits.max_inbound,
            });
        }

        let mut body = vec![0u8; len as usize];
        let received = tokio::time::timeout(timeout, read_full(&mut self.reader, &mut body))
            .await
            .map_err(|_| FrameError::Timeout(timeout))??;
        if received < body.len() {
            return Err(FrameError::TruncatedBody {
                expected: body.len(),
                received,
            });
        }

        trace!(len, "Received frame");
        Ok(Some(body))
    }

    /// Write one frame and flush it.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        let frame = encode_frame(payload, self.limits.max_outbound)?;
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;
        trace!(len = payload.len(), "Sent frame");
        Ok(())
    }
}

/// Prefix `payload` with its little-endian length.
pub fn encode_frame(payload: &[u8], max: u32) -> Result<Vec<u8>, FrameError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= max)
        .ok_or(FrameError::TooLarge {
            len: payload.len(),
            max,
        })?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Fill `buf` until it is full or the stream ends; returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(input: &[u8]) -> FrameChannel<&[u8], Vec<u8>> {
        FrameChannel::new(input, Vec::new(), FrameLimits::default())
    }

    #[tokio::test]
    async fn roundtrip_framing() {
        let mut tx = channel(&[]);
        tx.send(b"hello world").await.unwrap();

        let (_, written) = (tx.reader, tx.writer);
        assert_eq!(&written[..4], &11u32.to_le_bytes());

        let mut rx = channel(&written);
        let received = rx.receive().await.unwrap().unwrap();
        assert_eq!(received, b"hello world");
        assert!(rx.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_payload() {
        let frame = encode_frame(b"", MAX_OUTBOUND_SIZE).unwrap();
        assert_eq!(frame, vec![0, 0, 0, 0]);

        let mut rx = channel(&frame);
        let received = rx.receive().await.unwrap().unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn prefix_is_little_endian() {
        let frame = encode_frame(&[b'x'; 0x0102], MAX_OUTBOUND_SIZE).unwrap();
        assert_eq!(&frame[..4], &[0x02, 0x01, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn closed_stream_is_end_of_stream() {
        let mut rx = channel(&[]);
        assert!(rx.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_prefix_is_truncated_header() {
        let mut rx = channel(&[5, 0]);
        let err = rx.receive().await.unwrap_err();
        assert!(matches!(err, FrameError::TruncatedHeader { received: 2 }));
    }

    #[tokio::test]
    async fn short_body_is_truncated_body() {
        let mut input = 100u32.to_le_bytes().to_vec();
        input.extend_from_slice(&[b'a'; 10]);

        let mut rx = channel(&input);
        let err = rx.receive().await.unwrap_err();
        assert!(matches!(
            err,
            FrameError::TruncatedBody {
                expected: 100,
                received: 10
            }
        ));
    }

    #[tokio::test]
    async fn stalled_body_times_out() {
        let (mut peer, host) = tokio::io::duplex(256);
        peer.write_all(&100u32.to_le_bytes()).await.unwrap();
        peer.write_all(&[b'a'; 10]).await.unwrap();

        let limits = FrameLimits {
            body_timeout: Duration::from_millis(50),
            ..FrameLimits::default()
        };
        let mut rx = FrameChannel::new(host, Vec::new(), limits);
        let err = rx.receive().await.unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));

        // Peer stays open for the whole read.
        drop(peer);
    }

    #[tokio::test]
    async fn partial_prefix_stall_times_out() {
        let (mut peer, host) = tokio::io::duplex(256);
        peer.write_all(&[5, 0]).await.unwrap();

        let limits = FrameLimits {
            body_timeout: Duration::from_millis(50),
            ..FrameLimits::default()
        };
        let mut rx = FrameChannel::new(host, Vec::new(), limits);
        let result = tokio::time::timeout(Duration::from_secs(2), rx.receive())
            .await
            .expect("receive should give up on a stalled prefix");
        assert!(matches!(result, Err(FrameError::Timeout(_))));

        drop(peer);
    }

    #[tokio::test]
    async fn idle_peer_is_not_timed_out() {
        let (peer, host) = tokio::io::duplex(256);

        let limits = FrameLimits {
            body_timeout: Duration::from_millis(20),
            ..FrameLimits::default()
        };
        let mut rx = FrameChannel::new(host, Vec::new(), limits);
        let waited = tokio::time::timeout(Duration::from_millis(100), rx.receive()).await;
        assert!(waited.is_err(), "an idle peer must not end the channel");

        drop(peer);
    }

    #[tokio::test]
    async fn oversized_declaration_rejected_before_reading() {
        let limits = FrameLimits {
            max_inbound: 16,
            ..FrameLimits::default()
        };
        let input = 17u32.to_le_bytes();
        let mut rx = FrameChannel::new(&input[..], Vec::new(), limits);
        let err = rx.receive().await.unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { len: 17, max: 16 }));
    }

    #[tokio::test]
    async fn oversized_send_rejected() {
        let limits = FrameLimits {
            max_outbound: 4,
            ..FrameLimits::default()
        };
        let mut tx = FrameChannel::new(&b""[..], Vec::new(), limits);
        assert!(tx.send(b"12345").await.is_err());
        assert!(tx.writer.is_empty());
    }

    #[tokio::test]
    async fn send_writes_prefix_and_body_together() {
        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(b"{}");

        let mock = tokio_test::io::Builder::new().write(&expected).build();
        let mut tx = FrameChannel::new(&b""[..], mock, FrameLimits::default());
        tx.send(b"{}").await.unwrap();
    }

    #[tokio::test]
    async fn frames_split_across_reads() {
        let mut frame = encode_frame(b"abcdef", MAX_OUTBOUND_SIZE).unwrap();
        let tail = frame.split_off(6);

        let mock = tokio_test::io::Builder::new()
            .read(&frame[..2])
            .read(&frame[2..])
            .read(&tail)
            .build();
        let mut rx = FrameChannel::new(mock, Vec::new(), FrameLimits::default());
        assert_eq!(rx.receive().await.unwrap().unwrap(), b"abcdef");
        assert!(rx.receive().await.unwrap().is_none());
    }
}
