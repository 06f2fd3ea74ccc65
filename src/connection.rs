//! Deadline-bounded request/response I/O over a byte stream.
//!
//! Every send is a guaranteed-complete write and every receive reads
//! exactly header-size bytes then exactly the announced payload. Short
//! writes and short reads are a known failure mode of the transport and
//! must never corrupt framing. Each operation is bounded by its own
//! deadline; an elapsed deadline surfaces as [`BetwireError::Timeout`],
//! distinct from cooperative cancellation.
//!
//! Generic over `AsyncRead + AsyncWrite` so tests run over
//! `tokio::io::duplex` instead of a real socket.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{BetwireError, Result};
use crate::protocol::{Request, Response, RESPONSE_HEADER_SIZE};

/// Default cap on an announced response payload (1 MB). A header claiming
/// more than this is treated as desynchronization, not a huge allocation.
pub const DEFAULT_MAX_RESPONSE_PAYLOAD: u32 = 1024 * 1024;

/// A connected transport owned exclusively by the session driver.
pub struct Connection<S> {
    stream: S,
    read_timeout: Duration,
    write_timeout: Duration,
    max_payload: u32,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap a stream with per-operation deadlines.
    pub fn new(stream: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
            write_timeout,
            max_payload: DEFAULT_MAX_RESPONSE_PAYLOAD,
        }
    }

    /// Override the response payload cap.
    pub fn with_max_payload(mut self, max_payload: u32) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Encode and fully write one request frame.
    pub async fn send(&mut self, request: &Request) -> Result<()> {
        let frame = request.encode();
        let deadline = self.write_timeout;
        let io = async {
            self.stream.write_all(&frame).await?;
            self.stream.flush().await
        };
        match timeout(deadline, io).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(map_io(e)),
            Err(_) => Err(BetwireError::Timeout),
        }
    }

    /// Read exactly one response frame and decode it by kind.
    pub async fn recv(&mut self) -> Result<Response> {
        let mut header = [0u8; RESPONSE_HEADER_SIZE];
        self.read_exact_deadline(&mut header).await?;
        let kind = header[0];
        let payload_size = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
        if payload_size > self.max_payload {
            return Err(BetwireError::Protocol(format!(
                "response payload of {} bytes exceeds maximum {}",
                payload_size, self.max_payload
            )));
        }
        let mut payload = vec![0u8; payload_size as usize];
        if payload_size > 0 {
            self.read_exact_deadline(&mut payload).await?;
        }
        Response::decode_parts(kind, &payload)
    }

    async fn read_exact_deadline(&mut self, buf: &mut [u8]) -> Result<()> {
        match timeout(self.read_timeout, self.stream.read_exact(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(map_io(e)),
            Err(_) => Err(BetwireError::Timeout),
        }
    }
}

fn map_io(e: std::io::Error) -> BetwireError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BetwireError::ConnectionClosed
    } else {
        BetwireError::Io(e)
    }
}
