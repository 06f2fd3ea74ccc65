//! Response framing and typed payload dispatch.
//!
//! Response header layout:
//! ```text
//! ┌────────┬──────────────┬─────────────┐
//! │ Kind   │ Payload size │ Payload     │
//! │ 1 byte │ 4 bytes LE   │ N bytes     │
//! └────────┴──────────────┴─────────────┘
//! ```
//!
//! Each kind decodes its payload independently; a successfully decoded
//! [`Response`] guarantees kind/payload consistency by construction, so
//! matching on the wrong variant at a call site is a session-level
//! desynchronization, never a data error.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BetwireError, Result};

/// Response header size in bytes (fixed, exactly 5).
pub const RESPONSE_HEADER_SIZE: usize = 5;

/// Response variant tag. Fixed wire constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseKind {
    /// Per-request acknowledgement.
    Acknowledge = 0,
    /// Winners are ready to be requested.
    Ready = 1,
    /// Final winners list.
    Winners = 2,
}

impl TryFrom<u8> for ResponseKind {
    type Error = BetwireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ResponseKind::Acknowledge),
            1 => Ok(ResponseKind::Ready),
            2 => Ok(ResponseKind::Winners),
            other => Err(BetwireError::Protocol(format!(
                "unknown response kind: {}",
                other
            ))),
        }
    }
}

/// Acknowledgement payload: exactly one status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledge {
    /// Server-reported status. Surfaced, not interpreted.
    pub status: u8,
}

impl Acknowledge {
    fn unmarshal(payload: &[u8]) -> Result<Self> {
        if payload.len() != 1 {
            return Err(BetwireError::Protocol(format!(
                "acknowledge: malformed payload of {} bytes",
                payload.len()
            )));
        }
        Ok(Self { status: payload[0] })
    }
}

/// Winners payload: comma-separated identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Winners {
    /// Winning bettor identifiers, in server order.
    pub dnis: Vec<String>,
}

impl Winners {
    fn unmarshal(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| BetwireError::Protocol(format!("winners: invalid utf-8: {}", e)))?;
        // An empty payload means zero winners, not one empty identifier.
        if text.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            dnis: text.split(',').map(str::to_string).collect(),
        })
    }
}

/// A decoded response, typed by its wire kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Per-request acknowledgement.
    Acknowledge(Acknowledge),
    /// Readiness signal (empty payload).
    Ready,
    /// Final winners list.
    Winners(Winners),
}

impl Response {
    /// The wire kind of this response.
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::Acknowledge(_) => ResponseKind::Acknowledge,
            Response::Ready => ResponseKind::Ready,
            Response::Winners(_) => ResponseKind::Winners,
        }
    }

    /// Decode a response from its kind byte and payload bytes.
    ///
    /// The payload must already be exactly the length announced by the
    /// header; [`crate::connection::Connection`] guarantees that.
    pub fn decode_parts(kind: u8, payload: &[u8]) -> Result<Self> {
        match ResponseKind::try_from(kind)? {
            ResponseKind::Acknowledge => {
                Ok(Response::Acknowledge(Acknowledge::unmarshal(payload)?))
            }
            ResponseKind::Ready => {
                if !payload.is_empty() {
                    return Err(BetwireError::Protocol(format!(
                        "ready: unexpected payload of {} bytes",
                        payload.len()
                    )));
                }
                Ok(Response::Ready)
            }
            ResponseKind::Winners => Ok(Response::Winners(Winners::unmarshal(payload)?)),
        }
    }

    /// Encode the full frame (header + payload) into a contiguous buffer.
    pub fn encode(&self) -> Bytes {
        let payload: Bytes = match self {
            Response::Acknowledge(ack) => Bytes::copy_from_slice(&[ack.status]),
            Response::Ready => Bytes::new(),
            Response::Winners(w) => Bytes::from(w.dnis.join(",").into_bytes()),
        };
        let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_SIZE + payload.len());
        buf.put_u8(self.kind() as u8);
        buf.put_u32_le(payload.len() as u32);
        buf.extend_from_slice(&payload);
        buf.freeze()
    }
}
