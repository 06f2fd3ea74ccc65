//! Request framing.
//!
//! Implements the 9-byte request header followed by the payload:
//! ```text
//! ┌────────┬──────────────┬───────────┬─────────────┐
//! │ Kind   │ Payload size │ Agency ID │ Payload     │
//! │ 1 byte │ 4 bytes LE   │ 4 bytes LE│ N bytes     │
//! └────────┴──────────────┴───────────┴─────────────┘
//! ```
//!
//! All multi-byte integers are Little Endian. Control requests
//! ([`RequestKind::BetBatchStop`], [`RequestKind::GetWinners`]) carry an
//! empty payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BetwireError, Result};

/// Request header size in bytes (fixed, exactly 9).
pub const REQUEST_HEADER_SIZE: usize = 9;

/// Capability of producing the payload bytes for a request.
///
/// Implemented by [`crate::agency::Bet`] (a single record) and
/// [`crate::batch::Chunk`] (a packed batch of records). The protocol layer
/// is generic over this capability, never over concrete record types.
pub trait MarshalPayload {
    /// Serialize into payload bytes.
    fn marshal_payload(&self) -> Bytes;
}

/// Request variant tag. Fixed wire constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    /// A single bet record.
    Bet = 0,
    /// A chunk of length-prefixed bet records.
    BetBatch = 1,
    /// End of batch stream marker (empty payload).
    BetBatchStop = 2,
    /// Ask for the final winners list (empty payload).
    GetWinners = 3,
}

impl TryFrom<u8> for RequestKind {
    type Error = BetwireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(RequestKind::Bet),
            1 => Ok(RequestKind::BetBatch),
            2 => Ok(RequestKind::BetBatchStop),
            3 => Ok(RequestKind::GetWinners),
            other => Err(BetwireError::Protocol(format!(
                "unknown request kind: {}",
                other
            ))),
        }
    }
}

/// A complete request: kind tag, agency identifier and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request variant.
    pub kind: RequestKind,
    /// Client session identifier.
    pub agency_id: u32,
    /// Payload bytes (empty for control requests).
    pub payload: Bytes,
}

impl Request {
    /// Create a request from raw payload bytes.
    pub fn new(kind: RequestKind, agency_id: u32, payload: Bytes) -> Self {
        Self {
            kind,
            agency_id,
            payload,
        }
    }

    /// Create a payload-less control request.
    pub fn control(kind: RequestKind, agency_id: u32) -> Self {
        Self::new(kind, agency_id, Bytes::new())
    }

    /// Create a request by serializing a payload-bearing value.
    pub fn with_payload<M: MarshalPayload>(kind: RequestKind, agency_id: u32, m: &M) -> Self {
        Self::new(kind, agency_id, m.marshal_payload())
    }

    /// Exact byte length of the payload.
    #[inline]
    pub fn payload_size(&self) -> u32 {
        self.payload.len() as u32
    }

    /// Encode the full frame (header + payload) into a contiguous buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(REQUEST_HEADER_SIZE + self.payload.len());
        buf.put_u8(self.kind as u8);
        buf.put_u32_le(self.payload_size());
        buf.put_u32_le(self.agency_id);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Decode a full frame back into a request.
    ///
    /// Rejects short buffers, unknown kinds and payload length mismatches.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < REQUEST_HEADER_SIZE {
            return Err(BetwireError::Protocol(format!(
                "request frame too short: {} bytes",
                buf.len()
            )));
        }
        let kind = RequestKind::try_from(buf[0])?;
        let payload_size = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        let agency_id = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);
        if buf.len() - REQUEST_HEADER_SIZE != payload_size {
            return Err(BetwireError::Protocol(format!(
                "request payload length mismatch: header says {}, got {}",
                payload_size,
                buf.len() - REQUEST_HEADER_SIZE
            )));
        }
        Ok(Self {
            kind,
            agency_id,
            payload: Bytes::copy_from_slice(&buf[REQUEST_HEADER_SIZE..]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRecord(&'static [u8]);

    impl MarshalPayload for StubRecord {
        fn marshal_payload(&self) -> Bytes {
            Bytes::from_static(self.0)
        }
    }

    #[test]
    fn test_encode_layout_little_endian() {
        let req = Request::new(RequestKind::BetBatch, 42, Bytes::from_static(b"hello"));
        let bytes = req.encode();

        assert_eq!(bytes.len(), REQUEST_HEADER_SIZE + 5);
        // Kind
        assert_eq!(bytes[0], 1);
        // Payload size: 5 in LE
        assert_eq!(&bytes[1..5], &[5, 0, 0, 0]);
        // Agency ID: 42 in LE
        assert_eq!(&bytes[5..9], &[42, 0, 0, 0]);
        // Payload
        assert_eq!(&bytes[9..], b"hello");
    }

    #[test]
    fn test_control_request_empty_payload() {
        let req = Request::control(RequestKind::BetBatchStop, 7);
        let bytes = req.encode();

        assert_eq!(bytes.len(), REQUEST_HEADER_SIZE);
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..5], &[0, 0, 0, 0]);
        assert_eq!(&bytes[5..9], &[7, 0, 0, 0]);
    }

    #[test]
    fn test_with_payload_uses_marshaler() {
        let record = StubRecord(b"a,b,c");
        let req = Request::with_payload(RequestKind::Bet, 1, &record);
        assert_eq!(&req.payload[..], b"a,b,c");
        assert_eq!(req.payload_size(), 5);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let original = Request::new(
            RequestKind::BetBatch,
            0xDEAD_BEEF,
            Bytes::from_static(b"payload bytes"),
        );
        let decoded = Request::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_unknown_kind_rejected() {
        let mut bytes = Request::control(RequestKind::GetWinners, 1).encode().to_vec();
        bytes[0] = 9;
        let err = Request::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown request kind"));
    }

    #[test]
    fn test_decode_short_buffer_rejected() {
        let err = Request::decode(&[0u8; 8]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_decode_length_mismatch_rejected() {
        let mut bytes = Request::new(RequestKind::Bet, 1, Bytes::from_static(b"abc"))
            .encode()
            .to_vec();
        bytes.push(0xFF);
        let err = Request::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn test_kind_wire_constants() {
        assert_eq!(RequestKind::Bet as u8, 0);
        assert_eq!(RequestKind::BetBatch as u8, 1);
        assert_eq!(RequestKind::BetBatchStop as u8, 2);
        assert_eq!(RequestKind::GetWinners as u8, 3);
    }
}
