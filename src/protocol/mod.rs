//! Wire protocol: request/response framing and typed payloads.
//!
//! Requests and responses share a length-prefixed layout with a small
//! fixed header and Little Endian integers. See `request` and `response`
//! for the exact byte layouts.

pub mod request;
pub mod response;

pub use request::{MarshalPayload, Request, RequestKind, REQUEST_HEADER_SIZE};
pub use response::{Acknowledge, Response, ResponseKind, Winners, RESPONSE_HEADER_SIZE};
