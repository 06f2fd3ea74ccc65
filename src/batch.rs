//! Bounded-capacity chunk packing.
//!
//! A [`Chunk`] holds length-prefixed serialized records up to two
//! independent limits: a record count and a total byte capacity. The
//! [`Batcher`] owns the chunks, keeps exactly one open for pushes and
//! yields completed chunks in the order they filled up.
//!
//! Detecting fullness at push time while delivering separately lets the
//! session emit a batch request as soon as a chunk saturates without
//! blocking ingestion of further records.

use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BetwireError, Result};
use crate::protocol::MarshalPayload;

/// Per-record length prefix size (4-byte Little Endian u32).
pub const RECORD_LEN_PREFIX: usize = 4;

/// An ordered buffer of length-prefixed serialized records.
///
/// Mutated only by the batcher while open; immutable once sealed.
#[derive(Debug)]
pub struct Chunk {
    buf: BytesMut,
    count: usize,
    max_count: usize,
    max_size: usize,
    full: bool,
}

impl Chunk {
    fn new(max_count: usize, max_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_size),
            count: 0,
            max_count,
            max_size,
            full: false,
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True if no record has been pushed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Encoded byte length, per-record prefixes included.
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// True once the chunk stopped accepting records.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Append a framed record if both limits allow it.
    fn try_push(&mut self, record: &[u8]) -> bool {
        if self.count == self.max_count
            || self.buf.len() + RECORD_LEN_PREFIX + record.len() >= self.max_size
        {
            return false;
        }
        self.buf.put_u32_le(record.len() as u32);
        self.buf.extend_from_slice(record);
        self.count += 1;
        debug_assert!(self.buf.len() <= self.max_size);
        true
    }

    fn seal(&mut self) {
        self.full = true;
    }
}

/// A chunk is itself a request payload; the session hands it straight to
/// the protocol layer.
impl MarshalPayload for Chunk {
    fn marshal_payload(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }
}

/// Packs records into chunks and hands completed chunks out in FIFO order.
///
/// The lifetime of a batcher spans one client session. It is owned by a
/// single pipeline stage; no internal locking.
#[derive(Debug)]
pub struct Batcher {
    current: Option<Chunk>,
    completed: VecDeque<Chunk>,
    pushed: bool,
    max_count: usize,
    max_size: usize,
}

impl Batcher {
    /// Create a batcher with the given per-chunk limits.
    pub fn new(max_count: usize, max_size: usize) -> Self {
        Self {
            current: None,
            completed: VecDeque::new(),
            pushed: false,
            max_count,
            max_size,
        }
    }

    /// Serialize a record and append it, sealing and replacing the current
    /// chunk when either limit would be breached.
    ///
    /// # Errors
    ///
    /// [`BetwireError::RecordTooLarge`] if the framed record cannot fit
    /// even in an empty chunk; the configured `max_size` is smaller than
    /// one record and nothing can be recovered at runtime.
    pub fn push<M: MarshalPayload>(&mut self, record: &M) -> Result<()> {
        let bytes = record.marshal_payload();
        self.pushed = true;
        let chunk = self
            .current
            .get_or_insert_with(|| Chunk::new(self.max_count, self.max_size));
        if !chunk.try_push(&bytes) {
            self.seal_current();
            let mut fresh = Chunk::new(self.max_count, self.max_size);
            if !fresh.try_push(&bytes) {
                return Err(BetwireError::RecordTooLarge {
                    record: RECORD_LEN_PREFIX + bytes.len(),
                    max_size: self.max_size,
                });
            }
            self.current = Some(fresh);
        }
        // The count limit is observable at push time; seal eagerly so the
        // chunk is deliverable without waiting for the next overflow.
        if self
            .current
            .as_ref()
            .is_some_and(|c| c.count == c.max_count)
        {
            self.seal_current();
        }
        Ok(())
    }

    fn seal_current(&mut self) {
        if let Some(mut chunk) = self.current.take() {
            chunk.seal();
            self.completed.push_back(chunk);
        }
    }

    /// Take the oldest completed chunk, if any. Never returns the open
    /// chunk and never blocks.
    pub fn next(&mut self) -> Option<Chunk> {
        self.completed.pop_front()
    }

    /// Drain every chunk for end-of-stream delivery, the still-open one
    /// included. Returns `None` only if nothing was ever pushed.
    pub fn flush(&mut self) -> Option<Vec<Chunk>> {
        if !self.pushed {
            return None;
        }
        let mut chunks: Vec<Chunk> = self.completed.drain(..).collect();
        if let Some(open) = self.current.take() {
            chunks.push(open);
        }
        Some(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubRecord {
        counter: u32,
    }

    impl StubRecord {
        fn new() -> Self {
            Self { counter: 0 }
        }

        fn next(&mut self) -> FixedRecord {
            self.counter += 1;
            FixedRecord(self.counter.to_le_bytes().to_vec())
        }
    }

    struct FixedRecord(Vec<u8>);

    impl MarshalPayload for FixedRecord {
        fn marshal_payload(&self) -> Bytes {
            Bytes::from(self.0.clone())
        }
    }

    #[test]
    fn test_single_chunk_holds_records_in_push_order() {
        let mut batcher = Batcher::new(3, 8 * 1024);
        let mut stub = StubRecord::new();
        for _ in 0..3 {
            batcher.push(&stub.next()).unwrap();
        }

        let chunk = batcher.next().expect("count limit seals the chunk");
        assert_eq!(chunk.len(), 3);

        let mut want = Vec::new();
        for i in 1u32..=3 {
            want.extend_from_slice(&4u32.to_le_bytes());
            want.extend_from_slice(&i.to_le_bytes());
        }
        assert_eq!(&chunk.marshal_payload()[..], &want[..]);
    }

    #[test]
    fn test_next_on_open_chunk_is_none() {
        let mut batcher = Batcher::new(3, 8 * 1024);
        let mut stub = StubRecord::new();
        for _ in 0..3 {
            batcher.push(&stub.next()).unwrap();
        }
        assert!(batcher.next().is_some());

        // A fourth push opens a fresh chunk, not yet deliverable.
        batcher.push(&stub.next()).unwrap();
        assert!(batcher.next().is_none());
    }

    #[test]
    fn test_byte_capacity_overflow_starts_new_chunk() {
        // Each record frames to 4 + 10 bytes; the strict limit admits two.
        let mut batcher = Batcher::new(100, 42);
        for _ in 0..3 {
            batcher.push(&FixedRecord(vec![0xAB; 10])).unwrap();
        }

        let first = batcher.next().expect("overflow seals the first chunk");
        assert_eq!(first.len(), 2);
        assert_eq!(first.byte_len(), 28);
        assert!(first.is_full());
        assert!(batcher.next().is_none());
    }

    #[test]
    fn test_completed_chunks_fifo() {
        let mut batcher = Batcher::new(1, 8 * 1024);
        let mut stub = StubRecord::new();
        for _ in 0..3 {
            batcher.push(&stub.next()).unwrap();
        }

        for i in 1u32..=3 {
            let chunk = batcher.next().unwrap();
            assert_eq!(&chunk.marshal_payload()[RECORD_LEN_PREFIX..], &i.to_le_bytes());
        }
        assert!(batcher.next().is_none());
    }

    #[test]
    fn test_limits_never_exceeded() {
        let max_count = 4;
        let max_size = 64;
        let mut batcher = Batcher::new(max_count, max_size);
        for i in 0..50u32 {
            batcher.push(&FixedRecord(vec![i as u8; 1 + (i as usize % 7)])).unwrap();
        }
        let chunks = batcher.flush().unwrap();
        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(chunk.len() <= max_count);
            assert!(chunk.byte_len() <= max_size);
        }
    }

    #[test]
    fn test_flush_includes_open_chunk() {
        let mut batcher = Batcher::new(3, 8 * 1024);
        let mut stub = StubRecord::new();
        for _ in 0..4 {
            batcher.push(&stub.next()).unwrap();
        }

        let chunks = batcher.flush().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 3);
        assert!(chunks[0].is_full());
        assert_eq!(chunks[1].len(), 1);
        assert!(!chunks[1].is_full());
    }

    #[test]
    fn test_flush_without_pushes_is_none() {
        let mut batcher = Batcher::new(3, 8 * 1024);
        assert!(batcher.flush().is_none());
    }

    #[test]
    fn test_record_too_large_is_fatal() {
        let mut batcher = Batcher::new(10, 8);
        let err = batcher.push(&FixedRecord(vec![0; 8])).unwrap_err();
        assert!(matches!(
            err,
            BetwireError::RecordTooLarge {
                record: 12,
                max_size: 8
            }
        ));
    }
}
