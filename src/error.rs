//! Error types for betwire.

use thiserror::Error;

/// Main error type for all betwire operations.
#[derive(Debug, Error)]
pub enum BetwireError {
    /// I/O error during socket or file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A record failed field validation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Malformed input line, tagged with its 1-based line number.
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// Protocol error (unknown kind, malformed payload, desynchronization).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A single framed record exceeds the chunk byte capacity.
    /// This is a configuration error, not a runtime condition.
    #[error("record of {record} framed bytes cannot fit in a chunk of {max_size} bytes")]
    RecordTooLarge { record: usize, max_size: usize },

    /// A socket operation exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The readiness poll exhausted its retry budget.
    #[error("server not ready after {retries} attempts")]
    RetriesExhausted { retries: u32 },

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// The session was stopped by the shared done-signal.
    #[error("session cancelled")]
    Cancelled,
}

/// Result type alias using BetwireError.
pub type Result<T> = std::result::Result<T, BetwireError>;
