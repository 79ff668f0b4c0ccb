//! Store error types.

use thiserror::Error;

/// Errors from the columnar audit store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An append arrived with the wrong sequence number. This is a
    /// coordination bug, never expected in correct operation; the chain
    /// writer treats it as fatal and halts further writes.
    #[error("non-contiguous append: expected sequence {expected}, got {actual}")]
    NonContiguous {
        /// The next sequence the store will accept.
        expected: u64,
        /// The sequence number of the rejected entry.
        actual: u64,
    },

    /// An append would break the sorted-timestamp invariant the range
    /// query relies on.
    #[error("out-of-order append: timestamp {attempted}us precedes store head {head}us")]
    OutOfOrderTimestamp {
        /// Microsecond timestamp of the current store head.
        head: i64,
        /// Microsecond timestamp of the rejected entry.
        attempted: i64,
    },

    /// No entry with the requested sequence number.
    #[error("no entry with sequence {sequence}")]
    NotFound {
        /// The requested sequence number.
        sequence: u64,
    },

    /// A column held a value that does not decode - the store (or a
    /// loaded snapshot) is damaged.
    #[error("corrupt value in {column} column at index {index}")]
    CorruptColumn {
        /// Which column failed to decode.
        column: &'static str,
        /// Row index of the bad value.
        index: usize,
    },

    /// A loaded snapshot violated a structural invariant.
    #[error("corrupt snapshot: {reason}")]
    CorruptSnapshot {
        /// What was wrong.
        reason: String,
    },

    /// Snapshot I/O failure.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding failure.
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
