//! Chain-extension error types.

use thiserror::Error;
use vigil_store::StoreError;

/// Errors from the chain-extension path.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The writer's work queue is full. Transient backpressure, not a
    /// data error - callers retry with backoff.
    #[error("chain writer queue is full")]
    QueueFull,

    /// The writer observed an internal consistency violation (a
    /// sequence gap on append) and refuses all further writes.
    #[error("chain writer halted after an internal consistency violation")]
    Halted,

    /// The writer thread is no longer running.
    #[error("chain writer is gone")]
    WriterGone,

    /// The store rejected the append; the chain state did not advance
    /// and no sequence number was consumed.
    #[error("chain extension failed: {0}")]
    Store(#[from] StoreError),

    /// The writer thread could not be spawned.
    #[error("failed to spawn chain writer thread: {0}")]
    Spawn(std::io::Error),
}

impl ChainError {
    /// Whether a caller should retry after backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull)
    }
}

/// Result type for chain-extension operations.
pub type ChainResult<T> = Result<T, ChainError>;
