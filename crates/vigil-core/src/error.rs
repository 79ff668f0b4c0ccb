//! Core error types.

use thiserror::Error;

/// Errors from foundation-type operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A timestamp was outside the representable range.
    #[error("timestamp out of range: {micros} microseconds")]
    TimestampOutOfRange {
        /// The offending microsecond value.
        micros: i64,
    },

    /// An encoded enum byte did not map to a known variant.
    #[error("invalid {what} encoding: {value}")]
    InvalidEncoding {
        /// What was being decoded.
        what: &'static str,
        /// The unrecognized byte.
        value: u8,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
