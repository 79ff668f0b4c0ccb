//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid chain hash length.
    #[error("invalid chain hash length: expected 32, got {actual}")]
    InvalidHashLength {
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid authentication tag length.
    #[error("invalid auth tag length: expected 32, got {actual}")]
    InvalidTagLength {
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
