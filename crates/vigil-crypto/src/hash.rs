//! Chain hashing using BLAKE3.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CryptoError;

/// A BLAKE3 chain hash (32 bytes).
///
/// Each audit entry's hash is computed over the canonical encoding of
/// its fields plus the previous entry's hash, so every hash depends on
/// the entire chain before it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainHash([u8; 32]);

impl ChainHash {
    /// The fixed prior hash of sequence 0.
    ///
    /// All zeroes is a synthetic sentinel: it is not the digest of any
    /// input, so it cannot be confused with a real entry hash.
    pub const GENESIS: Self = Self([0u8; 32]);

    /// Hash arbitrary data.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Check if this is the genesis sentinel.
    #[must_use]
    pub fn is_genesis(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHashLength`] if the slice is not
    /// exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| CryptoError::InvalidHashLength { actual: slice.len() })?;
        Ok(Self(bytes))
    }

    /// Encode as a lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from a hex string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHexEncoding`] if the string is not
    /// valid hex, or [`CryptoError::InvalidHashLength`] if it does not
    /// decode to 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ChainHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Default for ChainHash {
    fn default() -> Self {
        Self::GENESIS
    }
}

impl AsRef<[u8]> for ChainHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ChainHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
