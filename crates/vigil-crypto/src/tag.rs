//! Keyed authentication tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

/// A keyed authentication tag over an entry hash (32 bytes).
///
/// Equality is constant-time.
#[derive(Clone, Copy)]
pub struct AuthTag([u8; 32]);

impl AuthTag {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidTagLength`] if the slice is not
    /// exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| CryptoError::InvalidTagLength { actual: slice.len() })?;
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
    /// valid hex, or [`CryptoError::InvalidTagLength`] if it does not
    /// decode to 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::try_from_slice(&bytes)
    }
}

impl PartialEq for AuthTag {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time: tag comparison must not leak how many leading
        // bytes matched.
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for AuthTag {}

impl fmt::Debug for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthTag({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for AuthTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AuthTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_and_inequality() {
        let a = AuthTag::from_bytes([1u8; 32]);
        let b = AuthTag::from_bytes([1u8; 32]);
        let c = AuthTag::from_bytes([2u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hex_round_trip() {
        let tag = AuthTag::from_bytes([0xab; 32]);
        let decoded = AuthTag::from_hex(&tag.to_hex()).unwrap();
        assert_eq!(tag, decoded);
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(AuthTag::try_from_slice(&[0u8; 31]).is_err());
        assert!(AuthTag::from_hex("00ff").is_err());
    }

    #[test]
    fn serde_as_hex_string() {
        let tag = AuthTag::from_bytes([0x5c; 32]);
        let json = serde_json::to_string(&tag).unwrap();
        let decoded: AuthTag = serde_json::from_str(&json).unwrap();
        assert_eq!(tag, decoded);
    }
}
