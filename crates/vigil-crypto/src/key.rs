//! The writer's secret tag key, with secure memory handling.

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::ZeroizeOnDrop;

use crate::error::{CryptoError, CryptoResult};
use crate::tag::AuthTag;

/// A 32-byte secret key for authentication tags.
///
/// Held only by the chain writer. The key material is zeroized on drop
/// to prevent leaking sensitive bytes.
#[derive(ZeroizeOnDrop)]
pub struct TagKey {
    key: [u8; 32],
}

impl TagKey {
    /// Generate a new random key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create from existing key material (32 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not
    /// exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self { key })
    }

    /// Compute the authentication tag over a message.
    ///
    /// Keyed BLAKE3: producing a valid tag requires the key, so an
    /// attacker who rewrites the chain cannot forge matching tags.
    #[must_use]
    pub fn seal(&self, message: &[u8]) -> AuthTag {
        AuthTag::from_bytes(*blake3::keyed_hash(&self.key, message).as_bytes())
    }

    /// A short identifier for logs: the first 8 bytes of the key's own
    /// digest. Does not reveal key material.
    #[must_use]
    pub fn key_id_hex(&self) -> String {
        let digest = blake3::hash(&self.key);
        hex::encode(&digest.as_bytes()[..8])
    }
}

impl std::fmt::Debug for TagKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagKey")
            .field("key_id", &self.key_id_hex())
            .finish_non_exhaustive()
    }
}
