//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vigil_crypto::prelude::*;` to import all essential types.

pub use crate::error::{CryptoError, CryptoResult};
pub use crate::hash::ChainHash;
pub use crate::key::TagKey;
pub use crate::tag::AuthTag;
