//! Vigil Crypto - chain hashing and keyed authentication tags.
//!
//! This crate provides:
//! - [`ChainHash`] - the BLAKE3 digest that links audit entries
//! - [`TagKey`] - the writer's secret key, zeroized on drop
//! - [`AuthTag`] - a keyed authentication tag over an entry hash
//!
//! # Security Model
//!
//! The hash chain is unkeyed: anyone holding the entries can recompute
//! it and detect modification, deletion, or reordering. The
//! authentication tag is keyed: an attacker who alters an entry and
//! recomputes the chain still cannot produce valid tags without the
//! writer's secret. Tag comparison is constant-time.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod key;
mod tag;

pub use error::{CryptoError, CryptoResult};
pub use hash::ChainHash;
pub use key::TagKey;
pub use tag::AuthTag;
