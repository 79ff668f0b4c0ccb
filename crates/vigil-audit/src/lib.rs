//! Vigil Audit - tamper-evident audit entries.
//!
//! This crate provides:
//! - [`DraftEntry`] - the record the interceptor builds once a decision
//!   is reached, before the chain writer finalizes it
//! - [`AuditEntry`] - the finalized, chain-linked record
//! - Canonical byte encoding and entry hashing
//! - Chain and tag verification
//!
//! # Security Model
//!
//! Every finalized entry carries:
//! - A sequence number (contiguous from 0)
//! - The previous entry's hash (`prior_hash`; sequence 0 links to a
//!   fixed genesis sentinel)
//! - Its own hash over a canonical encoding of all fields
//! - A keyed authentication tag over that hash
//!
//! The chain linking provides tamper evidence: modifying, deleting, or
//! reordering any entry breaks every hash that follows. Chain breaks
//! are detectable without the secret key; the tag check is the
//! separate, stronger check that requires it.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod canonical;
mod entry;
mod verify;

pub use canonical::{hash_entry, seal_entry};
pub use entry::{AuditEntry, DraftEntry};
pub use verify::{ChainStatus, TagStatus, TamperKind, verify_chain, verify_range, verify_tags};
