//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vigil_audit::prelude::*;` to import all essential types.

pub use crate::canonical::{hash_entry, seal_entry};
pub use crate::entry::{AuditEntry, DraftEntry};
pub use crate::verify::{
    ChainStatus, TagStatus, TamperKind, verify_chain, verify_range, verify_tags,
};
