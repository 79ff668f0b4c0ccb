//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vigil_store::prelude::*;` to import all essential types.

pub use crate::columnar::ColumnarStore;
pub use crate::error::{StoreError, StoreResult};
