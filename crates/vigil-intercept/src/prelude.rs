//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vigil_intercept::prelude::*;` to import all essential types.

pub use crate::cooperative::CooperativeInterceptor;
pub use crate::error::{ChainError, ChainResult};
pub use crate::pipeline::Pipeline;
pub use crate::script::{ScriptOutcome, outcomes};
pub use crate::threaded::ThreadedInterceptor;
pub use crate::writer::{ChainHandle, ChainWriter};
