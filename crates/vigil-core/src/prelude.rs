//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vigil_core::prelude::*;` to import all essential types.

pub use crate::agent::{Agent, AgentStatus};
pub use crate::decision::{Decision, Verdict};
pub use crate::error::{CoreError, CoreResult};
pub use crate::request::{AccessRequest, RequestMethod};
pub use crate::retry::{RetryConfig, RetryOutcome};
pub use crate::types::{AgentId, EntryId, PolicyId, RuleId, Timestamp};
