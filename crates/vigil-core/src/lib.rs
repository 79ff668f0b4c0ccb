//! Vigil Core - Foundation types for the decision-and-audit pipeline.
//!
//! This crate provides:
//! - Identifier newtypes used throughout the pipeline
//! - The `Agent` entity and the `AccessRequest` it issues
//! - `Decision` and `Verdict` - the outcome of a policy evaluation
//! - Retry utilities with exponential backoff

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod agent;
pub mod decision;
pub mod error;
pub mod request;
pub mod retry;
pub mod types;

pub use agent::{Agent, AgentStatus};
pub use decision::{Decision, Verdict};
pub use error::{CoreError, CoreResult};
pub use request::{AccessRequest, RequestMethod};
pub use retry::{RetryConfig, RetryOutcome, retry, retry_blocking};
pub use types::{AgentId, EntryId, PolicyId, RuleId, Timestamp};
