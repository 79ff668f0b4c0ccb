//! Prelude module - commonly used types for convenient import.
//!
//! Use `use vigil_gate::prelude::*;` to import all essential types.

pub use crate::cache::PolicyCache;
pub use crate::error::{GateError, GateResult};
pub use crate::gate::{PolicyGate, RuleGate};
pub use crate::policy::{Policy, PolicyRule, PolicyStatus, RuleAction, TimeWindow};
pub use crate::registry::AgentRegistry;
