//! The `Agent` entity - the autonomous software agent being monitored.
//!
//! Agents are immutable after creation. They are owned by the policy
//! layer; audit entries reference them by [`AgentId`] only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AgentId, PolicyId, Timestamp};

/// Lifecycle status of an agent, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered but not yet cleared to make requests.
    Pending,
    /// Cleared to make outbound requests.
    Active,
    /// Temporarily blocked.
    Suspended,
    /// Permanently retired.
    Deactivated,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Deactivated => write!(f, "deactivated"),
        }
    }
}

/// An autonomous agent subject to outbound access policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier.
    pub agent_id: AgentId,
    /// Human-readable name.
    pub name: String,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Policies assigned to this agent, in assignment order.
    pub policy_ids: Vec<PolicyId>,
    /// When the agent was registered.
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create an active agent with no policies.
    #[must_use]
    pub fn active(name: impl Into<String>) -> Self {
        Self::with_status(name, AgentStatus::Active)
    }

    /// Create an agent with an explicit status.
    #[must_use]
    pub fn with_status(name: impl Into<String>, status: AgentStatus) -> Self {
        Self {
            agent_id: AgentId::new(),
            name: name.into(),
            status,
            policy_ids: Vec::new(),
            created_at: Timestamp::now().into_inner(),
        }
    }

    /// Set the assigned policies (builder style).
    #[must_use]
    pub fn with_policies(mut self, policy_ids: Vec<PolicyId>) -> Self {
        self.policy_ids = policy_ids;
        self
    }

    /// Only active agents may make requests.
    #[must_use]
    pub fn can_make_requests(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_agent_can_make_requests() {
        let agent = Agent::active("crawler");
        assert!(agent.can_make_requests());
        assert_eq!(agent.name, "crawler");
        assert!(agent.policy_ids.is_empty());
    }

    #[test]
    fn non_active_agents_cannot_make_requests() {
        for status in [
            AgentStatus::Pending,
            AgentStatus::Suspended,
            AgentStatus::Deactivated,
        ] {
            let agent = Agent::with_status("crawler", status);
            assert!(!agent.can_make_requests(), "{status} should be blocked");
        }
    }

    #[test]
    fn policies_attach_in_order() {
        let p1 = PolicyId::new();
        let p2 = PolicyId::new();
        let agent = Agent::active("crawler").with_policies(vec![p1, p2]);
        assert_eq!(agent.policy_ids, vec![p1, p2]);
    }
}
