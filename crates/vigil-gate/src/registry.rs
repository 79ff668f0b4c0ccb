//! Agent registry, striped by agent ID.

use dashmap::DashMap;
use std::sync::Arc;
use vigil_core::{Agent, AgentId};

/// Thread-safe agent registry. Agents are immutable, so lookups hand
/// out shared `Arc` references.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: DashMap<AgentId, Arc<Agent>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, returning its ID.
    pub fn register(&self, agent: Agent) -> AgentId {
        let id = agent.agent_id;
        self.agents.insert(id, Arc::new(agent));
        id
    }

    /// Look up an agent by ID.
    #[must_use]
    pub fn get(&self, agent_id: AgentId) -> Option<Arc<Agent>> {
        self.agents
            .get(&agent_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
