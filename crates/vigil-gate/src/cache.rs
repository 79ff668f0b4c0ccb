//! Concurrent policy cache, striped by policy ID.
//!
//! Backed by a sharded map, so lookups of independent keys never
//! contend; only same-key operations share a stripe. Policies are held
//! behind `Arc`, giving readers stable snapshots no matter what a
//! concurrent writer replaces.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use vigil_core::{Agent, PolicyId};

use crate::policy::Policy;

/// Thread-safe policy cache.
#[derive(Debug, Default)]
pub struct PolicyCache {
    policies: DashMap<PolicyId, Arc<Policy>>,
}

impl PolicyCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a policy, replacing any previous version with the same ID.
    pub fn insert(&self, policy: Policy) {
        debug!(policy_id = %policy.policy_id, name = %policy.name, "cached policy");
        self.policies.insert(policy.policy_id, Arc::new(policy));
    }

    /// Retrieve one policy by ID.
    #[must_use]
    pub fn get(&self, policy_id: PolicyId) -> Option<Arc<Policy>> {
        self.policies
            .get(&policy_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a policy. Returns true if it existed.
    pub fn remove(&self, policy_id: PolicyId) -> bool {
        self.policies.remove(&policy_id).is_some()
    }

    /// Number of cached policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Snapshot the policies assigned to an agent, in assignment order.
    ///
    /// Assignments naming a policy the cache does not hold are skipped;
    /// the evaluator treats them as absent.
    #[must_use]
    pub fn policies_for(&self, agent: &Agent) -> Vec<Arc<Policy>> {
        agent
            .policy_ids
            .iter()
            .filter_map(|id| self.get(*id))
            .collect()
    }
}
