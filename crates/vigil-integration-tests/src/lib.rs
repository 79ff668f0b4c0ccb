//! Shared fixtures for the integration tests.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;
use vigil_core::{Agent, AgentId, PolicyId};
use vigil_crypto::TagKey;
use vigil_gate::{AgentRegistry, Policy, PolicyCache, PolicyRule, RuleGate};
use vigil_intercept::{ChainWriter, Pipeline};
use vigil_store::ColumnarStore;

/// The deterministic policy world every fixture evaluates against:
/// an active agent holding one policy that allows `*.ok.example.com`
/// and one that denies `*.blocked.example.com`, both window-less and
/// therefore time-independent. Anything else is `NoMatchingPolicy`.
pub struct World {
    /// Agent registry with one active agent.
    pub registry: Arc<AgentRegistry>,
    /// Policy cache with the two policies.
    pub cache: Arc<PolicyCache>,
    /// The registered agent.
    pub agent_id: AgentId,
    /// The allow policy's ID (expected on allowed outcomes).
    pub allow_policy_id: PolicyId,
}

impl World {
    /// Build the world.
    #[must_use]
    pub fn new() -> Self {
        init_tracing();

        let allow =
            Policy::active("allow-ok", 10).with_rule(PolicyRule::allow("*.ok.example.com", 10));
        let deny = Policy::active("deny-blocked", 20)
            .with_rule(PolicyRule::deny("*.blocked.example.com", 10));
        let allow_policy_id = allow.policy_id;

        let cache = Arc::new(PolicyCache::new());
        let policy_ids = vec![allow.policy_id, deny.policy_id];
        cache.insert(allow);
        cache.insert(deny);

        let registry = Arc::new(AgentRegistry::new());
        let agent_id =
            registry.register(Agent::active("scripted-agent").with_policies(policy_ids));

        Self {
            registry,
            cache,
            agent_id,
            allow_policy_id,
        }
    }

    /// Wire a fresh chain (store + writer + pipeline) over this world.
    #[must_use]
    pub fn chain(&self) -> Fixture {
        self.chain_with(Arc::new(ColumnarStore::new()), TagKey::generate())
    }

    /// Wire a chain over an existing store and key (persistence tests).
    #[must_use]
    pub fn chain_with(&self, store: Arc<ColumnarStore>, key: TagKey) -> Fixture {
        let writer = ChainWriter::spawn(Arc::clone(&store), key).expect("spawn chain writer");
        let gate = Arc::new(RuleGate::new(Arc::clone(&self.cache)));
        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&self.registry),
            gate,
            writer.handle(),
        ));

        Fixture {
            store,
            writer,
            pipeline,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// One wired chain: store, writer, pipeline.
pub struct Fixture {
    /// The backing store.
    pub store: Arc<ColumnarStore>,
    /// The writer; shut down after dropping interceptors.
    pub writer: ChainWriter,
    /// The shared pipeline.
    pub pipeline: Arc<Pipeline>,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
