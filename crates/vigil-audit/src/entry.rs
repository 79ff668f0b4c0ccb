//! Draft and finalized audit entry types.

use serde::{Deserialize, Serialize};
use vigil_core::{AccessRequest, AgentId, Decision, EntryId, RequestMethod, Timestamp};
use vigil_crypto::{AuthTag, ChainHash, TagKey};

use crate::canonical;

/// The record the interceptor builds once a decision is reached.
///
/// A draft has everything except chain metadata: no sequence number, no
/// hashes, no tag. Finalization happens inside the chain writer's
/// critical section; a draft that never reaches the writer consumes no
/// sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEntry {
    /// Unique entry identifier, assigned at draft creation.
    pub entry_id: EntryId,
    /// When the decision was reached.
    pub timestamp: Timestamp,
    /// The agent that issued the request.
    pub agent_id: AgentId,
    /// Target domain of the request.
    pub domain: String,
    /// The decision, including the matched policy and reason.
    pub decision: Decision,
    /// Request method.
    pub method: RequestMethod,
    /// Request path.
    pub path: String,
    /// Source address of the agent process.
    pub source_ip: String,
    /// Interceptor processing latency in microseconds.
    pub latency_us: u64,
}

impl DraftEntry {
    /// Build a draft from an intercepted request and its decision.
    #[must_use]
    pub fn from_request(request: &AccessRequest, decision: Decision, latency_us: u64) -> Self {
        Self {
            entry_id: EntryId::new(),
            timestamp: Timestamp::now(),
            agent_id: request.agent_id,
            domain: request.domain.clone(),
            decision,
            method: request.method,
            path: request.path.clone(),
            source_ip: request.source_ip.clone(),
            latency_us,
        }
    }

    /// Override the timestamp (builder style; tests and the writer's
    /// monotonic clamp use this).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Finalize this draft into a chain-linked [`AuditEntry`].
    ///
    /// Computes the entry hash over the canonical encoding of
    /// `(sequence, prior_hash, fields)` and seals it with the writer's
    /// key. Only the chain writer calls this, with exclusive ownership
    /// of the chain state.
    #[must_use]
    pub fn finalize(self, sequence: u64, prior_hash: ChainHash, key: &TagKey) -> AuditEntry {
        let entry_hash = canonical::hash_entry(&prior_hash, sequence, &self);
        let auth_tag = canonical::seal_entry(&entry_hash, key);
        AuditEntry {
            sequence,
            record: self,
            prior_hash,
            entry_hash,
            auth_tag,
        }
    }
}

/// A finalized, immutable audit entry.
///
/// There is no update or delete operation. To correct an entry, append
/// a new one that supersedes it; the original stays in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain; contiguous from 0.
    pub sequence: u64,
    /// The decision record.
    pub record: DraftEntry,
    /// Hash of the previous entry (genesis sentinel for sequence 0).
    pub prior_hash: ChainHash,
    /// Hash over the canonical encoding of this entry.
    pub entry_hash: ChainHash,
    /// Keyed authentication tag over `entry_hash`.
    pub auth_tag: AuthTag,
}

impl AuditEntry {
    /// When the decision was reached.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.record.timestamp
    }

    /// The agent that issued the request.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.record.agent_id
    }

    /// Was the underlying call permitted?
    #[must_use]
    pub const fn is_permitted(&self) -> bool {
        self.record.decision.is_permitted()
    }

    /// Recompute the entry hash from the stored fields.
    #[must_use]
    pub fn recompute_hash(&self) -> ChainHash {
        canonical::hash_entry(&self.prior_hash, self.sequence, &self.record)
    }

    /// Check if this entry correctly follows another.
    #[must_use]
    pub fn follows(&self, previous: &AuditEntry) -> bool {
        self.prior_hash == previous.entry_hash
    }

    /// Check the authentication tag against a key.
    #[must_use]
    pub fn tag_matches(&self, key: &TagKey) -> bool {
        canonical::seal_entry(&self.entry_hash, key) == self.auth_tag
    }
}
