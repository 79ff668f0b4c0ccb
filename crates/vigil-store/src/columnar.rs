//! The columnar store proper.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;
use vigil_audit::{AuditEntry, DraftEntry};
use vigil_core::{
    AgentId, Decision, EntryId, PolicyId, RequestMethod, RuleId, Timestamp, Verdict,
};
use vigil_crypto::{AuthTag, ChainHash};

use crate::error::{StoreError, StoreResult};

/// Struct-of-arrays layout: one ordered column per entry field, all the
/// same length, indexed by sequence number.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Columns {
    pub(crate) timestamps: Vec<i64>,
    pub(crate) entry_ids: Vec<Uuid>,
    pub(crate) agent_ids: Vec<Uuid>,
    pub(crate) domains: Vec<String>,
    pub(crate) verdicts: Vec<u8>,
    pub(crate) reasons: Vec<String>,
    pub(crate) policy_ids: Vec<Option<Uuid>>,
    pub(crate) rule_ids: Vec<Option<Uuid>>,
    pub(crate) methods: Vec<u8>,
    pub(crate) paths: Vec<String>,
    pub(crate) source_ips: Vec<String>,
    pub(crate) latencies: Vec<u64>,
    pub(crate) prior_hashes: Vec<ChainHash>,
    pub(crate) entry_hashes: Vec<ChainHash>,
    pub(crate) auth_tags: Vec<AuthTag>,
}

impl Columns {
    pub(crate) fn len(&self) -> usize {
        self.timestamps.len()
    }

    fn push(&mut self, entry: &AuditEntry) {
        let record = &entry.record;
        self.timestamps.push(record.timestamp.as_micros());
        self.entry_ids.push(record.entry_id.0);
        self.agent_ids.push(record.agent_id.0);
        self.domains.push(record.domain.clone());
        self.verdicts.push(record.decision.verdict.as_u8());
        self.reasons.push(record.decision.reason.clone());
        self.policy_ids
            .push(record.decision.matched_policy_id.map(|id| id.0));
        self.rule_ids
            .push(record.decision.matched_rule_id.map(|id| id.0));
        self.methods.push(record.method.as_u8());
        self.paths.push(record.path.clone());
        self.source_ips.push(record.source_ip.clone());
        self.latencies.push(record.latency_us);
        self.prior_hashes.push(entry.prior_hash);
        self.entry_hashes.push(entry.entry_hash);
        self.auth_tags.push(entry.auth_tag);
    }

    /// Rebuild an entry from the column values at one index.
    ///
    /// This is the cost of the columnar layout: reconstruction gathers
    /// values from every column. Worth it when a query touches a
    /// fraction of the rows.
    fn reconstruct(&self, index: usize) -> StoreResult<AuditEntry> {
        let timestamp = Timestamp::from_micros(self.timestamps[index]).ok_or(
            StoreError::CorruptColumn {
                column: "timestamps",
                index,
            },
        )?;
        let verdict =
            Verdict::from_u8(self.verdicts[index]).ok_or(StoreError::CorruptColumn {
                column: "verdicts",
                index,
            })?;
        let method =
            RequestMethod::from_u8(self.methods[index]).ok_or(StoreError::CorruptColumn {
                column: "methods",
                index,
            })?;

        let record = DraftEntry {
            entry_id: EntryId::from_uuid(self.entry_ids[index]),
            timestamp,
            agent_id: AgentId::from_uuid(self.agent_ids[index]),
            domain: self.domains[index].clone(),
            decision: Decision {
                verdict,
                matched_policy_id: self.policy_ids[index].map(PolicyId::from_uuid),
                matched_rule_id: self.rule_ids[index].map(RuleId::from_uuid),
                reason: self.reasons[index].clone(),
            },
            method,
            path: self.paths[index].clone(),
            source_ip: self.source_ips[index].clone(),
            latency_us: self.latencies[index],
        };

        Ok(AuditEntry {
            sequence: index as u64,
            record,
            prior_hash: self.prior_hashes[index],
            entry_hash: self.entry_hashes[index],
            auth_tag: self.auth_tags[index],
        })
    }
}

/// Append-only, time-ordered columnar audit store.
///
/// INVARIANTS:
/// - `entry.sequence == len()` on every append (contiguity)
/// - timestamps are non-decreasing in append order (enables binary
///   search on the timestamp column)
#[derive(Debug, Default)]
pub struct ColumnarStore {
    inner: RwLock<Columns>,
}

impl ColumnarStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_columns(columns: Columns) -> Self {
        Self {
            inner: RwLock::new(columns),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Columns> {
        // A panicking appender cannot leave a partially-pushed row:
        // appends validate before touching any column, so a poisoned
        // lock still guards consistent data.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Columns> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a finalized entry.
    ///
    /// The entry is visible to readers only once this returns.
    ///
    /// # Errors
    ///
    /// [`StoreError::NonContiguous`] if `entry.sequence` is not exactly
    /// the current length, [`StoreError::OutOfOrderTimestamp`] if the
    /// entry's timestamp precedes the store head's.
    pub fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        let mut columns = self.write();

        let expected = columns.len() as u64;
        if entry.sequence != expected {
            return Err(StoreError::NonContiguous {
                expected,
                actual: entry.sequence,
            });
        }

        let micros = entry.record.timestamp.as_micros();
        if let Some(head) = columns.timestamps.last().copied()
            && micros < head
        {
            return Err(StoreError::OutOfOrderTimestamp {
                head,
                attempted: micros,
            });
        }

        columns.push(entry);
        debug!(sequence = entry.sequence, "appended audit entry");
        Ok(())
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The hash of the most recent entry, if any.
    #[must_use]
    pub fn head_hash(&self) -> Option<ChainHash> {
        self.read().entry_hashes.last().copied()
    }

    /// The timestamp of the most recent entry, if any.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        let columns = self.read();
        columns
            .timestamps
            .last()
            .and_then(|micros| Timestamp::from_micros(*micros))
    }

    /// Fetch one entry by sequence number.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the sequence does not exist.
    pub fn get_by_sequence(&self, sequence: u64) -> StoreResult<AuditEntry> {
        let columns = self.read();
        let index = usize::try_from(sequence).map_err(|_| StoreError::NotFound { sequence })?;
        if index >= columns.len() {
            return Err(StoreError::NotFound { sequence });
        }
        columns.reconstruct(index)
    }

    /// All entries with `start <= timestamp <= end`, in sequence order.
    ///
    /// Binary search on the timestamp column locates the boundaries;
    /// only the matching slice is reconstructed. O(log n + k).
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptColumn`] if a stored value fails to decode.
    pub fn range_query(&self, start: Timestamp, end: Timestamp) -> StoreResult<Vec<AuditEntry>> {
        let start_us = start.as_micros();
        let end_us = end.as_micros();
        let columns = self.read();

        let left = columns.timestamps.partition_point(|&t| t < start_us);
        let right = columns.timestamps.partition_point(|&t| t <= end_us);

        (left..right).map(|i| columns.reconstruct(i)).collect()
    }

    /// All entries for one agent, in sequence order. Linear scan over
    /// the agent-id column.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptColumn`] if a stored value fails to decode.
    pub fn query_by_agent(&self, agent_id: AgentId) -> StoreResult<Vec<AuditEntry>> {
        let columns = self.read();
        (0..columns.len())
            .filter(|&i| columns.agent_ids[i] == agent_id.0)
            .map(|i| columns.reconstruct(i))
            .collect()
    }

    /// All entries for one domain, in sequence order.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptColumn`] if a stored value fails to decode.
    pub fn query_by_domain(&self, domain: &str) -> StoreResult<Vec<AuditEntry>> {
        let columns = self.read();
        (0..columns.len())
            .filter(|&i| columns.domains[i] == domain)
            .map(|i| columns.reconstruct(i))
            .collect()
    }

    /// All entries with one verdict, in sequence order. The verdict
    /// column is a contiguous byte array, so this scan is cheap.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptColumn`] if a stored value fails to decode.
    pub fn query_by_verdict(&self, verdict: Verdict) -> StoreResult<Vec<AuditEntry>> {
        let byte = verdict.as_u8();
        let columns = self.read();
        (0..columns.len())
            .filter(|&i| columns.verdicts[i] == byte)
            .map(|i| columns.reconstruct(i))
            .collect()
    }

    /// Reconstruct every entry, in sequence order - the input to a full
    /// verification pass.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptColumn`] if a stored value fails to decode.
    pub fn snapshot_all(&self) -> StoreResult<Vec<AuditEntry>> {
        let columns = self.read();
        (0..columns.len()).map(|i| columns.reconstruct(i)).collect()
    }

    /// Verify the whole stored chain from the genesis sentinel.
    ///
    /// Read-only; concurrent appends extend the chain behind the
    /// snapshot this verifies.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptColumn`] if a stored value fails to decode.
    pub fn verify_chain(&self) -> StoreResult<vigil_audit::ChainStatus> {
        Ok(vigil_audit::verify_chain(&self.snapshot_all()?))
    }

    pub(crate) fn with_columns<T>(&self, f: impl FnOnce(&Columns) -> T) -> T {
        f(&self.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_audit::DraftEntry;
    use vigil_core::AccessRequest;
    use vigil_crypto::TagKey;

    fn entry_at(
        key: &TagKey,
        prior: ChainHash,
        sequence: u64,
        micros: i64,
        domain: &str,
    ) -> AuditEntry {
        let request = AccessRequest::get(AgentId::new(), domain, "/");
        DraftEntry::from_request(&request, Decision::deny("blocked"), 5)
            .with_timestamp(Timestamp::from_micros(micros).unwrap())
            .finalize(sequence, prior, key)
    }

    fn filled_store(key: &TagKey, micros: &[i64]) -> ColumnarStore {
        let store = ColumnarStore::new();
        let mut prior = ChainHash::GENESIS;
        for (seq, &m) in micros.iter().enumerate() {
            let entry = entry_at(key, prior, seq as u64, m, "api.example.com");
            prior = entry.entry_hash;
            store.append(&entry).unwrap();
        }
        store
    }

    #[test]
    fn append_assigns_visible_rows() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[1, 2, 3]);
        assert_eq!(store.len(), 3);
        let e = store.get_by_sequence(1).unwrap();
        assert_eq!(e.sequence, 1);
        assert_eq!(e.record.timestamp.as_micros(), 2);
        assert_eq!(e.recompute_hash(), e.entry_hash);
    }

    #[test]
    fn rejects_non_contiguous_sequence() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[1]);
        let stray = entry_at(&key, ChainHash::GENESIS, 5, 10, "api.example.com");
        assert!(matches!(
            store.append(&stray),
            Err(StoreError::NonContiguous {
                expected: 1,
                actual: 5
            })
        ));
        // The failed append left nothing behind.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rejects_out_of_order_timestamp() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[100]);
        let head = store.head_hash().unwrap();
        let stale = entry_at(&key, head, 1, 50, "api.example.com");
        assert!(matches!(
            store.append(&stale),
            Err(StoreError::OutOfOrderTimestamp {
                head: 100,
                attempted: 50
            })
        ));
    }

    #[test]
    fn equal_timestamps_are_accepted() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[7, 7, 7]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn range_query_is_inclusive_on_both_ends() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[1, 5, 10, 12]);

        let hits = store
            .range_query(
                Timestamp::from_micros(4).unwrap(),
                Timestamp::from_micros(11).unwrap(),
            )
            .unwrap();
        let micros: Vec<i64> = hits.iter().map(|e| e.record.timestamp.as_micros()).collect();
        assert_eq!(micros, vec![5, 10]);

        // Exact boundary values are included.
        let hits = store
            .range_query(
                Timestamp::from_micros(5).unwrap(),
                Timestamp::from_micros(10).unwrap(),
            )
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn range_query_outside_data_is_empty() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[1, 5]);
        let hits = store
            .range_query(
                Timestamp::from_micros(100).unwrap(),
                Timestamp::from_micros(200).unwrap(),
            )
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn get_by_sequence_not_found() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[1]);
        assert!(matches!(
            store.get_by_sequence(9),
            Err(StoreError::NotFound { sequence: 9 })
        ));
    }

    #[test]
    fn secondary_scans_filter_correctly() {
        let key = TagKey::generate();
        let store = ColumnarStore::new();
        let agent_a = AgentId::new();
        let agent_b = AgentId::new();
        let mut prior = ChainHash::GENESIS;
        for (seq, (agent, domain)) in [
            (agent_a, "one.example.com"),
            (agent_b, "two.example.com"),
            (agent_a, "one.example.com"),
        ]
        .into_iter()
        .enumerate()
        {
            let request = AccessRequest::get(agent, domain, "/");
            let entry = DraftEntry::from_request(&request, Decision::deny("blocked"), 5)
                .with_timestamp(Timestamp::from_micros(seq as i64).unwrap())
                .finalize(seq as u64, prior, &key);
            prior = entry.entry_hash;
            store.append(&entry).unwrap();
        }

        assert_eq!(store.query_by_agent(agent_a).unwrap().len(), 2);
        assert_eq!(store.query_by_domain("two.example.com").unwrap().len(), 1);
        assert_eq!(
            store.query_by_verdict(Verdict::Deny).unwrap().len(),
            3
        );
        assert!(store.query_by_verdict(Verdict::Allow).unwrap().is_empty());
    }

    #[test]
    fn snapshot_preserves_sequence_order() {
        let key = TagKey::generate();
        let store = filled_store(&key, &[1, 2, 3, 4]);
        let all = store.snapshot_all().unwrap();
        let seqs: Vec<u64> = all.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }
}
