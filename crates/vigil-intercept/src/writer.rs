//! The single-consumer chain writer.
//!
//! Exactly one logical execution may extend the chain at a time. The
//! writer owns the chain state `(next_sequence, last_hash)` outright -
//! it lives on the writer thread's stack and is never behind a shared
//! reference - and consumes a bounded work queue. Producers on OS
//! threads and cooperative tasks push onto the same queue, so chain
//! ordering is identical regardless of backend.
//!
//! Per job the writer runs one atomic unit: finalize the draft against
//! the current state, append to the store, then advance the state. If
//! the append fails the state does not advance, so no sequence number
//! is ever issued for an entry that never became durable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvError, SyncSender, TrySendError};
use std::thread::JoinHandle;
use tracing::{debug, error, info};
use vigil_audit::{AuditEntry, DraftEntry};
use vigil_crypto::{ChainHash, TagKey};
use vigil_store::{ColumnarStore, StoreError};

use crate::error::{ChainError, ChainResult};

/// Default capacity of the writer's work queue.
const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// The chain state. Exclusively owned by the writer loop; mutated only
/// between a successful append and the reply.
struct ChainState {
    next_sequence: u64,
    last_hash: ChainHash,
    last_timestamp_us: Option<i64>,
}

/// How a finalized entry (or failure) travels back to the producer.
enum Reply {
    Blocking(mpsc::Sender<ChainResult<AuditEntry>>),
    Async(tokio::sync::oneshot::Sender<ChainResult<AuditEntry>>),
}

impl Reply {
    fn send(self, result: ChainResult<AuditEntry>) {
        // A producer that stopped waiting does not undo the append:
        // allocation and append already committed as one unit.
        match self {
            Self::Blocking(tx) => {
                let _ = tx.send(result);
            },
            Self::Async(tx) => {
                let _ = tx.send(result);
            },
        }
    }
}

enum Job {
    Extend { draft: DraftEntry, reply: Reply },
    Shutdown,
}

/// Handle for submitting drafts to the writer. Clone one per producer.
#[derive(Clone)]
pub struct ChainHandle {
    queue: SyncSender<Job>,
    halted: Arc<AtomicBool>,
}

impl ChainHandle {
    /// Extend the chain with a draft, blocking until the finalized
    /// entry is durable.
    ///
    /// # Errors
    ///
    /// [`ChainError::QueueFull`] when the queue is saturated (retry
    /// with backoff), [`ChainError::Halted`] after a fatal consistency
    /// violation, [`ChainError::WriterGone`] if the writer shut down,
    /// or [`ChainError::Store`] when the append was rejected (no
    /// sequence number was consumed).
    pub fn extend(&self, draft: DraftEntry) -> ChainResult<AuditEntry> {
        if self.halted.load(Ordering::Acquire) {
            return Err(ChainError::Halted);
        }

        let (tx, rx) = mpsc::channel();
        self.submit(draft, Reply::Blocking(tx))?;

        // Once the job is queued the append is guaranteed to be
        // attempted, so the reply wait is not bounded: abandoning it
        // here could not cancel the extension anyway.
        match rx.recv() {
            Ok(result) => result,
            Err(RecvError) => Err(ChainError::WriterGone),
        }
    }

    /// Extend the chain with a draft, suspending until the finalized
    /// entry is durable.
    ///
    /// # Errors
    ///
    /// Same contract as [`ChainHandle::extend`].
    pub async fn extend_async(&self, draft: DraftEntry) -> ChainResult<AuditEntry> {
        if self.halted.load(Ordering::Acquire) {
            return Err(ChainError::Halted);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.submit(draft, Reply::Async(tx))?;

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ChainError::WriterGone),
        }
    }

    fn submit(&self, draft: DraftEntry, reply: Reply) -> ChainResult<()> {
        match self.queue.try_send(Job::Extend { draft, reply }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ChainError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(ChainError::WriterGone),
        }
    }

    /// Whether the writer has halted after a consistency violation.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}

/// The writer: owns the dedicated thread and the secret tag key.
pub struct ChainWriter {
    queue: SyncSender<Job>,
    halted: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl ChainWriter {
    /// Spawn a writer over a store with the given key, using the
    /// default queue capacity.
    ///
    /// Chain state is resumed from the store: `next_sequence` is its
    /// length and `last_hash` the stored head (or the genesis sentinel
    /// for an empty store), so a loaded snapshot continues its chain
    /// seamlessly.
    ///
    /// # Errors
    ///
    /// [`ChainError::Spawn`] if the OS refuses the thread.
    pub fn spawn(store: Arc<ColumnarStore>, key: TagKey) -> ChainResult<Self> {
        Self::spawn_with_capacity(store, key, DEFAULT_QUEUE_CAPACITY)
    }

    /// Spawn a writer with an explicit queue capacity.
    ///
    /// # Errors
    ///
    /// [`ChainError::Spawn`] if the OS refuses the thread.
    pub fn spawn_with_capacity(
        store: Arc<ColumnarStore>,
        key: TagKey,
        capacity: usize,
    ) -> ChainResult<Self> {
        let (queue, jobs) = mpsc::sync_channel(capacity);
        let halted = Arc::new(AtomicBool::new(false));

        let state = ChainState {
            next_sequence: store.len() as u64,
            last_hash: store.head_hash().unwrap_or(ChainHash::GENESIS),
            last_timestamp_us: store.last_timestamp().map(|ts| ts.as_micros()),
        };
        info!(
            next_sequence = state.next_sequence,
            key_id = %key.key_id_hex(),
            "chain writer starting"
        );

        let flag = Arc::clone(&halted);
        let thread = std::thread::Builder::new()
            .name("vigil-chain-writer".to_string())
            .spawn(move || writer_loop(&jobs, state, &store, &key, &flag))
            .map_err(ChainError::Spawn)?;

        Ok(Self {
            queue,
            halted,
            thread,
        })
    }

    /// Create a producer handle.
    #[must_use]
    pub fn handle(&self) -> ChainHandle {
        ChainHandle {
            queue: self.queue.clone(),
            halted: Arc::clone(&self.halted),
        }
    }

    /// Shut down: drain jobs already queued, then stop the loop.
    ///
    /// Outstanding [`ChainHandle`]s stay usable until the sentinel is
    /// processed; extends racing in behind it fail with
    /// [`ChainError::WriterGone`] without consuming a sequence number.
    pub fn shutdown(self) {
        // `send` (not `try_send`) so the sentinel is never lost to a
        // momentarily full queue.
        let _ = self.queue.send(Job::Shutdown);
        if self.thread.join().is_err() {
            error!("chain writer thread panicked");
        }
    }
}

fn writer_loop(
    jobs: &mpsc::Receiver<Job>,
    mut state: ChainState,
    store: &ColumnarStore,
    key: &TagKey,
    halted: &AtomicBool,
) {
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Extend { draft, reply } => {
                let result = extend_one(&mut state, store, key, draft, halted);
                reply.send(result);
            },
            Job::Shutdown => break,
        }
    }
    debug!(
        next_sequence = state.next_sequence,
        "chain writer shutting down"
    );
}

/// One atomic chain extension: finalize, append, advance.
fn extend_one(
    state: &mut ChainState,
    store: &ColumnarStore,
    key: &TagKey,
    draft: DraftEntry,
    halted: &AtomicBool,
) -> ChainResult<AuditEntry> {
    if halted.load(Ordering::Acquire) {
        return Err(ChainError::Halted);
    }

    // Wall clocks can step backwards; the store's range query needs the
    // timestamp column sorted. Clamp before hashing so stored bytes and
    // hashed bytes agree.
    let draft = match state.last_timestamp_us {
        Some(head) if draft.timestamp.as_micros() < head => {
            match vigil_core::Timestamp::from_micros(head) {
                Some(clamped) => draft.with_timestamp(clamped),
                None => draft,
            }
        },
        _ => draft,
    };

    let entry = draft.finalize(state.next_sequence, state.last_hash, key);

    match store.append(&entry) {
        Ok(()) => {
            state.next_sequence = state.next_sequence.saturating_add(1);
            state.last_hash = entry.entry_hash;
            state.last_timestamp_us = Some(entry.timestamp().as_micros());
            Ok(entry)
        },
        Err(source @ StoreError::NonContiguous { .. }) => {
            // Coordination bug: the store and the writer disagree about
            // the next sequence. Nothing sane can be appended after
            // this, so all further writes are refused.
            error!(%source, "chain writer halting");
            halted.store(true, Ordering::Release);
            Err(ChainError::Store(source))
        },
        Err(source) => Err(ChainError::Store(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_audit::verify_chain;
    use vigil_core::{AccessRequest, AgentId, Decision};

    fn draft_for(agent: AgentId, domain: &str) -> DraftEntry {
        let request = AccessRequest::get(agent, domain, "/");
        DraftEntry::from_request(&request, Decision::deny("blocked"), 3)
    }

    #[test]
    fn sequential_extends_chain_correctly() {
        let store = Arc::new(ColumnarStore::new());
        let writer = ChainWriter::spawn(Arc::clone(&store), TagKey::generate()).unwrap();
        let handle = writer.handle();
        let agent = AgentId::new();

        for expected_seq in 0..5u64 {
            let entry = handle.extend(draft_for(agent, "api.example.com")).unwrap();
            assert_eq!(entry.sequence, expected_seq);
        }

        drop(handle);
        writer.shutdown();

        let entries = store.snapshot_all().unwrap();
        assert_eq!(entries.len(), 5);
        assert!(verify_chain(&entries).is_valid());
    }

    #[test]
    fn concurrent_extends_produce_contiguous_sequences() {
        let store = Arc::new(ColumnarStore::new());
        let writer = ChainWriter::spawn(Arc::clone(&store), TagKey::generate()).unwrap();
        let agent = AgentId::new();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let handle = writer.handle();
                scope.spawn(move || {
                    for _ in 0..25 {
                        handle.extend(draft_for(agent, "api.example.com")).unwrap();
                    }
                });
            }
        });

        writer.shutdown();

        let entries = store.snapshot_all().unwrap();
        assert_eq!(entries.len(), 200);
        let seqs: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, (0..200).collect::<Vec<u64>>());
        assert!(verify_chain(&entries).is_valid());
    }

    #[test]
    fn resumes_chain_from_existing_store() {
        let store = Arc::new(ColumnarStore::new());
        let key_material = [9u8; 32];
        let agent = AgentId::new();

        {
            let key = TagKey::from_bytes(&key_material).unwrap();
            let writer = ChainWriter::spawn(Arc::clone(&store), key).unwrap();
            let handle = writer.handle();
            handle.extend(draft_for(agent, "api.example.com")).unwrap();
            handle.extend(draft_for(agent, "api.example.com")).unwrap();
            drop(handle);
            writer.shutdown();
        }

        let head_before = store.head_hash().unwrap();

        let key = TagKey::from_bytes(&key_material).unwrap();
        let writer = ChainWriter::spawn(Arc::clone(&store), key).unwrap();
        let handle = writer.handle();
        let entry = handle.extend(draft_for(agent, "api.example.com")).unwrap();
        assert_eq!(entry.sequence, 2);
        assert_eq!(entry.prior_hash, head_before);
        drop(handle);
        writer.shutdown();

        assert!(verify_chain(&store.snapshot_all().unwrap()).is_valid());
    }

    #[test]
    fn clamps_backward_timestamps() {
        let store = Arc::new(ColumnarStore::new());
        let writer = ChainWriter::spawn(Arc::clone(&store), TagKey::generate()).unwrap();
        let handle = writer.handle();
        let agent = AgentId::new();

        let now = vigil_core::Timestamp::now();
        let first = draft_for(agent, "api.example.com").with_timestamp(now);
        handle.extend(first).unwrap();

        let stale_ts =
            vigil_core::Timestamp::from_micros(now.as_micros().saturating_sub(5_000_000)).unwrap();
        let stale = draft_for(agent, "api.example.com").with_timestamp(stale_ts);
        let entry = handle.extend(stale).unwrap();

        // The entry was not rejected and its timestamp was clamped to
        // the store head.
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.timestamp().as_micros(), now.as_micros());
        assert_eq!(entry.recompute_hash(), entry.entry_hash);

        drop(handle);
        writer.shutdown();
    }

    #[test]
    fn handle_fails_fast_after_shutdown() {
        let store = Arc::new(ColumnarStore::new());
        let writer = ChainWriter::spawn(store, TagKey::generate()).unwrap();
        let handle = writer.handle();
        writer.shutdown();

        let agent = AgentId::new();
        assert!(matches!(
            handle.extend(draft_for(agent, "api.example.com")),
            Err(ChainError::WriterGone)
        ));
    }

    #[tokio::test]
    async fn async_extend_shares_the_same_queue() {
        let store = Arc::new(ColumnarStore::new());
        let writer = ChainWriter::spawn(Arc::clone(&store), TagKey::generate()).unwrap();
        let handle = writer.handle();
        let agent = AgentId::new();

        let sync_entry = handle.extend(draft_for(agent, "api.example.com")).unwrap();
        let async_entry = handle
            .extend_async(draft_for(agent, "api.example.com"))
            .await
            .unwrap();

        assert_eq!(sync_entry.sequence, 0);
        assert_eq!(async_entry.sequence, 1);
        assert!(async_entry.follows(&sync_entry));

        drop(handle);
        writer.shutdown();
    }
}
