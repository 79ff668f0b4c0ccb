//! The shared decision-and-audit pipeline.
//!
//! Both interceptor forms run the same stages over the same
//! collaborators; only the waiting differs (blocking versus
//! suspension). The pipeline never skips the audit: allow, deny, a
//! missing agent, and a failed evaluation all append exactly one entry.

use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use vigil_audit::DraftEntry;
use vigil_core::{AccessRequest, Decision, RetryConfig, retry, retry_blocking};
use vigil_gate::{AgentRegistry, PolicyGate};

use crate::error::{ChainError, ChainResult};
use crate::writer::ChainHandle;

/// The underlying external call an allowed request goes on to make.
///
/// The pipeline only sequences the call between the decision and the
/// audit append; failures of the call itself are the agent's problem
/// and are not recorded.
type Downstream = dyn Fn(&AccessRequest) + Send + Sync;

/// The shared pipeline: collaborators plus the chain handle.
pub struct Pipeline {
    registry: Arc<AgentRegistry>,
    gate: Arc<dyn PolicyGate>,
    handle: ChainHandle,
    retry: RetryConfig,
    downstream: Arc<Downstream>,
}

impl Pipeline {
    /// Assemble a pipeline.
    #[must_use]
    pub fn new(registry: Arc<AgentRegistry>, gate: Arc<dyn PolicyGate>, handle: ChainHandle) -> Self {
        Self {
            registry,
            gate,
            handle,
            retry: RetryConfig::fast(),
            downstream: Arc::new(|_request: &AccessRequest| {}),
        }
    }

    /// Replace the backoff configuration for chain-extension retries.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Install the underlying call executed for allowed requests.
    #[must_use]
    pub fn with_downstream(mut self, downstream: Arc<Downstream>) -> Self {
        self.downstream = downstream;
        self
    }

    /// Run the decision stages and build the draft. No chain work yet;
    /// a request abandoned before this returns consumes no sequence
    /// number.
    fn prepare(&self, request: &AccessRequest) -> (DraftEntry, Decision) {
        let started = Instant::now();

        let decision = match self.registry.get(request.agent_id) {
            None => Decision::deny(format!("unknown agent: {}", request.agent_id)),
            Some(agent) => match self.gate.evaluate(&agent, request) {
                Ok(decision) => decision,
                Err(source) => {
                    // Fail closed: the evaluation error is itself an
                    // audited denial, never a skipped entry.
                    warn!(%source, agent = %request.agent_id, "policy evaluation failed");
                    Decision::deny(source.to_string())
                },
            },
        };

        if decision.is_permitted() {
            (self.downstream)(request);
        }

        let latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        let draft = DraftEntry::from_request(request, decision.clone(), latency_us);
        (draft, decision)
    }

    /// Intercept a request from an OS thread.
    ///
    /// # Errors
    ///
    /// [`ChainError`] when the entry could not be appended even after
    /// backoff; the decision is not returned without its audit entry.
    pub fn intercept_blocking(&self, request: &AccessRequest) -> ChainResult<Decision> {
        let (draft, decision) = self.prepare(request);

        retry_blocking(
            &self.retry,
            |_attempt| self.handle.extend(draft.clone()),
            ChainError::is_retryable,
        )
        .into_result()
        .map(|_entry| decision)
    }

    /// Intercept a request from a cooperative task.
    ///
    /// # Errors
    ///
    /// Same contract as [`Pipeline::intercept_blocking`].
    pub async fn intercept_async(&self, request: &AccessRequest) -> ChainResult<Decision> {
        // Yield first so sibling tasks interleave even when the whole
        // pipeline would otherwise complete without suspending.
        tokio::task::yield_now().await;

        let (draft, decision) = self.prepare(request);

        retry(
            &self.retry,
            |_attempt| {
                let draft = draft.clone();
                async { self.handle.extend_async(draft).await }
            },
            ChainError::is_retryable,
        )
        .await
        .into_result()
        .map(|_entry| decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ChainWriter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vigil_core::{Agent, Verdict};
    use vigil_crypto::TagKey;
    use vigil_gate::GateError;
    use vigil_store::ColumnarStore;

    fn pipeline_with_gate(
        gate: Arc<dyn PolicyGate>,
    ) -> (Pipeline, Arc<ColumnarStore>, ChainWriter, vigil_core::AgentId) {
        let store = Arc::new(ColumnarStore::new());
        let writer = ChainWriter::spawn(Arc::clone(&store), TagKey::generate()).unwrap();
        let registry = Arc::new(AgentRegistry::new());
        let agent_id = registry.register(Agent::active("crawler"));
        let pipeline = Pipeline::new(registry, gate, writer.handle());
        (pipeline, store, writer, agent_id)
    }

    #[test]
    fn unknown_agent_is_denied_and_audited() {
        let gate: Arc<dyn PolicyGate> =
            Arc::new(|_: &Agent, _: &AccessRequest| Ok::<_, GateError>(Decision::deny("unreachable")));
        let (pipeline, store, _writer, _agent) = pipeline_with_gate(gate);

        let request = AccessRequest::get(vigil_core::AgentId::new(), "api.example.com", "/");
        let decision = pipeline.intercept_blocking(&request).unwrap();

        assert_eq!(decision.verdict, Verdict::Deny);
        assert!(decision.reason.starts_with("unknown agent"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn gate_failure_fails_closed_and_is_audited() {
        let gate: Arc<dyn PolicyGate> = Arc::new(|_: &Agent, _: &AccessRequest| {
            Err::<Decision, _>(GateError::evaluation_failed("resolver unreachable"))
        });
        let (pipeline, store, _writer, agent_id) = pipeline_with_gate(gate);

        let request = AccessRequest::get(agent_id, "api.example.com", "/");
        let decision = pipeline.intercept_blocking(&request).unwrap();

        assert_eq!(decision.verdict, Verdict::Deny);
        assert!(decision.reason.contains("resolver unreachable"));

        let entry = store.get_by_sequence(0).unwrap();
        assert_eq!(entry.record.decision, decision);
    }

    #[test]
    fn downstream_runs_only_for_allowed_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate: Arc<dyn PolicyGate> = Arc::new(|_: &Agent, request: &AccessRequest| {
            if request.domain == "ok.example.com" {
                Ok::<_, GateError>(Decision::allow(vigil_core::PolicyId::new(), None, "matched"))
            } else {
                Ok(Decision::deny("blocked"))
            }
        });
        let (pipeline, store, _writer, agent_id) = pipeline_with_gate(gate);
        let counter = Arc::clone(&calls);
        let pipeline = pipeline.with_downstream(Arc::new(move |_request: &AccessRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let allowed = AccessRequest::get(agent_id, "ok.example.com", "/");
        let denied = AccessRequest::get(agent_id, "no.example.com", "/");
        pipeline.intercept_blocking(&allowed).unwrap();
        pipeline.intercept_blocking(&denied).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Both outcomes were audited.
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn async_intercept_appends_exactly_once() {
        let gate: Arc<dyn PolicyGate> =
            Arc::new(|_: &Agent, _: &AccessRequest| Ok::<_, GateError>(Decision::deny("blocked")));
        let (pipeline, store, _writer, agent_id) = pipeline_with_gate(gate);

        let request = AccessRequest::get(agent_id, "api.example.com", "/");
        let decision = pipeline.intercept_async(&request).await.unwrap();

        assert_eq!(decision.verdict, Verdict::Deny);
        assert_eq!(store.len(), 1);
    }
}
