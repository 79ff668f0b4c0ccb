//! The single-threaded cooperative interceptor form.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinSet;
use tracing::debug;
use vigil_core::{AccessRequest, Decision};

use crate::error::{ChainError, ChainResult};
use crate::pipeline::Pipeline;

/// Interceptor for cooperative scheduling.
///
/// Each request is an async task that suspends at the underlying call
/// and while waiting on the chain-extension reply, letting sibling
/// requests run meanwhile. Drive it with a current-thread runtime for
/// a strictly single-threaded schedule; the behavior is identical on a
/// multi-thread runtime, just with added parallelism.
pub struct CooperativeInterceptor {
    pipeline: Arc<Pipeline>,
    requests_processed: AtomicU64,
}

impl CooperativeInterceptor {
    /// Wrap a pipeline.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            requests_processed: AtomicU64::new(0),
        }
    }

    /// Intercept one request: decide, execute if allowed, audit.
    ///
    /// # Errors
    ///
    /// [`ChainError`] when the audit entry could not be appended; the
    /// decision is never returned without its entry.
    pub async fn intercept(&self, request: &AccessRequest) -> ChainResult<Decision> {
        let result = self.pipeline.intercept_async(request).await;
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Run a scripted batch as one task per request.
    ///
    /// Results come back in script order regardless of how the tasks
    /// interleaved; chain order is whatever order the tasks reached
    /// the writer queue in.
    ///
    /// # Errors
    ///
    /// The first [`ChainError`] any task hit.
    pub async fn run_script(&self, script: &[AccessRequest]) -> ChainResult<Vec<Decision>> {
        let mut tasks = JoinSet::new();
        for (index, request) in script.iter().enumerate() {
            let pipeline = Arc::clone(&self.pipeline);
            let request = request.clone();
            tasks.spawn(async move { (index, pipeline.intercept_async(&request).await) });
        }

        let mut slots: Vec<Option<ChainResult<Decision>>> =
            script.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(_join_error) => return Err(ChainError::WriterGone),
            }
        }

        self.requests_processed
            .fetch_add(script.len() as u64, Ordering::Relaxed);
        debug!(requests = script.len(), "script batch complete");

        slots
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(ChainError::WriterGone)))
            .collect()
    }

    /// Total requests handled so far.
    #[must_use]
    pub fn requests_processed(&self) -> u64 {
        self.requests_processed.load(Ordering::Relaxed)
    }
}
