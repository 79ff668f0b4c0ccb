//! The thread-parallel interceptor form.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use vigil_core::{AccessRequest, Decision};

use crate::error::{ChainError, ChainResult};
use crate::pipeline::Pipeline;

/// Interceptor for worker-pool deployments.
///
/// `intercept` may be called from any number of OS threads
/// concurrently; requests are evaluated truly in parallel and block
/// only at the shared chain-extension queue and the underlying call.
pub struct ThreadedInterceptor {
    pipeline: Arc<Pipeline>,
    requests_processed: AtomicU64,
}

impl ThreadedInterceptor {
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
    pub fn intercept(&self, request: &AccessRequest) -> ChainResult<Decision> {
        let result = self.pipeline.intercept_blocking(request);
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Run a scripted batch over a pool of `workers` OS threads.
    ///
    /// Results come back in script order regardless of which worker
    /// handled which request; chain order is whatever order the
    /// workers reached the writer queue in.
    ///
    /// # Errors
    ///
    /// The first [`ChainError`] any worker hit.
    pub fn run_script(
        &self,
        script: &[AccessRequest],
        workers: usize,
    ) -> ChainResult<Vec<Decision>> {
        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<Option<ChainResult<Decision>>>> =
            Mutex::new(script.iter().map(|_| None).collect());

        std::thread::scope(|scope| {
            for _ in 0..workers.max(1) {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(request) = script.get(index) else {
                            break;
                        };
                        let outcome = self.intercept(request);
                        let mut slots = results
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner);
                        slots[index] = Some(outcome);
                    }
                });
            }
        });

        debug!(requests = script.len(), workers, "script batch complete");

        results
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
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
