//! Retry utilities with exponential backoff.
//!
//! Used by the interceptor when a chain-extension reply times out: the
//! wait is a transient coordination delay, not a data error, so the
//! caller retries with increasing delays.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries, just the initial attempt).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps the exponential growth).
    pub max_delay: Duration,
    /// Base for exponential backoff (typically 2.0).
    pub exponential_base: f64,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        exponential_base: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            exponential_base,
        }
    }

    /// Creates a configuration with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_base: 2.0,
        }
    }

    /// Creates a configuration suitable for quick in-process waits.
    #[must_use]
    pub const fn fast() -> Self {
        Self::new(
            3,
            Duration::from_millis(10),
            Duration::from_millis(100),
            2.0,
        )
    }

    /// Calculates the delay for a given attempt number (0-indexed).
    ///
    /// Returns `Duration::ZERO` for attempt 0, then exponentially
    /// increasing delays capped at `max_delay`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // Precision loss is acceptable for delay calculations.
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay_ms =
            self.initial_delay.as_millis() as f64 * self.exponential_base.powi(exponent);
        let capped_delay_ms = base_delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_delay_ms.max(0.0) as u64)
    }

    /// Returns true if more attempts are allowed given the current attempt count.
    #[must_use]
    pub const fn should_retry(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fast()
    }
}

/// Result of a retry operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retry attempts.
    Exhausted {
        /// The final error.
        error: E,
        /// Total number of attempts made.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Returns true if the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts to a Result, discarding the attempt count on failure.
    #[allow(clippy::missing_errors_doc)]
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Exhausted { error, .. } => Err(error),
        }
    }
}

/// Execute an async operation with retry and exponential backoff.
///
/// The `should_retry` predicate receives the error and decides whether
/// to retry. Return `false` to abort early on non-retryable errors.
pub async fn retry<T, E, Fut, F, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(error) => {
                if !config.should_retry(attempt) || !should_retry(&error) {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: attempt.saturating_add(1),
                    };
                }

                attempt = attempt.saturating_add(1);
                tokio::time::sleep(config.delay_for_attempt(attempt)).await;
            },
        }
    }
}

/// Blocking counterpart of [`retry`] for callers on plain OS threads.
pub fn retry_blocking<T, E, F, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt) {
            Ok(value) => return RetryOutcome::Success(value),
            Err(error) => {
                if !config.should_retry(attempt) || !should_retry(&error) {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: attempt.saturating_add(1),
                    };
                }

                attempt = attempt.saturating_add(1);
                std::thread::sleep(config.delay_for_attempt(attempt));
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_calculation() {
        let config = RetryConfig::new(5, Duration::from_millis(100), Duration::from_secs(10), 2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn delay_caps_at_max() {
        let config = RetryConfig::new(
            10,
            Duration::from_millis(100),
            Duration::from_millis(500),
            2.0,
        );

        assert_eq!(config.delay_for_attempt(5), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn should_retry_logic() {
        let config = RetryConfig::new(3, Duration::from_millis(1), Duration::from_secs(1), 2.0);

        assert!(config.should_retry(0));
        assert!(config.should_retry(2));
        assert!(!config.should_retry(3));
    }

    #[test]
    fn blocking_retry_recovers() {
        let config = RetryConfig::new(5, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let outcome = retry_blocking(
            &config,
            |attempt| if attempt < 2 { Err("transient") } else { Ok("ok") },
            |_| true,
        );
        assert_eq!(outcome, RetryOutcome::Success("ok"));
    }

    #[test]
    fn blocking_retry_stops_on_non_retryable() {
        let config = RetryConfig::fast();
        let outcome: RetryOutcome<(), _> =
            retry_blocking(&config, |_| Err("permanent"), |_| false);
        assert!(matches!(
            outcome,
            RetryOutcome::Exhausted {
                error: "permanent",
                attempts: 1
            }
        ));
    }

    #[tokio::test]
    async fn async_retry_exhausts() {
        let config = RetryConfig::new(2, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let outcome = retry(
            &config,
            |_attempt| async { Err::<(), _>("always fails") },
            |_| true,
        )
        .await;
        assert!(matches!(
            outcome,
            RetryOutcome::Exhausted {
                error: "always fails",
                attempts: 3
            }
        ));
    }
}
