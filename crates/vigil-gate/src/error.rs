//! Gate error types.

use thiserror::Error;

/// Errors from policy evaluation.
///
/// The pipeline never lets these escape as skipped audits: an
/// evaluation failure is converted into a denial whose reason carries
/// the error text (fail closed).
#[derive(Debug, Error)]
pub enum GateError {
    /// The evaluation itself failed (e.g. an external resolver was
    /// unreachable or returned garbage).
    #[error("policy evaluation failed: {reason}")]
    EvaluationFailed {
        /// What went wrong.
        reason: String,
    },
}

impl GateError {
    /// Convenience constructor.
    #[must_use]
    pub fn evaluation_failed(reason: impl Into<String>) -> Self {
        Self::EvaluationFailed {
            reason: reason.into(),
        }
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;
