//! Helpers for comparing scripted runs across backends.
//!
//! The two interceptor forms must be observationally equivalent: given
//! the same ordered script and a deterministic gate, they produce the
//! same ordered `(verdict, matched policy)` outputs, even though the
//! physical interleaving - and therefore chain order - may differ.

use vigil_core::{Decision, PolicyId, Verdict};

/// The observable outcome of one scripted request.
pub type ScriptOutcome = (Verdict, Option<PolicyId>);

/// Project decisions down to their observable outcomes, in order.
#[must_use]
pub fn outcomes(decisions: &[Decision]) -> Vec<ScriptOutcome> {
    decisions
        .iter()
        .map(|d| (d.verdict, d.matched_policy_id))
        .collect()
}
