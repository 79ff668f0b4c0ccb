//! Policy decision types.
//!
//! A `Decision` is produced exactly once per intercepted request and is
//! never stored on its own - it is embedded into the audit entry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{PolicyId, RuleId};

/// Outcome of a policy evaluation, encoded as a single byte in the
/// columnar store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The request may proceed.
    Allow,
    /// The request is blocked by a matching rule (or by failing closed).
    Deny,
    /// No active policy matched the request at all.
    NoMatchingPolicy,
}

impl Verdict {
    /// Only `Allow` permits the underlying call.
    #[must_use]
    pub const fn is_permitted(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Single-byte encoding for columnar storage and canonical hashing.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Allow => 0,
            Self::Deny => 1,
            Self::NoMatchingPolicy => 2,
        }
    }

    /// Decode from the columnar byte form.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Allow),
            1 => Some(Self::Deny),
            2 => Some(Self::NoMatchingPolicy),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
            Self::NoMatchingPolicy => write!(f, "no_matching_policy"),
        }
    }
}

/// The decision reached for one request: the verdict plus the policy and
/// rule that produced it and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The verdict.
    pub verdict: Verdict,
    /// The policy that matched, if any.
    pub matched_policy_id: Option<PolicyId>,
    /// The rule within that policy that matched, if any.
    pub matched_rule_id: Option<RuleId>,
    /// Why the verdict was reached.
    pub reason: String,
}

impl Decision {
    /// An allow decision from a matched policy rule.
    #[must_use]
    pub fn allow(policy_id: PolicyId, rule_id: Option<RuleId>, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Allow,
            matched_policy_id: Some(policy_id),
            matched_rule_id: rule_id,
            reason: reason.into(),
        }
    }

    /// A deny decision from a matched policy rule.
    #[must_use]
    pub fn deny_matched(
        policy_id: PolicyId,
        rule_id: Option<RuleId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            verdict: Verdict::Deny,
            matched_policy_id: Some(policy_id),
            matched_rule_id: rule_id,
            reason: reason.into(),
        }
    }

    /// A deny decision with no matching policy - used when the agent is
    /// unknown, blocked, or the evaluation itself failed (fail closed).
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            matched_policy_id: None,
            matched_rule_id: None,
            reason: reason.into(),
        }
    }

    /// No active policy matched the request.
    #[must_use]
    pub fn no_match(reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::NoMatchingPolicy,
            matched_policy_id: None,
            matched_rule_id: None,
            reason: reason.into(),
        }
    }

    /// Whether the underlying call may proceed.
    #[must_use]
    pub const fn is_permitted(&self) -> bool {
        self.verdict.is_permitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allow_is_permitted() {
        assert!(Verdict::Allow.is_permitted());
        assert!(!Verdict::Deny.is_permitted());
        assert!(!Verdict::NoMatchingPolicy.is_permitted());
    }

    #[test]
    fn verdict_byte_round_trip() {
        for v in [Verdict::Allow, Verdict::Deny, Verdict::NoMatchingPolicy] {
            assert_eq!(Verdict::from_u8(v.as_u8()), Some(v));
        }
        assert_eq!(Verdict::from_u8(9), None);
    }

    #[test]
    fn deny_carries_no_policy() {
        let d = Decision::deny("unknown agent");
        assert_eq!(d.verdict, Verdict::Deny);
        assert!(d.matched_policy_id.is_none());
        assert!(!d.is_permitted());
    }

    #[test]
    fn allow_references_matched_policy() {
        let pid = PolicyId::new();
        let rid = RuleId::new();
        let d = Decision::allow(pid, Some(rid), "matched policy: prod-egress");
        assert!(d.is_permitted());
        assert_eq!(d.matched_policy_id, Some(pid));
        assert_eq!(d.matched_rule_id, Some(rid));
    }
}
