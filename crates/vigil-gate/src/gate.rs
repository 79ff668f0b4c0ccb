//! The policy gate: the pipeline's decision oracle.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::trace;
use vigil_core::{AccessRequest, Agent, Decision};

use crate::cache::PolicyCache;
use crate::error::GateError;
use crate::policy::{Policy, PolicyStatus, RuleAction};

/// A synchronous decision oracle.
///
/// Implementations must be pure with respect to the pipeline: no side
/// effects observable to the caller beyond the returned decision. The
/// pipeline fails closed on `Err` - the request is denied and the
/// error text becomes the audited reason.
pub trait PolicyGate: Send + Sync {
    /// Evaluate a request for an agent.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the evaluation itself fails (the
    /// caller treats this as a denial, not as a skipped audit).
    fn evaluate(&self, agent: &Agent, request: &AccessRequest) -> Result<Decision, GateError>;
}

/// Closures can serve as gates, which keeps scripted tests terse.
impl<F> PolicyGate for F
where
    F: Fn(&Agent, &AccessRequest) -> Result<Decision, GateError> + Send + Sync,
{
    fn evaluate(&self, agent: &Agent, request: &AccessRequest) -> Result<Decision, GateError> {
        self(agent, request)
    }
}

/// Deterministic rule evaluator over the policy cache.
///
/// Algorithm (first match wins):
/// 1. A non-active agent is denied outright.
/// 2. The agent's policies are sorted by policy priority.
/// 3. Each active policy is evaluated against the domain and instant.
/// 4. The first matching rule's action becomes the verdict.
/// 5. Nothing matched: `NoMatchingPolicy`.
///
/// Stateless apart from the shared cache; safe to share across any
/// number of workers.
pub struct RuleGate {
    cache: Arc<PolicyCache>,
}

impl RuleGate {
    /// Create a gate over a policy cache.
    #[must_use]
    pub fn new(cache: Arc<PolicyCache>) -> Self {
        Self { cache }
    }

    /// Evaluate at an explicit instant (deterministic form; the trait
    /// impl passes the current time).
    #[must_use]
    pub fn evaluate_at(
        &self,
        agent: &Agent,
        request: &AccessRequest,
        at: DateTime<Utc>,
    ) -> Decision {
        if !agent.can_make_requests() {
            return Decision::deny(format!(
                "agent {} is {}, not active",
                agent.name, agent.status
            ));
        }

        let mut policies = self.cache.policies_for(agent);
        policies.sort_by_key(|p| p.priority);

        for policy in &policies {
            if policy.status != PolicyStatus::Active {
                continue;
            }
            if let Some((action, rule_id)) = policy.evaluate(&request.domain, at) {
                trace!(
                    policy = %policy.name,
                    domain = %request.domain,
                    ?action,
                    "policy matched"
                );
                return decision_for(policy, action, rule_id);
            }
        }

        Decision::no_match(format!("no policy matched domain {}", request.domain))
    }
}

fn decision_for(policy: &Policy, action: RuleAction, rule_id: vigil_core::RuleId) -> Decision {
    let reason = format!("matched policy: {}", policy.name);
    match action {
        RuleAction::Allow => Decision::allow(policy.policy_id, Some(rule_id), reason),
        RuleAction::Deny => Decision::deny_matched(policy.policy_id, Some(rule_id), reason),
    }
}

impl PolicyGate for RuleGate {
    fn evaluate(&self, agent: &Agent, request: &AccessRequest) -> Result<Decision, GateError> {
        Ok(self.evaluate_at(agent, request, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyRule, TimeWindow};
    use chrono::TimeZone;
    use vigil_core::{AgentStatus, Verdict};

    fn monday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 12, 0, 0).single().unwrap()
    }

    fn setup(policies: Vec<Policy>) -> (Arc<PolicyCache>, Vec<vigil_core::PolicyId>) {
        let cache = Arc::new(PolicyCache::new());
        let ids = policies.iter().map(|p| p.policy_id).collect();
        for policy in policies {
            cache.insert(policy);
        }
        (cache, ids)
    }

    #[test]
    fn first_matching_policy_wins_by_priority() {
        let low_priority = Policy::active("broad-deny", 200)
            .with_rule(PolicyRule::deny("*.example.com", 10));
        let high_priority = Policy::active("api-allow", 10)
            .with_rule(PolicyRule::allow("api.example.com", 10));
        let (cache, ids) = setup(vec![low_priority, high_priority]);

        let agent = Agent::active("crawler").with_policies(ids);
        let gate = RuleGate::new(cache);

        let request = AccessRequest::get(agent.agent_id, "api.example.com", "/");
        let decision = gate.evaluate_at(&agent, &request, monday_noon());
        assert_eq!(decision.verdict, Verdict::Allow);
        assert_eq!(decision.reason, "matched policy: api-allow");

        let request = AccessRequest::get(agent.agent_id, "chat.example.com", "/");
        let decision = gate.evaluate_at(&agent, &request, monday_noon());
        assert_eq!(decision.verdict, Verdict::Deny);
        assert!(decision.matched_policy_id.is_some());
    }

    #[test]
    fn inactive_agent_is_denied() {
        let (cache, _) = setup(vec![]);
        let gate = RuleGate::new(cache);
        let agent = Agent::with_status("crawler", AgentStatus::Suspended);
        let request = AccessRequest::get(agent.agent_id, "api.example.com", "/");

        let decision = gate.evaluate_at(&agent, &request, monday_noon());
        assert_eq!(decision.verdict, Verdict::Deny);
        assert!(decision.reason.contains("suspended"));
        assert!(decision.matched_policy_id.is_none());
    }

    #[test]
    fn suspended_policies_are_skipped() {
        let mut policy = Policy::active("dormant", 10)
            .with_rule(PolicyRule::allow("api.example.com", 10));
        policy.status = PolicyStatus::Suspended;
        let (cache, ids) = setup(vec![policy]);

        let agent = Agent::active("crawler").with_policies(ids);
        let gate = RuleGate::new(cache);
        let request = AccessRequest::get(agent.agent_id, "api.example.com", "/");

        let decision = gate.evaluate_at(&agent, &request, monday_noon());
        assert_eq!(decision.verdict, Verdict::NoMatchingPolicy);
    }

    #[test]
    fn window_closed_falls_through_to_no_match() {
        let policy = Policy::active("office-only", 10)
            .with_rule(PolicyRule::allow("api.example.com", 10))
            .with_time_window(TimeWindow::business_hours());
        let (cache, ids) = setup(vec![policy]);

        let agent = Agent::active("crawler").with_policies(ids);
        let gate = RuleGate::new(cache);
        let request = AccessRequest::get(agent.agent_id, "api.example.com", "/");

        let after_hours = Utc.with_ymd_and_hms(2026, 8, 3, 22, 0, 0).single().unwrap();
        let decision = gate.evaluate_at(&agent, &request, after_hours);
        assert_eq!(decision.verdict, Verdict::NoMatchingPolicy);
        assert!(decision.reason.contains("api.example.com"));
    }

    #[test]
    fn closure_gates_work() {
        let gate =
            |_agent: &Agent, _request: &AccessRequest| Ok::<_, GateError>(Decision::deny("scripted"));
        let agent = Agent::active("crawler");
        let request = AccessRequest::get(agent.agent_id, "api.example.com", "/");
        let decision = PolicyGate::evaluate(&gate, &agent, &request).unwrap();
        assert_eq!(decision.reason, "scripted");
    }
}
