//! The policy entity: domain rules with optional time windows.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_core::{PolicyId, RuleId, Timestamp};

/// Lifecycle status of a policy. Only `Active` policies are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Under construction.
    Draft,
    /// Evaluated against requests.
    Active,
    /// Temporarily excluded from evaluation.
    Suspended,
    /// Permanently retired.
    Archived,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// What a matching rule does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Permit the request.
    Allow,
    /// Block the request.
    Deny,
}

/// Time-of-day restriction, all times UTC.
///
/// Minutes are counted from midnight. Overnight windows where
/// `start_minute > end_minute` wrap: start 22:00, end 06:00 means
/// "10 PM through 6 AM".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start, minutes from midnight UTC.
    pub start_minute: u32,
    /// Window end, minutes from midnight UTC (inclusive).
    pub end_minute: u32,
    /// Days of the week the window applies to.
    pub days: Vec<Weekday>,
}

impl TimeWindow {
    /// Create a window from `(hour, minute)` bounds.
    #[must_use]
    pub fn new(start: (u32, u32), end: (u32, u32), days: Vec<Weekday>) -> Self {
        Self {
            start_minute: start.0.saturating_mul(60).saturating_add(start.1),
            end_minute: end.0.saturating_mul(60).saturating_add(end.1),
            days,
        }
    }

    /// Monday-Friday, 09:00-17:00 UTC.
    #[must_use]
    pub fn business_hours() -> Self {
        Self::new(
            (9, 0),
            (17, 0),
            vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        )
    }

    /// Check whether an instant falls inside this window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if !self.days.contains(&at.weekday()) {
            return false;
        }
        let minute = at.hour().saturating_mul(60).saturating_add(at.minute());
        if self.start_minute <= self.end_minute {
            // Normal window, e.g. 09:00-17:00.
            self.start_minute <= minute && minute <= self.end_minute
        } else {
            // Overnight window, e.g. 22:00-06:00.
            minute >= self.start_minute || minute <= self.end_minute
        }
    }
}

/// A single rule within a policy.
///
/// `domain_pattern` supports exact matches (`api.example.com`) and
/// single-segment wildcards (`*.example.com`, `api.*.internal`): split
/// on `.`, compare segment by segment, `*` matches any one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Unique rule identifier.
    pub rule_id: RuleId,
    /// Domain pattern this rule matches.
    pub domain_pattern: String,
    /// What happens on a match.
    pub action: RuleAction,
    /// Evaluation order within the policy; lower number wins.
    pub priority: u16,
}

impl PolicyRule {
    /// Create an ALLOW rule.
    #[must_use]
    pub fn allow(domain_pattern: impl Into<String>, priority: u16) -> Self {
        Self {
            rule_id: RuleId::new(),
            domain_pattern: domain_pattern.into(),
            action: RuleAction::Allow,
            priority,
        }
    }

    /// Create a DENY rule.
    #[must_use]
    pub fn deny(domain_pattern: impl Into<String>, priority: u16) -> Self {
        Self {
            rule_id: RuleId::new(),
            domain_pattern: domain_pattern.into(),
            action: RuleAction::Deny,
            priority,
        }
    }

    /// Check if a domain matches this rule's pattern.
    #[must_use]
    pub fn matches(&self, domain: &str) -> bool {
        let pattern_parts: Vec<&str> = self.domain_pattern.split('.').collect();
        let domain_parts: Vec<&str> = domain.split('.').collect();
        if pattern_parts.len() != domain_parts.len() {
            return false;
        }
        pattern_parts
            .iter()
            .zip(domain_parts)
            .all(|(pp, dp)| *pp == "*" || *pp == dp)
    }
}

/// An access control policy: ordered rules plus an optional time window.
///
/// Policies are owned by the policy layer and never mutated by the
/// pipeline; the builder runs at construction time only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy identifier.
    pub policy_id: PolicyId,
    /// Human-readable name, used in decision reasons.
    pub name: String,
    /// Rules, evaluated in priority order.
    pub rules: Vec<PolicyRule>,
    /// Lifecycle status.
    pub status: PolicyStatus,
    /// Policy-level priority; lower number is evaluated first.
    pub priority: u16,
    /// Optional time-of-day restriction.
    pub time_window: Option<TimeWindow>,
    /// When the policy was created.
    pub created_at: Timestamp,
}

impl Policy {
    /// Create an active policy with no rules yet.
    #[must_use]
    pub fn active(name: impl Into<String>, priority: u16) -> Self {
        Self {
            policy_id: PolicyId::new(),
            name: name.into(),
            rules: Vec::new(),
            status: PolicyStatus::Active,
            priority,
            time_window: None,
            created_at: Timestamp::now(),
        }
    }

    /// Create a policy with an explicit status.
    #[must_use]
    pub fn with_status(name: impl Into<String>, priority: u16, status: PolicyStatus) -> Self {
        Self {
            status,
            ..Self::active(name, priority)
        }
    }

    /// Add a rule (builder style).
    #[must_use]
    pub fn with_rule(mut self, rule: PolicyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Restrict the policy to a time window (builder style).
    #[must_use]
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Evaluate this policy against a domain at an instant.
    ///
    /// Returns the action and rule of the first match in priority
    /// order, or `None` if the window excludes the instant or no rule
    /// matches.
    #[must_use]
    pub fn evaluate(&self, domain: &str, at: DateTime<Utc>) -> Option<(RuleAction, RuleId)> {
        if let Some(window) = &self.time_window
            && !window.contains(at)
        {
            return None;
        }

        let mut rules: Vec<&PolicyRule> = self.rules.iter().collect();
        // Stable sort: insertion order breaks priority ties.
        rules.sort_by_key(|r| r.priority);

        rules
            .iter()
            .find(|rule| rule.matches(domain))
            .map(|rule| (rule.action, rule.rule_id))
    }
}
