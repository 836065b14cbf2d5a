//! Robots/ToS policy gate.
//!
//! Loading and caching the robots document itself is an external concern; this
//! gate consumes a pre-resolved allow/deny decision function and applies the
//! configured enforcement policy around it.

use std::sync::Arc;

use url::Url;

/// How strictly the gate enforces a negative robots decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotsPolicy {
    /// Deny fetches that the decision function disallows.
    #[default]
    Enforce,
    /// Log a warning but allow the fetch regardless of the decision.
    Warn,
    /// Never consult the decision function.
    Ignore,
}

/// A pre-resolved robots/ToS decision for a URL. Implementations typically
/// wrap a parsed robots.txt document owned elsewhere.
pub trait RobotsDecision: Send + Sync {
    /// Returns `true` if `url` may be fetched.
    fn is_allowed(&self, url: &Url) -> bool;
}

/// A [`RobotsDecision`] that allows everything, for tests and default wiring.
#[derive(Debug, Default)]
pub struct AllowAll;

impl RobotsDecision for AllowAll {
    fn is_allowed(&self, _url: &Url) -> bool {
        true
    }
}

/// The outcome of a policy gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    /// The fetch may proceed.
    Allow,
    /// The fetch is denied, with a human-readable reason.
    Deny {
        /// Why the fetch was denied.
        reason: String,
    },
}

/// Decides whether a URL may be fetched, given a policy and a decision source.
pub struct PolicyGate {
    policy: RobotsPolicy,
    decision: Arc<dyn RobotsDecision>,
}

impl PolicyGate {
    /// Builds a gate from a policy and a decision source.
    #[must_use]
    pub fn new(policy: RobotsPolicy, decision: Arc<dyn RobotsDecision>) -> Self {
        Self { policy, decision }
    }

    /// Checks `url` against the configured policy.
    #[must_use]
    pub fn check(&self, url: &Url) -> GateResult {
        match self.policy {
            RobotsPolicy::Ignore => GateResult::Allow,
            RobotsPolicy::Warn => {
                if !self.decision.is_allowed(url) {
                    tracing::warn!(url = %url, "robots policy disallows this URL, proceeding anyway (warn mode)");
                }
                GateResult::Allow
            }
            RobotsPolicy::Enforce => {
                if self.decision.is_allowed(url) {
                    GateResult::Allow
                } else {
                    GateResult::Deny { reason: format!("robots policy disallows {url}") }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct DenyAll;
    impl RobotsDecision for DenyAll {
        fn is_allowed(&self, _url: &Url) -> bool {
            false
        }
    }

    #[rstest]
    #[case(RobotsPolicy::Enforce, false)]
    #[case(RobotsPolicy::Warn, true)]
    #[case(RobotsPolicy::Ignore, true)]
    fn policy_governs_deny_decision(#[case] policy: RobotsPolicy, #[case] allowed: bool) {
        let gate = PolicyGate::new(policy, Arc::new(DenyAll));
        let url = Url::parse("https://example.com").unwrap();
        let result = gate.check(&url);
        assert_eq!(matches!(result, GateResult::Allow), allowed);
    }

    #[test]
    fn allow_all_always_passes_enforce() {
        let gate = PolicyGate::new(RobotsPolicy::Enforce, Arc::new(AllowAll));
        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(gate.check(&url), GateResult::Allow);
    }
}
