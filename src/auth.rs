//! Access gate consumed before every mutating operation.
//!
//! The gate is a seam, not an identity provider: whoever wires the
//! application decides how the caller identity was established (OAuth proxy,
//! mTLS, a trusted header from the ingress). The core only asks one question.

use std::sync::Arc;

/// Authorization predicate consulted before any store mutation.
pub trait AccessGate: Send + Sync {
    /// Whether `identity` may mutate configuration.
    fn is_authorized(&self, identity: &str) -> bool;
}

/// Gate backed by a static allow-list of operator identities.
///
/// An empty list denies everyone, so an unconfigured deployment is closed by
/// default rather than open.
#[derive(Debug, Clone)]
pub struct AllowListGate {
    allowed: Vec<String>,
}

impl AllowListGate {
    /// Build a gate from the configured operator list.
    pub fn new(allowed: Vec<String>) -> Arc<Self> {
        Arc::new(Self { allowed })
    }
}

impl AccessGate for AllowListGate {
    fn is_authorized(&self, identity: &str) -> bool {
        self.allowed.iter().any(|entry| entry == identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_identities_are_authorized() {
        let gate = AllowListGate::new(vec!["race-ops".into(), "team-principal".into()]);
        assert!(gate.is_authorized("race-ops"));
        assert!(gate.is_authorized("team-principal"));
    }

    #[test]
    fn unlisted_identities_are_denied() {
        let gate = AllowListGate::new(vec!["race-ops".into()]);
        assert!(!gate.is_authorized("intruder"));
        assert!(!gate.is_authorized("Race-Ops"));
        assert!(!gate.is_authorized(""));
    }

    #[test]
    fn an_empty_allow_list_denies_everyone() {
        let gate = AllowListGate::new(Vec::new());
        assert!(!gate.is_authorized("race-ops"));
    }
}
