//! Paid-tier entitlement checks.
//!
//! Alert generation is a paid feature. Every alert-creating path asks the
//! gate first, on every call; plan state can change between two events for
//! the same account, so eligibility is never cached.

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::debug;

use crate::ids::AccountId;

/// Decides whether an account may generate alerts.
///
/// Implementations must be side-effect-free; the engine re-checks on every
/// event.
pub trait EntitlementGate: Send + Sync {
    /// Returns true if the account is on a plan that includes alerts.
    fn is_eligible(&self, account_id: &AccountId) -> bool;
}

/// Entitlement gate over an explicit set of eligible accounts.
#[derive(Debug, Default)]
pub struct StaticEntitlements {
    eligible: RwLock<HashSet<AccountId>>,
}

impl StaticEntitlements {
    /// Creates a gate with no eligible accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an account as eligible.
    pub fn grant(&self, account_id: AccountId) {
        debug!(%account_id, "entitlement granted");
        self.eligible.write().insert(account_id);
    }

    /// Removes an account's eligibility.
    pub fn revoke(&self, account_id: &AccountId) {
        debug!(%account_id, "entitlement revoked");
        self.eligible.write().remove(account_id);
    }
}

impl EntitlementGate for StaticEntitlements {
    fn is_eligible(&self, account_id: &AccountId) -> bool {
        self.eligible.read().contains(account_id)
    }
}

/// Entitlement gate that treats every account as eligible.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenEntitlements;

impl OpenEntitlements {
    /// Creates a new always-eligible gate.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EntitlementGate for OpenEntitlements {
    fn is_eligible(&self, _account_id: &AccountId) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_gate_starts_empty() {
        let gate = StaticEntitlements::new();
        assert!(!gate.is_eligible(&AccountId::new()));
    }

    #[test]
    fn static_gate_grant_and_revoke() {
        let gate = StaticEntitlements::new();
        let account = AccountId::new();

        gate.grant(account);
        assert!(gate.is_eligible(&account));

        gate.revoke(&account);
        assert!(!gate.is_eligible(&account));
    }

    #[test]
    fn static_gate_rechecks_on_every_call() {
        let gate = StaticEntitlements::new();
        let account = AccountId::new();

        assert!(!gate.is_eligible(&account));
        gate.grant(account);
        assert!(gate.is_eligible(&account));
        gate.revoke(&account);
        assert!(!gate.is_eligible(&account));
    }

    #[test]
    fn open_gate_accepts_everyone() {
        let gate = OpenEntitlements::new();
        assert!(gate.is_eligible(&AccountId::new()));
    }

    #[test]
    fn gates_are_object_safe() {
        let gates: Vec<Box<dyn EntitlementGate>> = vec![
            Box::new(StaticEntitlements::new()),
            Box::new(OpenEntitlements::new()),
        ];
        let account = AccountId::new();
        assert!(!gates[0].is_eligible(&account));
        assert!(gates[1].is_eligible(&account));
    }
}
