//! Bookkeeping for sent scope-proof notifications.
//!
//! The reconciliation sweep re-examines pending proofs on every run; the
//! only thing standing between it and a duplicate reminder is this ledger.
//! [`NotificationLedger::record_once`] is a conditional insert under one
//! write lock: whoever records first wins, everyone else sees `false` and
//! must not send.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_notify::Channel;

use crate::proof::ScopeProofId;

/// The notification types recorded per scope proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofNotification {
    /// The initial approval request pair.
    Requested,
    /// The mid-window nudge.
    Reminder,
    /// The window closed unanswered.
    Expired,
    /// The client signed off.
    Confirmed,
}

impl ProofNotification {
    /// Returns the notification type as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Reminder => "reminder",
            Self::Expired => "expired",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for ProofNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record of a notification that went out for a scope proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeProofNotification {
    /// The proof the notification was about.
    pub scope_proof_id: ScopeProofId,
    /// Which notification it was.
    pub notification_type: ProofNotification,
    /// The channel it went out on.
    pub channel: Channel,
    /// When it was recorded.
    pub sent_at: DateTime<Utc>,
}

/// Append-only ledger of sent notifications, keyed for idempotency.
#[derive(Debug, Default)]
pub struct NotificationLedger {
    inner: RwLock<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    seen: HashSet<(ScopeProofId, ProofNotification)>,
    records: Vec<ScopeProofNotification>,
}

impl NotificationLedger {
    /// Creates a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a notification unless one of the same type already exists
    /// for the proof.
    ///
    /// The existence check and the insert share one write lock, so two
    /// overlapping sweep runs cannot both record (and therefore cannot
    /// both send). Returns `false` on the duplicate.
    pub fn record_once(
        &self,
        scope_proof_id: ScopeProofId,
        notification_type: ProofNotification,
        channel: Channel,
    ) -> bool {
        let mut inner = self.inner.write();
        if !inner.seen.insert((scope_proof_id, notification_type)) {
            debug!(
                %scope_proof_id,
                %notification_type,
                "notification already recorded, skipping"
            );
            return false;
        }
        inner.records.push(ScopeProofNotification {
            scope_proof_id,
            notification_type,
            channel,
            sent_at: Utc::now(),
        });
        true
    }

    /// Returns true if a notification of this type has been recorded.
    #[must_use]
    pub fn has_sent(&self, scope_proof_id: &ScopeProofId, notification_type: ProofNotification) -> bool {
        self.inner
            .read()
            .seen
            .contains(&(*scope_proof_id, notification_type))
    }

    /// Returns the records for a proof, in recording order.
    #[must_use]
    pub fn notifications_for(&self, scope_proof_id: &ScopeProofId) -> Vec<ScopeProofNotification> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| r.scope_proof_id == *scope_proof_id)
            .cloned()
            .collect()
    }

    /// Returns the total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_once_first_wins() {
        let ledger = NotificationLedger::new();
        let id = ScopeProofId::new();

        assert!(ledger.record_once(id, ProofNotification::Reminder, Channel::Email));
        assert!(!ledger.record_once(id, ProofNotification::Reminder, Channel::Email));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn different_types_record_separately() {
        let ledger = NotificationLedger::new();
        let id = ScopeProofId::new();

        assert!(ledger.record_once(id, ProofNotification::Requested, Channel::Email));
        assert!(ledger.record_once(id, ProofNotification::Reminder, Channel::Email));
        assert!(ledger.record_once(id, ProofNotification::Expired, Channel::Email));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn different_proofs_record_separately() {
        let ledger = NotificationLedger::new();
        let a = ScopeProofId::new();
        let b = ScopeProofId::new();

        assert!(ledger.record_once(a, ProofNotification::Reminder, Channel::Email));
        assert!(ledger.record_once(b, ProofNotification::Reminder, Channel::Email));
        assert_eq!(ledger.notifications_for(&a).len(), 1);
        assert_eq!(ledger.notifications_for(&b).len(), 1);
    }

    #[test]
    fn has_sent_reflects_records() {
        let ledger = NotificationLedger::new();
        let id = ScopeProofId::new();

        assert!(!ledger.has_sent(&id, ProofNotification::Reminder));
        ledger.record_once(id, ProofNotification::Reminder, Channel::Sms);
        assert!(ledger.has_sent(&id, ProofNotification::Reminder));
        assert!(!ledger.has_sent(&id, ProofNotification::Expired));
    }

    #[test]
    fn empty_ledger() {
        let ledger = NotificationLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert!(ledger.notifications_for(&ScopeProofId::new()).is_empty());
    }
}
