//! In-memory alert store with dedup enforcement.
//!
//! The store owns the invariant *at most one open alert per
//! `(account, kind, source)`*. All mutation happens inside a single
//! write-lock critical section over the alert map, the open-key index, and
//! the event log together — the in-process equivalent of a
//! unique-constraint insert, so two racing openers can never both succeed.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, info};

use tally_records::{AccountId, SourceId};

use crate::events::AlertEvent;
use crate::types::{Alert, AlertId, AlertKind, AlertSummary};

/// The dedup key for open alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OpenKey {
    account_id: AccountId,
    kind: AlertKind,
    source_id: SourceId,
}

impl OpenKey {
    fn for_alert(alert: &Alert) -> Self {
        Self {
            account_id: alert.account_id,
            kind: alert.kind,
            source_id: alert.source.id,
        }
    }
}

/// The result of attempting to open an alert.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    /// The alert was inserted and an audit entry recorded.
    Created(Alert),
    /// An open alert with the same `(account, kind, source)` already
    /// exists; nothing was written.
    DuplicateOpen(AlertId),
}

struct StoreInner {
    alerts: HashMap<AlertId, Alert>,
    open_index: HashMap<OpenKey, AlertId>,
    events: Vec<AlertEvent>,
}

/// Store for alerts and their audit log.
///
/// Alerts are never deleted; closure flips them to fixed and removes only
/// the open-index entry.
pub struct AlertStore {
    inner: RwLock<StoreInner>,
}

impl AlertStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                alerts: HashMap::new(),
                open_index: HashMap::new(),
                events: Vec::new(),
            }),
        }
    }

    /// Attempts to open an alert, enforcing the dedup invariant.
    ///
    /// The index probe and the insert happen under one write lock; a
    /// duplicate is the no-op signal, not an error.
    pub fn open(&self, alert: Alert) -> OpenOutcome {
        let key = OpenKey::for_alert(&alert);
        let mut inner = self.inner.write();

        if let Some(existing) = inner.open_index.get(&key) {
            debug!(
                alert_id = %existing,
                account_id = %key.account_id,
                kind = %key.kind,
                source_id = %key.source_id,
                "open alert already exists, skipping"
            );
            return OpenOutcome::DuplicateOpen(*existing);
        }

        info!(
            alert_id = %alert.id,
            account_id = %alert.account_id,
            kind = %alert.kind,
            source = %alert.source,
            confidence = alert.confidence,
            "alert opened"
        );

        inner.events.push(AlertEvent::created(&alert));
        inner.open_index.insert(key, alert.id);
        inner.alerts.insert(alert.id, alert.clone());

        OpenOutcome::Created(alert)
    }

    /// Closes the open alert for `(account, kind, source)`, if one exists.
    ///
    /// The alert flips to fixed, the index entry is removed, and a CLOSED
    /// audit entry is appended, all in one critical section. Returns `None`
    /// when nothing is open (duplicate-close no-op).
    pub fn close(
        &self,
        account_id: &AccountId,
        kind: AlertKind,
        source_id: &SourceId,
        detail: HashMap<String, String>,
    ) -> Option<Alert> {
        let key = OpenKey {
            account_id: *account_id,
            kind,
            source_id: *source_id,
        };
        let mut inner = self.inner.write();

        let Some(alert_id) = inner.open_index.remove(&key) else {
            debug!(
                account_id = %account_id,
                kind = %kind,
                source_id = %source_id,
                "no open alert to close"
            );
            return None;
        };

        let closed = {
            let alert = inner.alerts.get_mut(&alert_id)?;
            alert.fix();
            alert.clone()
        };

        info!(
            alert_id = %closed.id,
            account_id = %closed.account_id,
            kind = %closed.kind,
            source = %closed.source,
            "alert closed"
        );
        inner.events.push(AlertEvent::closed(&closed, detail));

        Some(closed)
    }

    /// Gets an alert by id.
    #[must_use]
    pub fn get(&self, id: &AlertId) -> Option<Alert> {
        self.inner.read().alerts.get(id).cloned()
    }

    /// Returns the open alerts for an account, oldest first.
    #[must_use]
    pub fn list_open(&self, account_id: &AccountId) -> Vec<Alert> {
        let inner = self.inner.read();
        let mut open: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| a.is_open() && a.account_id == *account_id)
            .cloned()
            .collect();
        open.sort_by_key(|a| a.opened_at);
        open
    }

    /// Returns the per-account rollup of open alerts.
    #[must_use]
    pub fn summary(&self, account_id: &AccountId) -> AlertSummary {
        let inner = self.inner.read();
        let mut summary = AlertSummary::default();
        for alert in inner.alerts.values() {
            if alert.is_open() && alert.account_id == *account_id {
                summary.count += 1;
                summary.total_estimated_amount += alert.estimated_amount.unwrap_or(0.0);
            }
        }
        summary
    }

    /// Returns the audit entries for an alert, in recording order.
    #[must_use]
    pub fn events_for(&self, alert_id: &AlertId) -> Vec<AlertEvent> {
        self.inner
            .read()
            .events
            .iter()
            .filter(|e| e.alert_id == *alert_id)
            .cloned()
            .collect()
    }

    /// Returns the total number of alerts ever opened.
    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.inner.read().alerts.len()
    }

    /// Returns the number of currently open alerts.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.read().open_index.len()
    }

    /// Returns the total number of audit entries.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.inner.read().events.len()
    }
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AlertStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("AlertStore")
            .field("alerts", &inner.alerts.len())
            .field("open", &inner.open_index.len())
            .field("events", &inner.events.len())
            .finish()
    }
}
