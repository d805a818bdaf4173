//! Immutable audit entries for alert mutations.
//!
//! Every alert creation and closure appends an [`AlertEvent`]; entries are
//! never updated or deleted, so the log is a faithful history of what the
//! detection engine did and why.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tally_records::AccountId;

use crate::types::{Alert, AlertId, AlertKind, SourceRef};

/// What happened to the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertEventKind {
    /// The alert was opened.
    Created,
    /// The alert was fixed.
    Closed,
}

impl AlertEventKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for AlertEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable audit entry recorded on every alert mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique identifier for this entry.
    pub id: Uuid,
    /// The alert this entry belongs to.
    pub alert_id: AlertId,
    /// What happened.
    pub kind: AlertEventKind,
    /// The account the alert belongs to.
    pub account_id: AccountId,
    /// The alert's detection category.
    pub alert_kind: AlertKind,
    /// The source record the alert points at.
    pub source: SourceRef,
    /// Free-form metadata (confidence, amounts, close reason).
    pub detail: HashMap<String, String>,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl AlertEvent {
    /// Builds the entry for a freshly opened alert.
    #[must_use]
    pub fn created(alert: &Alert) -> Self {
        let mut detail = HashMap::new();
        detail.insert("confidence".to_string(), alert.confidence.to_string());
        if let Some(amount) = alert.estimated_amount {
            detail.insert("estimated_amount".to_string(), amount.to_string());
        }

        Self {
            id: Uuid::new_v4(),
            alert_id: alert.id,
            kind: AlertEventKind::Created,
            account_id: alert.account_id,
            alert_kind: alert.kind,
            source: alert.source,
            detail,
            recorded_at: Utc::now(),
        }
    }

    /// Builds the entry for a closed alert.
    #[must_use]
    pub fn closed(alert: &Alert, detail: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id: alert.id,
            kind: AlertEventKind::Closed,
            account_id: alert.account_id,
            alert_kind: alert.kind,
            source: alert.source,
            detail,
            recorded_at: Utc::now(),
        }
    }
}
