//! Core types for the detection subsystem.
//!
//! - [`AlertKind`]: the category of suspected unbilled work
//! - [`AlertStatus`]: open or fixed
//! - [`SourceRef`]: the record an alert points at
//! - [`Alert`]: a flagged instance of suspected unbilled work
//! - [`AlertSummary`]: per-account rollup for dashboards

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tally_records::{AccountId, SourceId};

/// A unique identifier for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Creates a new random alert id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an alert id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The category of suspected unbilled work an alert flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A captured receipt not attached to any invoice.
    UnbilledReceipt,
    /// Client-approved out-of-scope work not attached to any invoice.
    ApprovedScopeNoInvoice,
    /// A transcribed voice note not turned into an invoice.
    VoiceLogNoInvoice,
    /// An invoice created but never sent.
    InvoiceNotSent,
}

impl AlertKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnbilledReceipt => "unbilled_receipt",
            Self::ApprovedScopeNoInvoice => "approved_scope_no_invoice",
            Self::VoiceLogNoInvoice => "voice_log_no_invoice",
            Self::InvoiceNotSent => "invoice_not_sent",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The lifecycle state of an alert.
///
/// Alerts are never deleted; once the underlying precondition is falsified
/// they flip to [`AlertStatus::Fixed`] and stay in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// The suspected unbilled work has not been addressed.
    Open,
    /// The precondition was later falsified.
    Fixed,
}

impl AlertStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fixed => "fixed",
        }
    }

    /// Returns true if the alert still needs attention.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of source record an alert points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// An expense receipt.
    Receipt,
    /// Client-approved out-of-scope work.
    ScopedWork,
    /// A transcribed voice note.
    VoiceLog,
    /// An invoice.
    Invoice,
}

impl SourceKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::ScopedWork => "scoped_work",
            Self::VoiceLog => "voice_log",
            Self::Invoice => "invoice",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reference to the source record that triggered an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// The kind of record.
    pub kind: SourceKind,
    /// The record's id.
    pub id: SourceId,
}

impl SourceRef {
    /// Creates a new source reference.
    #[must_use]
    pub const fn new(kind: SourceKind, id: SourceId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A flagged instance of suspected unbilled work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier for this alert.
    pub id: AlertId,
    /// The account the alert belongs to.
    pub account_id: AccountId,
    /// What category of unbilled work was detected.
    pub kind: AlertKind,
    /// Open or fixed.
    pub status: AlertStatus,
    /// The source record that triggered detection.
    pub source: SourceRef,
    /// Client the work should be billed to, if known.
    pub client_name: Option<String>,
    /// Client billing email, if known.
    pub client_email: Option<String>,
    /// Estimated unbilled amount, if the source carried one.
    pub estimated_amount: Option<f64>,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Detection confidence, 0-100.
    pub confidence: u8,
    /// When the alert was opened.
    pub opened_at: DateTime<Utc>,
    /// When the alert was fixed (None while open).
    pub fixed_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Creates a new open alert.
    #[must_use]
    pub fn new_open(
        account_id: AccountId,
        kind: AlertKind,
        source: SourceRef,
        confidence: u8,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            account_id,
            kind,
            status: AlertStatus::Open,
            source,
            client_name: None,
            client_email: None,
            estimated_amount: None,
            currency: currency.into(),
            confidence: confidence.min(100),
            opened_at: Utc::now(),
            fixed_at: None,
        }
    }

    /// Sets the estimated amount.
    #[must_use]
    pub const fn with_amount(mut self, amount: f64) -> Self {
        self.estimated_amount = Some(amount);
        self
    }

    /// Sets the client contact details.
    #[must_use]
    pub fn with_client(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.client_name = name;
        self.client_email = email;
        self
    }

    /// Transitions the alert to fixed.
    ///
    /// Idempotent; a fixed alert keeps its original `fixed_at`.
    pub fn fix(&mut self) {
        if self.status == AlertStatus::Open {
            self.status = AlertStatus::Fixed;
            self.fixed_at = Some(Utc::now());
        }
    }

    /// Returns true if the alert still needs attention.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Per-account rollup of open alerts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Number of open alerts.
    pub count: usize,
    /// Sum of the estimated amounts of open alerts that carry one.
    pub total_estimated_amount: f64,
}
