//! Source record entities observed by the detection engine.
//!
//! These records are owned by other parts of the billing platform; the
//! detection and approval crates only ever read them. Each entity carries
//! an "unbilled" precondition used by exactly one detection rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, InvoiceId, ProjectId, SourceId};

/// A scanned or photographed expense receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique identifier for this receipt.
    pub id: SourceId,
    /// The account that captured the receipt.
    pub account_id: AccountId,
    /// Vendor the expense was paid to.
    pub vendor: String,
    /// Receipt amount.
    pub amount: f64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Client the expense should be billed to, if known.
    pub client_name: Option<String>,
    /// Client billing email, if known.
    pub client_email: Option<String>,
    /// Invoice this receipt has been attached to, if any.
    pub invoice_id: Option<InvoiceId>,
    /// When the receipt was captured.
    pub captured_at: DateTime<Utc>,
}

impl Receipt {
    /// Returns true if the receipt is not yet attached to any invoice.
    #[must_use]
    pub const fn is_unbilled(&self) -> bool {
        self.invoice_id.is_none()
    }
}

/// Out-of-scope work that a client has already signed off on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedWork {
    /// Unique identifier for this work item.
    pub id: SourceId,
    /// The account that performed the work.
    pub account_id: AccountId,
    /// Project the work belongs to, if any.
    pub project_id: Option<ProjectId>,
    /// What was done.
    pub description: String,
    /// The cost the client approved.
    pub approved_cost: f64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Client the work should be billed to, if known.
    pub client_name: Option<String>,
    /// Client billing email, if known.
    pub client_email: Option<String>,
    /// Invoice this work has been attached to, if any.
    pub invoice_id: Option<InvoiceId>,
    /// When the client approved the work.
    pub approved_at: DateTime<Utc>,
}

impl ScopedWork {
    /// Returns true if the approved work is not yet on any invoice.
    #[must_use]
    pub const fn is_unbilled(&self) -> bool {
        self.invoice_id.is_none()
    }
}

/// A transcribed voice note describing work performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceLog {
    /// Unique identifier for this voice log.
    pub id: SourceId,
    /// The account that recorded the note.
    pub account_id: AccountId,
    /// The transcript text.
    pub transcript: String,
    /// Structured cost extracted from the transcript, if any.
    pub estimated_amount: Option<f64>,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Client mentioned in the note, if identified.
    pub client_name: Option<String>,
    /// Client billing email, if identified.
    pub client_email: Option<String>,
    /// Invoice created from this note, if any.
    pub invoice_id: Option<InvoiceId>,
    /// When the note was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl VoiceLog {
    /// Returns true if the note has not been turned into an invoice.
    #[must_use]
    pub const fn is_unbilled(&self) -> bool {
        self.invoice_id.is_none()
    }

    /// Returns true if the transcript carried a structured cost.
    #[must_use]
    pub const fn has_structured_amount(&self) -> bool {
        self.estimated_amount.is_some()
    }
}

/// The lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Created but not yet sent to the client.
    Draft,
    /// Sent to the client.
    Sent,
    /// Paid by the client.
    Paid,
    /// Cancelled before sending.
    Void,
}

impl InvoiceStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An invoice as seen by the detection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier for this invoice.
    pub id: SourceId,
    /// The account that owns the invoice.
    pub account_id: AccountId,
    /// Client the invoice is addressed to, if known.
    pub client_name: Option<String>,
    /// Client billing email, if known.
    pub client_email: Option<String>,
    /// Invoice total.
    pub total: f64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Current lifecycle state.
    pub status: InvoiceStatus,
    /// When the invoice was created.
    pub created_at: DateTime<Utc>,
    /// When the invoice was sent, if it has been.
    pub sent_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Returns true if the invoice is still sitting in draft.
    #[must_use]
    pub fn is_unsent_draft(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn receipt(invoice: Option<InvoiceId>) -> Receipt {
        Receipt {
            id: SourceId::new(),
            account_id: AccountId::new(),
            vendor: "Hardware Depot".to_string(),
            amount: 450.0,
            currency: "USD".to_string(),
            client_name: Some("Acme Renovations".to_string()),
            client_email: Some("billing@acme.test".to_string()),
            invoice_id: invoice,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn receipt_unbilled_without_invoice() {
        assert!(receipt(None).is_unbilled());
        assert!(!receipt(Some(InvoiceId::new())).is_unbilled());
    }

    #[test]
    fn scoped_work_unbilled_without_invoice() {
        let mut work = ScopedWork {
            id: SourceId::new(),
            account_id: AccountId::new(),
            project_id: Some(ProjectId::new()),
            description: "Extra drywall repair".to_string(),
            approved_cost: 320.0,
            currency: "USD".to_string(),
            client_name: None,
            client_email: None,
            invoice_id: None,
            approved_at: Utc::now(),
        };
        assert!(work.is_unbilled());
        work.invoice_id = Some(InvoiceId::new());
        assert!(!work.is_unbilled());
    }

    #[test]
    fn voice_log_structured_amount() {
        let mut log = VoiceLog {
            id: SourceId::new(),
            account_id: AccountId::new(),
            transcript: "Spent three hours rewiring the panel".to_string(),
            estimated_amount: None,
            currency: "USD".to_string(),
            client_name: None,
            client_email: None,
            invoice_id: None,
            recorded_at: Utc::now(),
        };
        assert!(log.is_unbilled());
        assert!(!log.has_structured_amount());
        log.estimated_amount = Some(275.0);
        assert!(log.has_structured_amount());
    }

    #[test_case(InvoiceStatus::Draft, true; "draft is unsent")]
    #[test_case(InvoiceStatus::Sent, false; "sent is billed")]
    #[test_case(InvoiceStatus::Paid, false; "paid is billed")]
    #[test_case(InvoiceStatus::Void, false; "void is not a draft")]
    fn invoice_unsent_draft(status: InvoiceStatus, expected: bool) {
        let invoice = Invoice {
            id: SourceId::new(),
            account_id: AccountId::new(),
            client_name: None,
            client_email: None,
            total: 1200.0,
            currency: "USD".to_string(),
            status,
            created_at: Utc::now(),
            sent_at: None,
        };
        assert_eq!(invoice.is_unsent_draft(), expected);
    }

    #[test]
    fn invoice_status_display() {
        assert_eq!(format!("{}", InvoiceStatus::Draft), "draft");
        assert_eq!(format!("{}", InvoiceStatus::Sent), "sent");
    }

    #[test]
    fn receipt_serialization_roundtrip() {
        let original = receipt(None);
        let json = serde_json::to_string(&original);
        assert!(json.is_ok());
        let parsed: serde_json::Result<Receipt> = serde_json::from_str(&json.unwrap());
        assert!(parsed.is_ok());
        assert_eq!(parsed.ok(), Some(original));
    }
}
