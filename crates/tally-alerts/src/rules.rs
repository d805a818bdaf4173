//! Detection rules, one per business event.
//!
//! [`BusinessEvent`] is a closed enum: every variant has exactly one rule
//! and one [`AlertKind`], matched exhaustively, so adding an event type
//! without a rule fails to compile.
//!
//! Each rule is a pure function of the source record. It decides whether
//! the record's "unbilled" precondition holds ([`RuleDecision::Raise`]),
//! has been falsified ([`RuleDecision::Clear`], which drives closure of an
//! existing open alert), or cannot apply at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use tally_records::{Invoice, InvoiceStatus, Receipt, ScopedWork, VoiceLog};

use crate::types::{AlertKind, SourceKind};

/// Confidence for a scanned receipt unlinked to any invoice.
pub const RECEIPT_CONFIDENCE: u8 = 90;
/// Confidence for client-approved scope work with no invoice.
pub const SCOPED_WORK_CONFIDENCE: u8 = 95;
/// Confidence for a voice log that carried a structured cost.
pub const VOICE_STRUCTURED_CONFIDENCE: u8 = 70;
/// Confidence for a raw transcript with no structured cost data; spoken
/// content is not always billable.
pub const VOICE_UNSTRUCTURED_CONFIDENCE: u8 = 55;
/// Confidence for an invoice still sitting in draft.
pub const DRAFT_INVOICE_CONFIDENCE: u8 = 80;

/// A signal that a source record's billing-relevant state may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessEvent {
    /// A receipt was captured or its invoice link changed.
    ReceiptRecorded,
    /// Out-of-scope work was approved or its invoice link changed.
    ScopeWorkApproved,
    /// A voice note was transcribed or its invoice link changed.
    VoiceLogCaptured,
    /// An invoice was created, sent, paid, or voided.
    InvoiceStateChanged,
}

impl BusinessEvent {
    /// Returns the event as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReceiptRecorded => "receipt_recorded",
            Self::ScopeWorkApproved => "scope_work_approved",
            Self::VoiceLogCaptured => "voice_log_captured",
            Self::InvoiceStateChanged => "invoice_state_changed",
        }
    }

    /// Returns the alert kind this event's rule manages.
    #[must_use]
    pub const fn alert_kind(&self) -> AlertKind {
        match self {
            Self::ReceiptRecorded => AlertKind::UnbilledReceipt,
            Self::ScopeWorkApproved => AlertKind::ApprovedScopeNoInvoice,
            Self::VoiceLogCaptured => AlertKind::VoiceLogNoInvoice,
            Self::InvoiceStateChanged => AlertKind::InvoiceNotSent,
        }
    }

    /// Returns the source record kind this event's rule reads.
    #[must_use]
    pub const fn source_kind(&self) -> SourceKind {
        match self {
            Self::ReceiptRecorded => SourceKind::Receipt,
            Self::ScopeWorkApproved => SourceKind::ScopedWork,
            Self::VoiceLogCaptured => SourceKind::VoiceLog,
            Self::InvoiceStateChanged => SourceKind::Invoice,
        }
    }
}

impl fmt::Display for BusinessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a rule extracted from a record whose precondition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFinding {
    /// Detection confidence, 0-100.
    pub confidence: u8,
    /// Estimated unbilled amount, if the record carried one.
    pub estimated_amount: Option<f64>,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Client the work should be billed to, if known.
    pub client_name: Option<String>,
    /// Client billing email, if known.
    pub client_email: Option<String>,
}

/// The decision a rule reached about a source record.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDecision {
    /// The unbilled precondition holds; an alert should exist.
    Raise(RuleFinding),
    /// The precondition is now false; any open alert should close.
    Clear,
    /// The record is missing or the rule does not apply to it.
    NotApplicable,
}

/// Rule for [`BusinessEvent::ReceiptRecorded`].
#[must_use]
pub fn evaluate_receipt(receipt: Option<&Receipt>) -> RuleDecision {
    let Some(receipt) = receipt else {
        return RuleDecision::NotApplicable;
    };
    if receipt.is_unbilled() {
        RuleDecision::Raise(RuleFinding {
            confidence: RECEIPT_CONFIDENCE,
            estimated_amount: Some(receipt.amount),
            currency: receipt.currency.clone(),
            client_name: receipt.client_name.clone(),
            client_email: receipt.client_email.clone(),
        })
    } else {
        RuleDecision::Clear
    }
}

/// Rule for [`BusinessEvent::ScopeWorkApproved`].
#[must_use]
pub fn evaluate_scoped_work(work: Option<&ScopedWork>) -> RuleDecision {
    let Some(work) = work else {
        return RuleDecision::NotApplicable;
    };
    if work.is_unbilled() {
        RuleDecision::Raise(RuleFinding {
            confidence: SCOPED_WORK_CONFIDENCE,
            estimated_amount: Some(work.approved_cost),
            currency: work.currency.clone(),
            client_name: work.client_name.clone(),
            client_email: work.client_email.clone(),
        })
    } else {
        RuleDecision::Clear
    }
}

/// Rule for [`BusinessEvent::VoiceLogCaptured`].
#[must_use]
pub fn evaluate_voice_log(log: Option<&VoiceLog>) -> RuleDecision {
    let Some(log) = log else {
        return RuleDecision::NotApplicable;
    };
    if log.is_unbilled() {
        let confidence = if log.has_structured_amount() {
            VOICE_STRUCTURED_CONFIDENCE
        } else {
            VOICE_UNSTRUCTURED_CONFIDENCE
        };
        RuleDecision::Raise(RuleFinding {
            confidence,
            estimated_amount: log.estimated_amount,
            currency: log.currency.clone(),
            client_name: log.client_name.clone(),
            client_email: log.client_email.clone(),
        })
    } else {
        RuleDecision::Clear
    }
}

/// Rule for [`BusinessEvent::InvoiceStateChanged`].
#[must_use]
pub fn evaluate_invoice(invoice: Option<&Invoice>) -> RuleDecision {
    let Some(invoice) = invoice else {
        return RuleDecision::NotApplicable;
    };
    match invoice.status {
        InvoiceStatus::Draft => RuleDecision::Raise(RuleFinding {
            confidence: DRAFT_INVOICE_CONFIDENCE,
            estimated_amount: Some(invoice.total),
            currency: invoice.currency.clone(),
            client_name: invoice.client_name.clone(),
            client_email: invoice.client_email.clone(),
        }),
        // Sent and paid invoices are billed; a voided draft is no longer
        // actionable either way.
        InvoiceStatus::Sent | InvoiceStatus::Paid | InvoiceStatus::Void => RuleDecision::Clear,
    }
}
