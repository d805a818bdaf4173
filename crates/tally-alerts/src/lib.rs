//! Unbilled-work detection for Tally.
//!
//! `tally-alerts` watches business events (a receipt captured, an invoice
//! drafted, a voice note transcribed) and flags project activity that has
//! not been converted into a sent invoice.
//!
//! # Guarantees
//!
//! - **Dedup**: at most one open alert per `(account, kind, source)`,
//!   enforced by an atomic conditional insert in [`AlertStore`]
//! - **Closure**: when a later event falsifies the precondition, the open
//!   alert flips to fixed (never deleted) with a CLOSED audit entry
//! - **Fire-and-forget**: [`DetectionEngine::on_business_event`] never
//!   blocks or fails the triggering action; collaborator failures are
//!   logged and swallowed
//! - **Gating**: the paid-tier entitlement check runs on every call
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use tally_alerts::{BusinessEvent, DetectionEngine, DetectionOutcome};
//! use tally_records::{
//!     AccountId, InMemoryRecordStore, OpenEntitlements, Receipt, SourceId,
//! };
//!
//! let records = Arc::new(InMemoryRecordStore::new());
//! let engine = DetectionEngine::new(Arc::new(OpenEntitlements::new()), records.clone());
//!
//! let account = AccountId::new();
//! let source = SourceId::new();
//! records.upsert_receipt(Receipt {
//!     id: source,
//!     account_id: account,
//!     vendor: "Hardware Depot".to_string(),
//!     amount: 450.0,
//!     currency: "USD".to_string(),
//!     client_name: None,
//!     client_email: None,
//!     invoice_id: None,
//!     captured_at: Utc::now(),
//! });
//!
//! let outcome = engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);
//! assert!(matches!(outcome, DetectionOutcome::AlertOpened(_)));
//! assert_eq!(engine.alert_summary(&account).count, 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod events;
pub mod rules;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use engine::{DetectionEngine, DetectionOutcome};
pub use error::{AlertError, Result};
pub use events::{AlertEvent, AlertEventKind};
pub use rules::{BusinessEvent, RuleDecision, RuleFinding};
pub use store::{AlertStore, OpenOutcome};
pub use types::{Alert, AlertId, AlertKind, AlertStatus, AlertSummary, SourceKind, SourceRef};
