//! # tally-records
//!
//! Shared vocabulary for Tally's billing detection subsystem: identifier
//! newtypes, the source record entities the detection engine observes, a
//! read-only [`SourceRecordStore`] seam, and the paid-tier
//! [`EntitlementGate`].
//!
//! The detection and approval crates treat everything here as external
//! state: records are read, never written, and eligibility is re-checked
//! on every call.
//!
//! ## Example
//!
//! ```rust
//! use tally_records::{
//!     AccountId, EntitlementGate, InMemoryRecordStore, Receipt, SourceId,
//!     SourceRecordStore, StaticEntitlements,
//! };
//! use chrono::Utc;
//!
//! let store = InMemoryRecordStore::new();
//! let account = AccountId::new();
//!
//! store.upsert_receipt(Receipt {
//!     id: SourceId::new(),
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
//! let gate = StaticEntitlements::new();
//! gate.grant(account);
//! assert!(gate.is_eligible(&account));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entitlement;
pub mod error;
pub mod ids;
pub mod records;
pub mod store;

// Re-export main types at crate root
pub use entitlement::{EntitlementGate, OpenEntitlements, StaticEntitlements};
pub use error::{RecordStoreError, Result};
pub use ids::{AccountId, InvoiceId, ProjectId, SourceId};
pub use records::{Invoice, InvoiceStatus, Receipt, ScopedWork, VoiceLog};
pub use store::{InMemoryRecordStore, SourceRecordStore};
