//! Scope-approval workflow for Tally.
//!
//! `tally-approvals` lets a contractor ask a client to sign off on
//! out-of-scope work before it lands on an invoice. A [`ScopeProof`] walks
//! `draft → pending → approved | expired`; the pending window is guarded by
//! a single-use, unguessable token that is hashed at rest and verified in
//! constant time.
//!
//! # Guarantees
//!
//! - **Token single-use**: a token resolves at most once; it is consumed on
//!   use regardless of the decision, and permanently invalidated on expiry
//! - **Monotone lifecycle**: approved and expired are terminal; every
//!   transition has exactly one enabling prior state, so duplicate triggers
//!   are typed rejections, never corruption
//! - **Idempotent notifications**: the [`NotificationLedger`] records
//!   before sending, so overlapping sweep runs send each reminder and
//!   expiry notice at most once
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_approvals::{ApprovalService, Decision, ScopeProof, ScopeProofStatus};
//! use tally_notify::LogDispatcher;
//! use tally_records::AccountId;
//!
//! let service = ApprovalService::new(Arc::new(LogDispatcher::new()));
//!
//! let draft = ScopeProof::new_draft(AccountId::new(), "extra drywall", 320.0, "USD")
//!     .with_client(Some("Acme".to_string()), Some("billing@acme.test".to_string()));
//! let id = service.create_draft(draft).unwrap();
//!
//! let grant = service.request_approval(&id).unwrap();
//! let status = service
//!     .resolve_approval(grant.token.as_str(), Decision::Approve)
//!     .unwrap();
//! assert_eq!(status, ScopeProofStatus::Approved);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handoff;
pub mod notifications;
pub mod proof;
pub mod service;
pub mod token;

// Re-export main types at crate root
pub use error::{ApprovalError, Result};
pub use handoff::{ApprovalHandoff, NullHandoff, RecordingHandoff};
pub use notifications::{NotificationLedger, ProofNotification, ScopeProofNotification};
pub use proof::{PhotoRef, ScopeProof, ScopeProofId, ScopeProofStatus};
pub use service::{ApprovalConfig, ApprovalGrant, ApprovalService, Decision};
pub use token::{ApprovalTokenHash, ApprovalTokenSecret};
