//! Reconciliation sweep for Tally.
//!
//! The synchronous event path reacts to what it sees; this crate owns
//! everything driven by the clock instead: mid-window approval reminders,
//! token expiry, and detection of draft invoices whose business event never
//! arrived.
//!
//! Three passes run on two independent cadences:
//!
//! 1. **Reminder** — pending proofs ≥ 12 h into their approval window get
//!    exactly one nudge
//! 2. **Expiry** — pending proofs past `token_expires_at` transition to
//!    expired and get exactly one notice
//! 3. **Draft-invoice** — stale drafts are re-fed to the detection engine
//!    as if the event had fired
//!
//! Every action is gated on durable state (the approval notification
//! ledger, the alert store's dedup index), so overlapping runs and
//! crash-restarts neither skip nor double-run anything. A single record's
//! failure is logged and counted; the batch always completes.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_alerts::DetectionEngine;
//! use tally_approvals::ApprovalService;
//! use tally_notify::LogDispatcher;
//! use tally_records::{InMemoryRecordStore, OpenEntitlements};
//! use tally_sweep::ReconciliationSweep;
//!
//! let records = Arc::new(InMemoryRecordStore::new());
//! let approvals = Arc::new(ApprovalService::new(Arc::new(LogDispatcher::new())));
//! let engine = Arc::new(DetectionEngine::new(
//!     Arc::new(OpenEntitlements::new()),
//!     records.clone(),
//! ));
//!
//! let sweep = ReconciliationSweep::new(approvals, engine, records);
//! let report = sweep.run_once();
//! assert_eq!(report.total_failures(), 0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod report;
pub mod runner;
pub mod sweep;

// Re-export main types at crate root
pub use report::{PassReport, SweepReport, SweepStatus};
pub use runner::{SweepHandle, start_sweep_task};
pub use sweep::{ReconciliationSweep, SweepConfig};
