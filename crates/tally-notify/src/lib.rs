//! # tally-notify
//!
//! The notification seam for Tally's billing detection subsystem.
//!
//! The detection engine, approval workflow, and reconciliation sweep decide
//! *when* a message should go out and *what* it should say; the transport
//! that actually delivers it lives behind the [`NotificationDispatcher`]
//! trait. This crate defines that seam plus the channel/template vocabulary
//! shared by both sides.
//!
//! ## Example
//!
//! ```rust
//! use tally_notify::{
//!     Channel, LogDispatcher, NotificationDispatcher, NotificationRequest, Template,
//! };
//!
//! let dispatcher = LogDispatcher::new();
//! let request = NotificationRequest::new(
//!     Channel::Email,
//!     Template::ApprovalRequestedClient,
//!     "client@acme.test",
//! )
//! .with_var("contractor", "Dana")
//! .with_var("amount", "450.00");
//!
//! let outcome = dispatcher.send(&request).unwrap();
//! assert!(outcome.accepted);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod types;

// Re-export main types at crate root
pub use dispatcher::{LogDispatcher, NotificationDispatcher, NullDispatcher, RecordingDispatcher};
pub use error::{NotifyError, Result};
pub use types::{Channel, DispatchOutcome, NotificationRequest, Template};
