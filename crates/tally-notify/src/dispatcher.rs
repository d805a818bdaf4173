//! Pluggable notification dispatchers.
//!
//! The core decides *when* and *what* to send; implementations of
//! [`NotificationDispatcher`] own the transport. Failures are reported,
//! never retried here.

use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::{DispatchOutcome, NotificationRequest};

/// Trait for notification transports.
///
/// Implement this trait to wire the billing core to a real delivery
/// provider.
pub trait NotificationDispatcher: Send + Sync + fmt::Debug {
    /// Returns the name of this dispatcher.
    fn name(&self) -> &str;

    /// Sends a notification.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::NotifyError`] if the transport rejects or cannot
    /// be reached. Callers decide whether to swallow or surface the error.
    fn send(&self, request: &NotificationRequest) -> Result<DispatchOutcome>;
}

/// Dispatcher that logs notifications through `tracing` and accepts them.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

impl LogDispatcher {
    /// Creates a new logging dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationDispatcher for LogDispatcher {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, request: &NotificationRequest) -> Result<DispatchOutcome> {
        info!(
            channel = %request.channel,
            template = %request.template,
            recipient = %request.recipient,
            vars = request.payload.len(),
            "notification dispatched"
        );
        Ok(DispatchOutcome::accepted(request.channel))
    }
}

/// Dispatcher that silently drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl NullDispatcher {
    /// Creates a new no-op dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationDispatcher for NullDispatcher {
    fn name(&self) -> &str {
        "null"
    }

    fn send(&self, request: &NotificationRequest) -> Result<DispatchOutcome> {
        debug!(template = %request.template, "notification dropped");
        Ok(DispatchOutcome::accepted(request.channel))
    }
}

/// Dispatcher that records every request it sees.
///
/// Used by the detection, approval, and sweep test suites to assert on
/// exactly which notifications went out.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: RwLock<Vec<NotificationRequest>>,
}

impl RecordingDispatcher {
    /// Creates a new recording dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every request sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.read().clone()
    }

    /// Returns the number of requests sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.read().len()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, request: &NotificationRequest) -> Result<DispatchOutcome> {
        self.sent.write().push(request.clone());
        Ok(DispatchOutcome::accepted(request.channel))
    }
}
