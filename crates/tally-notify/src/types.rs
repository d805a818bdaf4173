//! Core types for notification dispatch.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Electronic mail.
    Email,
    /// Text message.
    Sms,
    /// Mobile push notification.
    Push,
}

impl Channel {
    /// Returns the channel as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The message templates the billing core sends.
///
/// The concrete rendering lives with the transport; the core only decides
/// which template goes to whom and with what payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    /// Tells the contractor their approval request went out.
    ApprovalRequestedContractor,
    /// Asks the client to sign off on out-of-scope work.
    ApprovalRequestedClient,
    /// Nudges the client about a still-pending approval.
    ApprovalReminder,
    /// Confirms to the contractor that the client approved.
    ApprovalConfirmed,
    /// Tells the contractor the approval window closed unanswered.
    ApprovalExpired,
}

impl Template {
    /// Returns the template id as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovalRequestedContractor => "approval_requested_contractor",
            Self::ApprovalRequestedClient => "approval_requested_client",
            Self::ApprovalReminder => "approval_reminder",
            Self::ApprovalConfirmed => "approval_confirmed",
            Self::ApprovalExpired => "approval_expired",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notification the core has decided to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// The delivery channel.
    pub channel: Channel,
    /// The template to render.
    pub template: Template,
    /// The recipient address (email, phone number, or device token).
    pub recipient: String,
    /// Template variables.
    pub payload: HashMap<String, String>,
}

impl NotificationRequest {
    /// Creates a request with an empty payload.
    #[must_use]
    pub fn new(channel: Channel, template: Template, recipient: impl Into<String>) -> Self {
        Self {
            channel,
            template,
            recipient: recipient.into(),
            payload: HashMap::new(),
        }
    }

    /// Adds a payload variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// The outcome reported by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Whether the transport accepted the notification.
    pub accepted: bool,
    /// The channel that handled it.
    pub channel: Channel,
    /// Optional transport detail (queue id, provider response).
    pub detail: Option<String>,
}

impl DispatchOutcome {
    /// Creates an accepted outcome.
    #[must_use]
    pub const fn accepted(channel: Channel) -> Self {
        Self {
            accepted: true,
            channel,
            detail: None,
        }
    }

    /// Sets the transport detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
