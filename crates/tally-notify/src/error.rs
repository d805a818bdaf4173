//! Error types for the tally-notify crate.

use thiserror::Error;

/// Errors that can occur when dispatching a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport accepted the request but refused to deliver it.
    #[error("notification rejected on {channel}: {reason}")]
    Rejected {
        /// The channel that rejected the notification.
        channel: String,
        /// Why the notification was rejected.
        reason: String,
    },

    /// The transport could not be reached at all.
    #[error("notification transport failed: {reason}")]
    Transport {
        /// Why the transport failed.
        reason: String,
    },

    /// The notification payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_rejected() {
        let err = NotifyError::Rejected {
            channel: "email".to_string(),
            reason: "unknown recipient".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "notification rejected on email: unknown recipient"
        );
    }

    #[test]
    fn error_display_transport() {
        let err = NotifyError::Transport {
            reason: "connection reset".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "notification transport failed: connection reset"
        );
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not json");
        assert!(json_err.is_err());
        let err: NotifyError = json_err.unwrap_err().into();
        assert!(matches!(err, NotifyError::Serialization(_)));
    }
}
