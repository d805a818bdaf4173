//! Error types for the tally-approvals crate.

use thiserror::Error;

/// Errors that can occur in the approval workflow.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The requested transition is not legal from the proof's current
    /// state, or the presented token is unknown, expired, or already used.
    ///
    /// This is the typed rejection the client layer renders as
    /// "link no longer valid"; it never maps to a server error.
    #[error("invalid approval state: {reason}")]
    InvalidApprovalState {
        /// Why the transition was rejected.
        reason: String,
    },

    /// No scope proof exists with the given id.
    #[error("scope proof not found: {id}")]
    ProofNotFound {
        /// The proof id that was not found.
        id: String,
    },

    /// The photo limit would be exceeded.
    #[error("photo limit exceeded: at most {max} photos per scope proof")]
    PhotoLimitExceeded {
        /// The maximum number of photos allowed.
        max: usize,
    },

    /// A notification could not be dispatched.
    ///
    /// Surfaced only from the user-synchronous actions; detection and
    /// sweep call sites log and continue instead.
    #[error("notification dispatch failed: {0}")]
    Notification(#[from] tally_notify::NotifyError),

    /// The invoicing hand-off rejected an approved proof.
    #[error("invoicing hand-off failed: {reason}")]
    Handoff {
        /// Why the hand-off failed.
        reason: String,
    },
}

impl ApprovalError {
    /// Shorthand for an [`ApprovalError::InvalidApprovalState`] rejection.
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidApprovalState {
            reason: reason.into(),
        }
    }
}

/// Result type for approval operations.
pub type Result<T> = std::result::Result<T, ApprovalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_state() {
        let err = ApprovalError::invalid_state("token already used");
        assert_eq!(err.to_string(), "invalid approval state: token already used");
    }

    #[test]
    fn error_display_not_found() {
        let err = ApprovalError::ProofNotFound {
            id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "scope proof not found: abc-123");
    }

    #[test]
    fn error_display_photo_limit() {
        let err = ApprovalError::PhotoLimitExceeded { max: 5 };
        assert_eq!(
            err.to_string(),
            "photo limit exceeded: at most 5 photos per scope proof"
        );
    }

    #[test]
    fn error_from_notify() {
        let source = tally_notify::NotifyError::Transport {
            reason: "connection reset".to_string(),
        };
        let err: ApprovalError = source.into();
        assert!(matches!(err, ApprovalError::Notification(_)));
    }
}
