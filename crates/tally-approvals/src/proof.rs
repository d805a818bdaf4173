//! The scope proof and its lifecycle.
//!
//! A [`ScopeProof`] is a contractor's request for client sign-off on
//! out-of-scope work. Its status walks `draft → pending → approved` or
//! `draft → pending → expired`; approved and expired are terminal. Every
//! transition is a total function of (current status, token validity,
//! time) with exactly one enabling prior state, so a duplicate trigger is
//! a typed rejection, never corruption.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tally_records::{AccountId, InvoiceId, ProjectId};

use crate::error::{ApprovalError, Result};
use crate::token::ApprovalTokenHash;

/// A unique identifier for a scope proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeProofId(Uuid);

impl ScopeProofId {
    /// Creates a new random scope proof id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a scope proof id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ScopeProofId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeProofId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle state of a scope proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeProofStatus {
    /// Being assembled by the contractor; no token exists yet.
    Draft,
    /// Waiting for the client; a live token is out.
    Pending,
    /// The client signed off. Terminal.
    Approved,
    /// The approval window closed unanswered, or the client declined.
    /// Terminal.
    Expired,
}

impl ScopeProofStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Expired => "expired",
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Expired)
    }
}

impl fmt::Display for ScopeProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An ordered photo attachment documenting the extra work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    /// Where the photo is stored.
    pub url: String,
    /// Position in the proof's photo strip, starting at 0.
    pub position: usize,
}

/// A request for client sign-off on out-of-scope work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeProof {
    /// Unique identifier for this proof.
    pub id: ScopeProofId,
    /// The contractor account that owns the proof.
    pub account_id: AccountId,
    /// Project the work belongs to, if any.
    pub project_id: Option<ProjectId>,
    /// Invoice the approved cost should land on, if already known.
    pub invoice_id: Option<InvoiceId>,
    /// What the extra work is.
    pub description: String,
    /// The cost the client is asked to approve.
    pub estimated_cost: f64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Client name, if known.
    pub client_name: Option<String>,
    /// Client email the approval request goes to, if known.
    pub client_email: Option<String>,
    /// Ordered photo attachments, at most [`ScopeProof::MAX_PHOTOS`].
    pub photos: Vec<PhotoRef>,
    /// Current lifecycle state.
    pub status: ScopeProofStatus,
    /// Hash of the live approval token; the plaintext is never stored.
    pub token_hash: Option<ApprovalTokenHash>,
    /// When the live token stops being honored.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// Whether the token has been consumed. Set on use regardless of
    /// outcome and on expiry; never cleared.
    pub token_used: bool,
    /// When approval was requested (the proof entered pending).
    pub requested_at: Option<DateTime<Utc>>,
    /// When the client approved, if they did.
    pub approved_at: Option<DateTime<Utc>>,
    /// Who approved, if anyone.
    pub approved_by: Option<String>,
    /// When the proof was created.
    pub created_at: DateTime<Utc>,
    /// When the proof last changed.
    pub updated_at: DateTime<Utc>,
}

impl ScopeProof {
    /// Maximum number of photo attachments per proof.
    pub const MAX_PHOTOS: usize = 5;

    /// Creates a new draft proof.
    #[must_use]
    pub fn new_draft(
        account_id: AccountId,
        description: impl Into<String>,
        estimated_cost: f64,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ScopeProofId::new(),
            account_id,
            project_id: None,
            invoice_id: None,
            description: description.into(),
            estimated_cost,
            currency: currency.into(),
            client_name: None,
            client_email: None,
            photos: Vec::new(),
            status: ScopeProofStatus::Draft,
            token_hash: None,
            token_expires_at: None,
            token_used: false,
            requested_at: None,
            approved_at: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the project.
    #[must_use]
    pub const fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the target invoice.
    #[must_use]
    pub const fn with_invoice(mut self, invoice_id: InvoiceId) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    /// Sets the client contact details.
    #[must_use]
    pub fn with_client(mut self, name: Option<String>, email: Option<String>) -> Self {
        self.client_name = name;
        self.client_email = email;
        self
    }

    /// Appends a photo to the strip.
    ///
    /// # Errors
    ///
    /// Rejects attachments once approval has been requested, and enforces
    /// the photo limit.
    pub fn attach_photo(&mut self, url: impl Into<String>) -> Result<usize> {
        if self.status != ScopeProofStatus::Draft {
            return Err(ApprovalError::invalid_state(format!(
                "photos can only be attached in draft, proof is {}",
                self.status
            )));
        }
        if self.photos.len() >= Self::MAX_PHOTOS {
            return Err(ApprovalError::PhotoLimitExceeded {
                max: Self::MAX_PHOTOS,
            });
        }
        let position = self.photos.len();
        self.photos.push(PhotoRef {
            url: url.into(),
            position,
        });
        self.updated_at = Utc::now();
        Ok(position)
    }

    /// Transitions `draft → pending`, installing the freshly minted token.
    ///
    /// # Errors
    ///
    /// Rejects any prior state other than draft; a token is minted at most
    /// once per proof and never reused.
    pub fn mark_pending(
        &mut self,
        token_hash: ApprovalTokenHash,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != ScopeProofStatus::Draft {
            return Err(ApprovalError::invalid_state(format!(
                "approval can only be requested from draft, proof is {}",
                self.status
            )));
        }
        self.status = ScopeProofStatus::Pending;
        self.token_hash = Some(token_hash);
        self.token_expires_at = Some(expires_at);
        self.token_used = false;
        self.requested_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Transitions `pending → approved`.
    ///
    /// # Errors
    ///
    /// Rejects any prior state other than pending.
    pub fn mark_approved(&mut self, approved_by: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        if self.status != ScopeProofStatus::Pending {
            return Err(ApprovalError::invalid_state(format!(
                "only a pending proof can be approved, proof is {}",
                self.status
            )));
        }
        self.status = ScopeProofStatus::Approved;
        self.token_used = true;
        self.approved_at = Some(now);
        self.approved_by = Some(approved_by.into());
        self.updated_at = now;
        Ok(())
    }

    /// Transitions `pending → expired`, permanently invalidating the token.
    ///
    /// # Errors
    ///
    /// Rejects any prior state other than pending.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != ScopeProofStatus::Pending {
            return Err(ApprovalError::invalid_state(format!(
                "only a pending proof can expire, proof is {}",
                self.status
            )));
        }
        self.status = ScopeProofStatus::Expired;
        self.token_used = true;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the live token consumed without changing status.
    pub(crate) fn consume_token(&mut self, now: DateTime<Utc>) {
        self.token_used = true;
        self.updated_at = now;
    }

    /// Returns true if the plaintext token matches the stored hash.
    #[must_use]
    pub fn token_matches(&self, token: &str) -> bool {
        self.token_hash.as_ref().is_some_and(|h| h.verify(token))
    }

    /// Returns true if the token's window has closed.
    #[must_use]
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|e| now >= e)
    }

    /// Returns true if a reminder is due: still pending, past the reminder
    /// offset, and the token has not yet expired.
    #[must_use]
    pub fn reminder_due(&self, now: DateTime<Utc>, offset: Duration) -> bool {
        self.status == ScopeProofStatus::Pending
            && !self.token_expired(now)
            && self.requested_at.is_some_and(|r| now - r >= offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::ApprovalTokenSecret;

    fn draft() -> ScopeProof {
        ScopeProof::new_draft(AccountId::new(), "extra drywall repair", 320.0, "USD")
            .with_client(Some("Acme".to_string()), Some("billing@acme.test".to_string()))
    }

    fn pending(now: DateTime<Utc>) -> (ScopeProof, ApprovalTokenSecret) {
        let mut proof = draft();
        let secret = ApprovalTokenSecret::generate();
        proof
            .mark_pending(secret.hash(), now + Duration::hours(24), now)
            .unwrap();
        (proof, secret)
    }

    mod status_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(ScopeProofStatus::Draft, false)]
        #[test_case(ScopeProofStatus::Pending, false)]
        #[test_case(ScopeProofStatus::Approved, true)]
        #[test_case(ScopeProofStatus::Expired, true)]
        fn terminal_states(status: ScopeProofStatus, expected: bool) {
            assert_eq!(status.is_terminal(), expected);
        }

        #[test]
        fn status_display() {
            assert_eq!(format!("{}", ScopeProofStatus::Draft), "draft");
            assert_eq!(format!("{}", ScopeProofStatus::Pending), "pending");
        }
    }

    mod photo_tests {
        use super::*;

        #[test]
        fn photos_are_ordered() {
            let mut proof = draft();
            for i in 0..3 {
                let position = proof.attach_photo(format!("photos/{i}.jpg")).unwrap();
                assert_eq!(position, i);
            }
            assert_eq!(proof.photos.len(), 3);
            assert_eq!(proof.photos[2].position, 2);
        }

        #[test]
        fn sixth_photo_is_rejected() {
            let mut proof = draft();
            for i in 0..ScopeProof::MAX_PHOTOS {
                proof.attach_photo(format!("photos/{i}.jpg")).unwrap();
            }
            let result = proof.attach_photo("photos/overflow.jpg");
            assert!(matches!(
                result.err(),
                Some(ApprovalError::PhotoLimitExceeded { max: 5 })
            ));
        }

        #[test]
        fn photos_locked_after_request() {
            let now = Utc::now();
            let (mut proof, _) = pending(now);
            let result = proof.attach_photo("photos/late.jpg");
            assert!(matches!(
                result.err(),
                Some(ApprovalError::InvalidApprovalState { .. })
            ));
        }
    }

    mod transition_tests {
        use super::*;

        #[test]
        fn draft_to_pending_installs_token() {
            let now = Utc::now();
            let (proof, secret) = pending(now);

            assert_eq!(proof.status, ScopeProofStatus::Pending);
            assert!(proof.token_matches(secret.as_str()));
            assert!(!proof.token_used);
            assert_eq!(proof.requested_at, Some(now));
            assert_eq!(proof.token_expires_at, Some(now + Duration::hours(24)));
        }

        #[test]
        fn pending_cannot_be_requested_again() {
            let now = Utc::now();
            let (mut proof, _) = pending(now);
            let fresh = ApprovalTokenSecret::generate();
            let result = proof.mark_pending(fresh.hash(), now + Duration::hours(24), now);
            assert!(matches!(
                result.err(),
                Some(ApprovalError::InvalidApprovalState { .. })
            ));
        }

        #[test]
        fn pending_to_approved() {
            let now = Utc::now();
            let (mut proof, _) = pending(now);

            proof.mark_approved("billing@acme.test", now).unwrap();
            assert_eq!(proof.status, ScopeProofStatus::Approved);
            assert!(proof.token_used);
            assert_eq!(proof.approved_at, Some(now));
            assert_eq!(proof.approved_by, Some("billing@acme.test".to_string()));
        }

        #[test]
        fn pending_to_expired() {
            let now = Utc::now();
            let (mut proof, _) = pending(now);

            proof.mark_expired(now + Duration::hours(25)).unwrap();
            assert_eq!(proof.status, ScopeProofStatus::Expired);
            assert!(proof.token_used);
            assert!(proof.approved_at.is_none());
        }

        #[test]
        fn terminal_states_reject_every_transition() {
            let now = Utc::now();

            for terminal in [ScopeProofStatus::Approved, ScopeProofStatus::Expired] {
                let (mut proof, _) = pending(now);
                match terminal {
                    ScopeProofStatus::Approved => proof.mark_approved("client", now).unwrap(),
                    _ => proof.mark_expired(now).unwrap(),
                }

                let fresh = ApprovalTokenSecret::generate();
                assert!(proof
                    .mark_pending(fresh.hash(), now + Duration::hours(24), now)
                    .is_err());
                assert!(proof.mark_approved("client", now).is_err());
                assert!(proof.mark_expired(now).is_err());
                // Status did not move: expired never goes back to pending,
                // approved never goes anywhere.
                assert_eq!(proof.status, terminal);
            }
        }

        #[test]
        fn draft_cannot_approve_or_expire() {
            let now = Utc::now();
            let mut proof = draft();
            assert!(proof.mark_approved("client", now).is_err());
            assert!(proof.mark_expired(now).is_err());
            assert_eq!(proof.status, ScopeProofStatus::Draft);
        }
    }

    mod token_window_tests {
        use super::*;

        #[test]
        fn token_expiry_boundary() {
            let now = Utc::now();
            let (proof, _) = pending(now);

            assert!(!proof.token_expired(now + Duration::hours(23)));
            // The boundary itself counts as expired.
            assert!(proof.token_expired(now + Duration::hours(24)));
            assert!(proof.token_expired(now + Duration::hours(25)));
        }

        #[test]
        fn reminder_window() {
            let now = Utc::now();
            let (proof, _) = pending(now);
            let offset = Duration::hours(12);

            assert!(!proof.reminder_due(now + Duration::hours(11), offset));
            assert!(proof.reminder_due(now + Duration::hours(12), offset));
            assert!(proof.reminder_due(now + Duration::hours(13), offset));
            // Past expiry the reminder is moot.
            assert!(!proof.reminder_due(now + Duration::hours(25), offset));
        }

        #[test]
        fn draft_has_no_reminder() {
            let proof = draft();
            assert!(!proof.reminder_due(Utc::now(), Duration::hours(12)));
        }
    }

    #[test]
    fn proof_serialization_roundtrip() {
        let now = Utc::now();
        let (original, _) = pending(now);
        let json = serde_json::to_string(&original);
        assert!(json.is_ok());
        let parsed: serde_json::Result<ScopeProof> = serde_json::from_str(&json.unwrap());
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap(), original);
    }
}
