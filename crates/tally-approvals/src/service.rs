//! The approval workflow service.
//!
//! [`ApprovalService`] owns every [`ScopeProof`] and drives its state
//! machine. The two user-synchronous actions — [`ApprovalService::request_approval`]
//! and [`ApprovalService::resolve_approval`] — re-raise collaborator
//! failures to the caller; everything else is typed no-ops and rejections.
//!
//! State transitions are applied before notifications go out, so a
//! delivery failure never rolls back the machine; the reconciliation sweep
//! covers the gap with its ledger-gated reminder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use tally_notify::{Channel, NotificationDispatcher, NotificationRequest, Template};
use tally_records::AccountId;

use crate::error::{ApprovalError, Result};
use crate::handoff::{ApprovalHandoff, NullHandoff};
use crate::notifications::{NotificationLedger, ProofNotification};
use crate::proof::{ScopeProof, ScopeProofId, ScopeProofStatus};
use crate::token::ApprovalTokenSecret;

/// Configuration for the approval workflow.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    /// How long a minted token stays valid (in seconds).
    pub token_ttl_secs: i64,
    /// How long after the request the reminder becomes due (in seconds).
    pub reminder_offset_secs: i64,
}

impl ApprovalConfig {
    /// Returns the token ttl as a [`Duration`].
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_secs)
    }

    /// Returns the reminder offset as a [`Duration`].
    #[must_use]
    pub fn reminder_offset(&self) -> Duration {
        Duration::seconds(self.reminder_offset_secs)
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 86_400,       // 24 hours
            reminder_offset_secs: 43_200, // 12 hours
        }
    }
}

/// What [`ApprovalService::request_approval`] hands back.
///
/// Carries the only copy of the plaintext token that will ever exist; it
/// cannot be recovered later.
#[derive(Debug)]
pub struct ApprovalGrant {
    /// The proof the token belongs to.
    pub scope_proof_id: ScopeProofId,
    /// The single-use approval token.
    pub token: ApprovalTokenSecret,
    /// When the token stops being honored.
    pub expires_at: DateTime<Utc>,
}

/// The client's answer to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Sign off on the work.
    Approve,
    /// Turn it down; the proof closes without sign-off.
    Decline,
}

impl Decision {
    /// Returns the decision as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Decline => "decline",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owns scope proofs and drives their lifecycle.
pub struct ApprovalService {
    config: ApprovalConfig,
    proofs: RwLock<HashMap<ScopeProofId, ScopeProof>>,
    ledger: NotificationLedger,
    dispatcher: Arc<dyn NotificationDispatcher>,
    handoff: Arc<dyn ApprovalHandoff>,
}

impl ApprovalService {
    /// Creates a service with the default configuration and a no-op
    /// invoicing hand-off.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self::with_config(dispatcher, ApprovalConfig::default())
    }

    /// Creates a service with custom configuration.
    #[must_use]
    pub fn with_config(dispatcher: Arc<dyn NotificationDispatcher>, config: ApprovalConfig) -> Self {
        Self {
            config,
            proofs: RwLock::new(HashMap::new()),
            ledger: NotificationLedger::new(),
            dispatcher,
            handoff: Arc::new(NullHandoff::new()),
        }
    }

    /// Sets the invoicing hand-off.
    #[must_use]
    pub fn with_handoff(mut self, handoff: Arc<dyn ApprovalHandoff>) -> Self {
        self.handoff = handoff;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    /// Returns the notification ledger.
    #[must_use]
    pub const fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    // ============ Draft Management ============

    /// Stores a draft proof.
    ///
    /// # Errors
    ///
    /// Rejects proofs that are not in draft or already exceed the photo
    /// limit.
    pub fn create_draft(&self, proof: ScopeProof) -> Result<ScopeProofId> {
        if proof.status != ScopeProofStatus::Draft {
            return Err(ApprovalError::invalid_state(format!(
                "new proofs must be drafts, got {}",
                proof.status
            )));
        }
        if proof.photos.len() > ScopeProof::MAX_PHOTOS {
            return Err(ApprovalError::PhotoLimitExceeded {
                max: ScopeProof::MAX_PHOTOS,
            });
        }

        let id = proof.id;
        info!(scope_proof_id = %id, account_id = %proof.account_id, "scope proof drafted");
        self.proofs.write().insert(id, proof);
        Ok(id)
    }

    /// Appends a photo to a draft proof.
    ///
    /// # Errors
    ///
    /// Fails if the proof is unknown, not in draft, or full.
    pub fn attach_photo(&self, id: &ScopeProofId, url: impl Into<String>) -> Result<usize> {
        let mut proofs = self.proofs.write();
        let proof = proofs.get_mut(id).ok_or(ApprovalError::ProofNotFound {
            id: id.to_string(),
        })?;
        proof.attach_photo(url)
    }

    /// Gets a proof by id.
    #[must_use]
    pub fn get(&self, id: &ScopeProofId) -> Option<ScopeProof> {
        self.proofs.read().get(id).cloned()
    }

    /// Returns the proofs for an account, oldest first.
    #[must_use]
    pub fn list_for_account(&self, account_id: &AccountId) -> Vec<ScopeProof> {
        let proofs = self.proofs.read();
        let mut list: Vec<ScopeProof> = proofs
            .values()
            .filter(|p| p.account_id == *account_id)
            .cloned()
            .collect();
        list.sort_by_key(|p| p.created_at);
        list
    }

    /// Returns the number of proofs held.
    #[must_use]
    pub fn proof_count(&self) -> usize {
        self.proofs.read().len()
    }

    // ============ Transitions ============

    /// Requests client approval for a draft proof.
    ///
    /// Mints a fresh single-use token (only its hash is stored), moves the
    /// proof to pending, and notifies the contractor and the client.
    ///
    /// # Errors
    ///
    /// `InvalidApprovalState` if the proof is not in draft; notification
    /// failures are logged and re-raised — this is a user-synchronous
    /// action.
    pub fn request_approval(&self, id: &ScopeProofId) -> Result<ApprovalGrant> {
        self.request_approval_at(id, Utc::now())
    }

    /// [`Self::request_approval`] with an explicit clock, for tests and
    /// the sweep.
    pub fn request_approval_at(
        &self,
        id: &ScopeProofId,
        now: DateTime<Utc>,
    ) -> Result<ApprovalGrant> {
        let secret = ApprovalTokenSecret::generate();
        let expires_at = now + self.config.token_ttl();

        let proof = {
            let mut proofs = self.proofs.write();
            let proof = proofs.get_mut(id).ok_or(ApprovalError::ProofNotFound {
                id: id.to_string(),
            })?;
            proof.mark_pending(secret.hash(), expires_at, now)?;
            proof.clone()
        };

        info!(
            scope_proof_id = %id,
            account_id = %proof.account_id,
            %expires_at,
            "approval requested"
        );

        self.ledger
            .record_once(*id, ProofNotification::Requested, Channel::Email);
        self.dispatch_request_pair(&proof, secret.as_str(), expires_at)?;

        Ok(ApprovalGrant {
            scope_proof_id: *id,
            token: secret,
            expires_at,
        })
    }

    /// Resolves an approval request with the client's token.
    ///
    /// A valid, unexpired, unused token is consumed regardless of the
    /// decision. Approving sets `approved_at`/`approved_by`, notifies the
    /// contractor, and hands the proof to the invoicing workflow; declining
    /// closes the proof without sign-off.
    ///
    /// # Errors
    ///
    /// `InvalidApprovalState` for an unknown, expired, or used token, or a
    /// proof past pending — with no side effect in those cases.
    /// Notification and hand-off failures are logged and re-raised.
    pub fn resolve_approval(&self, token: &str, decision: Decision) -> Result<ScopeProofStatus> {
        self.resolve_approval_at(token, decision, Utc::now())
    }

    /// [`Self::resolve_approval`] with an explicit clock.
    pub fn resolve_approval_at(
        &self,
        token: &str,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<ScopeProofStatus> {
        let proof = {
            let mut proofs = self.proofs.write();
            let proof = proofs
                .values_mut()
                .find(|p| p.token_matches(token))
                .ok_or_else(|| ApprovalError::invalid_state("unknown approval token"))?;

            if proof.token_used {
                debug!(scope_proof_id = %proof.id, "token already used");
                return Err(ApprovalError::invalid_state("token already used"));
            }
            if proof.status != ScopeProofStatus::Pending {
                return Err(ApprovalError::invalid_state(format!(
                    "proof is {}, not pending",
                    proof.status
                )));
            }
            if proof.token_expired(now) {
                // The expiry pass owns the pending → expired transition;
                // a late click is a plain rejection with no side effect.
                debug!(scope_proof_id = %proof.id, "token presented after expiry");
                return Err(ApprovalError::invalid_state("token expired"));
            }

            // The token is burned from here on, whatever the decision.
            proof.consume_token(now);
            match decision {
                Decision::Approve => {
                    let approved_by = proof
                        .client_email
                        .clone()
                        .unwrap_or_else(|| "client".to_string());
                    proof.mark_approved(approved_by, now)?;
                }
                Decision::Decline => proof.mark_expired(now)?,
            }
            proof.clone()
        };

        info!(
            scope_proof_id = %proof.id,
            %decision,
            status = %proof.status,
            "approval resolved"
        );

        match proof.status {
            ScopeProofStatus::Approved => {
                if self
                    .ledger
                    .record_once(proof.id, ProofNotification::Confirmed, Channel::Push)
                {
                    self.dispatch_to_contractor(&proof, Template::ApprovalConfirmed)?;
                }
                self.handoff.approved(&proof).map_err(|e| {
                    warn!(scope_proof_id = %proof.id, error = %e, "invoicing hand-off failed");
                    e
                })?;
            }
            ScopeProofStatus::Expired => {
                if self
                    .ledger
                    .record_once(proof.id, ProofNotification::Expired, Channel::Push)
                {
                    self.dispatch_to_contractor(&proof, Template::ApprovalExpired)?;
                }
            }
            ScopeProofStatus::Draft | ScopeProofStatus::Pending => {}
        }

        Ok(proof.status)
    }

    /// Expires a pending proof whose token window has closed.
    ///
    /// Idempotent compare-and-set: only a pending proof past
    /// `token_expires_at` transitions; every other shape returns
    /// `Ok(false)`. Notification is the sweep's job, gated on its ledger.
    ///
    /// # Errors
    ///
    /// `ProofNotFound` if the id is unknown.
    pub fn expire_at(&self, id: &ScopeProofId, now: DateTime<Utc>) -> Result<bool> {
        let mut proofs = self.proofs.write();
        let proof = proofs.get_mut(id).ok_or(ApprovalError::ProofNotFound {
            id: id.to_string(),
        })?;

        if proof.status != ScopeProofStatus::Pending || !proof.token_expired(now) {
            return Ok(false);
        }

        proof.mark_expired(now)?;
        info!(scope_proof_id = %id, "scope proof expired");
        Ok(true)
    }

    /// Sends the mid-window reminder for a pending proof, at most once.
    ///
    /// The ledger insert happens before the dispatch: a crash in between
    /// loses at most one reminder but can never duplicate one, and two
    /// overlapping sweep runs cannot both get past `record_once`.
    ///
    /// Returns `Ok(false)` when the proof is outside the reminder window
    /// or the reminder was already recorded.
    ///
    /// # Errors
    ///
    /// `ProofNotFound` for an unknown id; dispatch failures are re-raised
    /// for the caller to log and continue.
    pub fn remind_at(&self, id: &ScopeProofId, now: DateTime<Utc>) -> Result<bool> {
        let proof = self.get(id).ok_or(ApprovalError::ProofNotFound {
            id: id.to_string(),
        })?;

        if !proof.reminder_due(now, self.config.reminder_offset()) {
            return Ok(false);
        }
        if !self
            .ledger
            .record_once(*id, ProofNotification::Reminder, Channel::Email)
        {
            return Ok(false);
        }

        info!(scope_proof_id = %id, "approval reminder due");
        self.dispatch_to_client(&proof, Template::ApprovalReminder)
    }

    /// Sends the expiry notice for an expired proof, at most once.
    ///
    /// Returns `Ok(false)` when the proof is not expired or the notice was
    /// already recorded.
    ///
    /// # Errors
    ///
    /// `ProofNotFound` for an unknown id; dispatch failures are re-raised.
    pub fn notify_expired(&self, id: &ScopeProofId) -> Result<bool> {
        let proof = self.get(id).ok_or(ApprovalError::ProofNotFound {
            id: id.to_string(),
        })?;

        if proof.status != ScopeProofStatus::Expired {
            return Ok(false);
        }
        if !self
            .ledger
            .record_once(*id, ProofNotification::Expired, Channel::Push)
        {
            return Ok(false);
        }

        self.dispatch_to_contractor(&proof, Template::ApprovalExpired)?;
        Ok(true)
    }

    // ============ Sweep Queries ============

    /// Returns pending proofs inside the reminder window at `now`.
    #[must_use]
    pub fn pending_in_reminder_window(&self, now: DateTime<Utc>) -> Vec<ScopeProof> {
        let offset = self.config.reminder_offset();
        self.proofs
            .read()
            .values()
            .filter(|p| p.reminder_due(now, offset))
            .cloned()
            .collect()
    }

    /// Returns pending proofs whose token window has closed at `now`.
    #[must_use]
    pub fn pending_expired(&self, now: DateTime<Utc>) -> Vec<ScopeProof> {
        self.proofs
            .read()
            .values()
            .filter(|p| p.status == ScopeProofStatus::Pending && p.token_expired(now))
            .cloned()
            .collect()
    }

    // ============ Dispatch helpers ============

    /// Sends a template to the contractor over push, keyed by account id.
    pub(crate) fn dispatch_to_contractor(&self, proof: &ScopeProof, template: Template) -> Result<()> {
        let request = NotificationRequest::new(
            Channel::Push,
            template,
            proof.account_id.to_string(),
        )
        .with_var("scope_proof_id", proof.id.to_string())
        .with_var("description", proof.description.clone())
        .with_var("estimated_cost", proof.estimated_cost.to_string());

        self.dispatcher.send(&request).map_err(|e| {
            warn!(
                scope_proof_id = %proof.id,
                template = %template,
                error = %e,
                "contractor notification failed"
            );
            ApprovalError::from(e)
        })?;
        Ok(())
    }

    /// Sends a template to the client's email, if the proof has one.
    pub(crate) fn dispatch_to_client(&self, proof: &ScopeProof, template: Template) -> Result<bool> {
        let Some(email) = proof.client_email.clone() else {
            debug!(
                scope_proof_id = %proof.id,
                template = %template,
                "no client email on proof, client notification skipped"
            );
            return Ok(false);
        };

        let request = NotificationRequest::new(Channel::Email, template, email)
            .with_var("scope_proof_id", proof.id.to_string())
            .with_var("description", proof.description.clone())
            .with_var("estimated_cost", proof.estimated_cost.to_string());

        self.dispatcher.send(&request).map_err(|e| {
            warn!(
                scope_proof_id = %proof.id,
                template = %template,
                error = %e,
                "client notification failed"
            );
            ApprovalError::from(e)
        })?;
        Ok(true)
    }

    fn dispatch_request_pair(
        &self,
        proof: &ScopeProof,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.dispatch_to_contractor(proof, Template::ApprovalRequestedContractor)?;

        let Some(email) = proof.client_email.clone() else {
            debug!(
                scope_proof_id = %proof.id,
                "no client email, approval link only returned to the contractor"
            );
            return Ok(());
        };

        // The only place the plaintext token leaves the service.
        let request = NotificationRequest::new(
            Channel::Email,
            Template::ApprovalRequestedClient,
            email,
        )
        .with_var("scope_proof_id", proof.id.to_string())
        .with_var("description", proof.description.clone())
        .with_var("estimated_cost", proof.estimated_cost.to_string())
        .with_var("approval_token", token.to_string())
        .with_var("expires_at", expires_at.to_rfc3339());

        self.dispatcher.send(&request).map_err(|e| {
            warn!(
                scope_proof_id = %proof.id,
                error = %e,
                "client approval request failed"
            );
            ApprovalError::from(e)
        })?;
        Ok(())
    }
}

impl fmt::Debug for ApprovalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalService")
            .field("proofs", &self.proofs.read().len())
            .field("ledger", &self.ledger.len())
            .finish_non_exhaustive()
    }
}
