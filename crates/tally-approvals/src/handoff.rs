//! Hand-off of approved scope work to the invoicing workflow.

use std::fmt;

use parking_lot::RwLock;
use tracing::info;

use crate::error::Result;
use crate::proof::ScopeProof;

/// Receives a freshly approved proof so the invoicing workflow can attach
/// the approved cost as a line item.
pub trait ApprovalHandoff: Send + Sync + fmt::Debug {
    /// Called exactly once per approved proof.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::ApprovalError`] if the invoicing side rejects
    /// the proof; the failure is surfaced to the approving caller.
    fn approved(&self, proof: &ScopeProof) -> Result<()>;
}

/// Hand-off that only logs the approval.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandoff;

impl NullHandoff {
    /// Creates a new no-op hand-off.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ApprovalHandoff for NullHandoff {
    fn approved(&self, proof: &ScopeProof) -> Result<()> {
        info!(
            scope_proof_id = %proof.id,
            estimated_cost = proof.estimated_cost,
            "approved proof handed off"
        );
        Ok(())
    }
}

/// Hand-off that records every approved proof, for tests.
#[derive(Debug, Default)]
pub struct RecordingHandoff {
    approved: RwLock<Vec<ScopeProof>>,
}

impl RecordingHandoff {
    /// Creates a new recording hand-off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every proof handed off so far.
    #[must_use]
    pub fn approved_proofs(&self) -> Vec<ScopeProof> {
        self.approved.read().clone()
    }
}

impl ApprovalHandoff for RecordingHandoff {
    fn approved(&self, proof: &ScopeProof) -> Result<()> {
        self.approved.write().push(proof.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_records::AccountId;

    #[test]
    fn null_handoff_accepts() {
        let handoff = NullHandoff::new();
        let proof = ScopeProof::new_draft(AccountId::new(), "extra work", 100.0, "USD");
        assert!(handoff.approved(&proof).is_ok());
    }

    #[test]
    fn recording_handoff_captures_proofs() {
        let handoff = RecordingHandoff::new();
        let proof = ScopeProof::new_draft(AccountId::new(), "extra work", 100.0, "USD");

        handoff.approved(&proof).unwrap();
        let recorded = handoff.approved_proofs();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].id, proof.id);
    }
}
