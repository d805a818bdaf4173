//! Reports produced by sweep runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of one pass over one batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Records the pass looked at.
    pub examined: usize,
    /// Actions actually taken (reminder sent, proof expired and notified,
    /// detection outcome changed).
    pub actions: usize,
    /// Records skipped because durable state showed the action already
    /// happened.
    pub skipped_duplicates: usize,
    /// Records that failed; the pass logged and continued.
    pub failures: usize,
}

impl PassReport {
    /// Folds another report into this one.
    pub fn absorb(&mut self, other: Self) {
        self.examined += other.examined;
        self.actions += other.actions;
        self.skipped_duplicates += other.skipped_duplicates;
        self.failures += other.failures;
    }
}

/// The result of a full sweep run across all three passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// The reminder pass.
    pub reminders: PassReport,
    /// The expiry pass.
    pub expiries: PassReport,
    /// The draft-invoice detection pass.
    pub draft_invoices: PassReport,
    /// When the run happened.
    pub ran_at: DateTime<Utc>,
}

impl SweepReport {
    /// Total actions taken across all passes.
    #[must_use]
    pub const fn total_actions(&self) -> usize {
        self.reminders.actions + self.expiries.actions + self.draft_invoices.actions
    }

    /// Total failures across all passes.
    #[must_use]
    pub const fn total_failures(&self) -> usize {
        self.reminders.failures + self.expiries.failures + self.draft_invoices.failures
    }
}

/// Last-run bookkeeping for the sweep's two cadences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStatus {
    /// When the approval passes (reminder + expiry) last ran.
    pub last_approval_run: Option<DateTime<Utc>>,
    /// When the draft-invoice pass last ran.
    pub last_detection_run: Option<DateTime<Utc>>,
    /// Total approval-cadence runs.
    pub approval_runs: u64,
    /// Total detection-cadence runs.
    pub detection_runs: u64,
}
