//! The reconciliation sweep.
//!
//! The sweep advances every time-driven transition the synchronous event
//! path cannot see (reminders, token expiry) and re-runs detection for
//! draft invoices the event path may have missed. Every external effect is
//! gated on durable state first — the approval notification ledger or the
//! alert store's dedup index — so overlapping runs and crash-restarts are
//! safe by construction.
//!
//! A pass never aborts on a single record: failures are logged, counted in
//! the [`PassReport`], and the rest of the batch completes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use tally_alerts::{BusinessEvent, DetectionEngine, DetectionOutcome};
use tally_approvals::ApprovalService;
use tally_records::SourceRecordStore;

use crate::report::{PassReport, SweepReport, SweepStatus};

/// Configuration for the reconciliation sweep.
///
/// The reminder and expiry timers need tighter granularity than
/// draft-invoice detection, so the two cadences are independent.
/// Correctness requires each interval to stay shorter than the window it
/// tracks (the approval interval well under the 12-hour reminder offset,
/// the detection interval under the draft-invoice age).
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often the reminder and expiry passes run (in seconds).
    pub approval_pass_interval_secs: u64,
    /// How often the draft-invoice pass runs (in seconds).
    pub detection_pass_interval_secs: u64,
    /// How old a draft invoice must be before it is flagged (in seconds).
    pub draft_invoice_age_secs: i64,
}

impl SweepConfig {
    /// Returns the draft-invoice age threshold as a [`chrono::Duration`].
    #[must_use]
    pub fn draft_invoice_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.draft_invoice_age_secs)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            approval_pass_interval_secs: 300,     // 5 minutes
            detection_pass_interval_secs: 3_600,  // 1 hour
            draft_invoice_age_secs: 86_400,       // 24 hours
        }
    }
}

/// Periodic reconciliation over approvals and detection.
pub struct ReconciliationSweep {
    config: SweepConfig,
    approvals: Arc<ApprovalService>,
    engine: Arc<DetectionEngine>,
    records: Arc<dyn SourceRecordStore>,
    status: RwLock<SweepStatus>,
}

impl ReconciliationSweep {
    /// Creates a new sweep with the default configuration.
    #[must_use]
    pub fn new(
        approvals: Arc<ApprovalService>,
        engine: Arc<DetectionEngine>,
        records: Arc<dyn SourceRecordStore>,
    ) -> Self {
        Self::with_config(approvals, engine, records, SweepConfig::default())
    }

    /// Creates a new sweep with custom configuration.
    #[must_use]
    pub fn with_config(
        approvals: Arc<ApprovalService>,
        engine: Arc<DetectionEngine>,
        records: Arc<dyn SourceRecordStore>,
        config: SweepConfig,
    ) -> Self {
        Self {
            config,
            approvals,
            engine,
            records,
            status: RwLock::new(SweepStatus::default()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Returns the last-run bookkeeping.
    #[must_use]
    pub fn status(&self) -> SweepStatus {
        *self.status.read()
    }

    // ============ Scheduler entry points ============

    /// Runs all three passes once. Zero-argument entry point for an
    /// external scheduler.
    pub fn run_once(&self) -> SweepReport {
        self.run_once_at(Utc::now())
    }

    /// Runs the reminder and expiry passes once.
    pub fn run_approval_passes(&self) -> (PassReport, PassReport) {
        self.run_approval_passes_at(Utc::now())
    }

    /// Runs the draft-invoice pass once.
    pub fn run_detection_pass(&self) -> PassReport {
        self.run_detection_pass_at(Utc::now())
    }

    /// [`Self::run_once`] with an explicit clock.
    pub fn run_once_at(&self, now: DateTime<Utc>) -> SweepReport {
        let (reminders, expiries) = self.run_approval_passes_at(now);
        let draft_invoices = self.run_detection_pass_at(now);

        let report = SweepReport {
            reminders,
            expiries,
            draft_invoices,
            ran_at: now,
        };
        info!(
            actions = report.total_actions(),
            failures = report.total_failures(),
            "sweep run complete"
        );
        report
    }

    /// [`Self::run_approval_passes`] with an explicit clock.
    pub fn run_approval_passes_at(&self, now: DateTime<Utc>) -> (PassReport, PassReport) {
        let reminders = self.reminder_pass(now);
        let expiries = self.expiry_pass(now);

        let mut status = self.status.write();
        status.last_approval_run = Some(now);
        status.approval_runs += 1;

        (reminders, expiries)
    }

    /// [`Self::run_detection_pass`] with an explicit clock.
    pub fn run_detection_pass_at(&self, now: DateTime<Utc>) -> PassReport {
        let report = self.draft_invoice_pass(now);

        let mut status = self.status.write();
        status.last_detection_run = Some(now);
        status.detection_runs += 1;

        report
    }

    // ============ Passes ============

    /// Reminder pass: pending proofs inside the reminder window get their
    /// one nudge, gated on the notification ledger.
    fn reminder_pass(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = PassReport::default();

        for proof in self.approvals.pending_in_reminder_window(now) {
            report.examined += 1;
            match self.approvals.remind_at(&proof.id, now) {
                Ok(true) => report.actions += 1,
                Ok(false) => report.skipped_duplicates += 1,
                Err(e) => {
                    warn!(
                        scope_proof_id = %proof.id,
                        error = %e,
                        "reminder failed, continuing"
                    );
                    report.failures += 1;
                }
            }
        }

        debug!(
            examined = report.examined,
            sent = report.actions,
            "reminder pass complete"
        );
        report
    }

    /// Expiry pass: pending proofs past their token window transition to
    /// expired (idempotent compare-and-set) and get their one expiry
    /// notice.
    fn expiry_pass(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = PassReport::default();

        for proof in self.approvals.pending_expired(now) {
            report.examined += 1;

            if let Err(e) = self.approvals.expire_at(&proof.id, now) {
                warn!(
                    scope_proof_id = %proof.id,
                    error = %e,
                    "expiry transition failed, continuing"
                );
                report.failures += 1;
                continue;
            }

            match self.approvals.notify_expired(&proof.id) {
                Ok(true) => report.actions += 1,
                Ok(false) => report.skipped_duplicates += 1,
                Err(e) => {
                    warn!(
                        scope_proof_id = %proof.id,
                        error = %e,
                        "expiry notice failed, continuing"
                    );
                    report.failures += 1;
                }
            }
        }

        debug!(
            examined = report.examined,
            expired = report.actions,
            "expiry pass complete"
        );
        report
    }

    /// Draft-invoice pass: re-fires detection for stale drafts as if the
    /// business event had arrived. The engine's own dedup and entitlement
    /// gate make this idempotent and safe for any account.
    fn draft_invoice_pass(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = PassReport::default();
        let cutoff = now - self.config.draft_invoice_age();

        let drafts = match self.records.draft_invoices_older_than(cutoff) {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!(error = %e, "draft invoice listing failed, skipping pass");
                report.failures += 1;
                return report;
            }
        };

        for invoice in drafts {
            report.examined += 1;
            let outcome = self.engine.on_business_event(
                &invoice.account_id,
                BusinessEvent::InvoiceStateChanged,
                &invoice.id,
            );
            match outcome {
                DetectionOutcome::AlertOpened(_) | DetectionOutcome::AlertClosed(_) => {
                    report.actions += 1;
                }
                DetectionOutcome::Duplicate(_)
                | DetectionOutcome::NothingOpen
                | DetectionOutcome::NotApplicable
                | DetectionOutcome::Ineligible => report.skipped_duplicates += 1,
                DetectionOutcome::SourceUnavailable => report.failures += 1,
            }
        }

        debug!(
            examined = report.examined,
            flagged = report.actions,
            "draft invoice pass complete"
        );
        report
    }
}

impl std::fmt::Debug for ReconciliationSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationSweep")
            .field("config", &self.config)
            .field("status", &*self.status.read())
            .finish_non_exhaustive()
    }
}
