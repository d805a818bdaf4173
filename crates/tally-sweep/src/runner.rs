//! Periodic sweep task.
//!
//! The sweep itself is a plain synchronous object; this module supplies the
//! tokio plumbing that drives it on its two cadences. The process
//! supervisor owns restart policy — a restarted task is safe because every
//! pass re-checks durable state before acting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;

use crate::sweep::ReconciliationSweep;

/// Handle for controlling the sweep task.
#[derive(Debug)]
pub struct SweepHandle {
    running: Arc<AtomicBool>,
}

impl SweepHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if the sweep task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the sweep task. Both loops exit at their next tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Starts the periodic sweep task.
///
/// Spawns two loops: the reminder/expiry passes on the approval cadence
/// and the draft-invoice pass on the detection cadence. Returns a handle
/// to stop them.
pub fn start_sweep_task(sweep: Arc<ReconciliationSweep>) -> SweepHandle {
    let handle = SweepHandle::new();
    handle.running.store(true, Ordering::SeqCst);

    let approval_interval = Duration::from_secs(sweep.config().approval_pass_interval_secs);
    let detection_interval = Duration::from_secs(sweep.config().detection_pass_interval_secs);

    info!(
        approval_interval_secs = approval_interval.as_secs(),
        detection_interval_secs = detection_interval.as_secs(),
        "sweep task starting"
    );

    {
        let running = Arc::clone(&handle.running);
        let sweep = Arc::clone(&sweep);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(approval_interval);
            // The first tick fires immediately; skip it so a restart does
            // not stack an extra run on top of the supervisor's schedule.
            interval_timer.tick().await;

            while running.load(Ordering::SeqCst) {
                interval_timer.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                sweep.run_approval_passes();
            }
        });
    }

    {
        let running = Arc::clone(&handle.running);
        let sweep = Arc::clone(&sweep);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(detection_interval);
            interval_timer.tick().await;

            while running.load(Ordering::SeqCst) {
                interval_timer.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                sweep.run_detection_pass();
            }
        });
    }

    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepConfig;
    use tally_alerts::DetectionEngine;
    use tally_approvals::ApprovalService;
    use tally_notify::NullDispatcher;
    use tally_records::{InMemoryRecordStore, OpenEntitlements};

    fn sweep_with_intervals(approval_secs: u64, detection_secs: u64) -> Arc<ReconciliationSweep> {
        let records = Arc::new(InMemoryRecordStore::new());
        let approvals = Arc::new(ApprovalService::new(Arc::new(NullDispatcher::new())));
        let engine = Arc::new(DetectionEngine::new(
            Arc::new(OpenEntitlements::new()),
            records.clone(),
        ));
        Arc::new(ReconciliationSweep::with_config(
            approvals,
            engine,
            records,
            SweepConfig {
                approval_pass_interval_secs: approval_secs,
                detection_pass_interval_secs: detection_secs,
                draft_invoice_age_secs: 86_400,
            },
        ))
    }

    #[tokio::test]
    async fn start_and_stop() {
        let sweep = sweep_with_intervals(3_600, 3_600);
        let handle = start_sweep_task(sweep);

        assert!(handle.is_running());
        handle.stop();
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn passes_run_on_their_cadence() {
        let sweep = sweep_with_intervals(1, 10);
        let handle = start_sweep_task(Arc::clone(&sweep));

        // Let the approval loop tick a few times while the detection loop
        // fires at most once.
        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        let status = sweep.status();
        assert!(status.approval_runs >= 2);
        assert!(status.detection_runs <= 1);

        handle.stop();
    }
}
