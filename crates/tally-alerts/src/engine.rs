//! The fire-and-forget detection engine.
//!
//! [`DetectionEngine::on_business_event`] is called synchronously from the
//! request paths that mutate source records. It must never block or fail
//! the triggering action: every collaborator failure is logged and
//! swallowed, and every outcome — including the no-ops — is reported as a
//! typed [`DetectionOutcome`] rather than an error.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use tally_records::{AccountId, EntitlementGate, SourceId, SourceRecordStore};

use crate::error::{AlertError, Result};
use crate::events::AlertEvent;
use crate::rules::{
    BusinessEvent, RuleDecision, RuleFinding, evaluate_invoice, evaluate_receipt,
    evaluate_scoped_work, evaluate_voice_log,
};
use crate::store::{AlertStore, OpenOutcome};
use crate::types::{Alert, AlertId, AlertSummary, SourceRef};

/// What a single business event did to the alert store.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// A new alert was opened.
    AlertOpened(Alert),
    /// An open alert with the same key already existed.
    Duplicate(AlertId),
    /// The precondition was falsified and an open alert closed.
    AlertClosed(Alert),
    /// The precondition was falsified but nothing was open.
    NothingOpen,
    /// The record is missing or the rule does not apply.
    NotApplicable,
    /// The account's plan does not include alerts.
    Ineligible,
    /// The source record could not be read; logged and swallowed.
    SourceUnavailable,
}

/// Event-driven detector of unbilled work.
///
/// Holds the alert store and the two external seams it consults on every
/// event: the entitlement gate (re-checked each call, plan state can change
/// between events) and the read-only source record store.
pub struct DetectionEngine {
    gate: Arc<dyn EntitlementGate>,
    records: Arc<dyn SourceRecordStore>,
    store: AlertStore,
}

impl DetectionEngine {
    /// Creates a new engine with an empty alert store.
    #[must_use]
    pub fn new(gate: Arc<dyn EntitlementGate>, records: Arc<dyn SourceRecordStore>) -> Self {
        Self {
            gate,
            records,
            store: AlertStore::new(),
        }
    }

    /// Returns the underlying alert store.
    #[must_use]
    pub const fn store(&self) -> &AlertStore {
        &self.store
    }

    /// Processes a business event.
    ///
    /// Fire-and-forget: this never returns an error and never panics. The
    /// caller may ignore the outcome entirely; tests and the sweep inspect
    /// it.
    pub fn on_business_event(
        &self,
        account_id: &AccountId,
        event: BusinessEvent,
        source_id: &SourceId,
    ) -> DetectionOutcome {
        if !self.gate.is_eligible(account_id) {
            debug!(%account_id, %event, "account not eligible for alerts");
            return DetectionOutcome::Ineligible;
        }

        let decision = match self.evaluate(event, source_id) {
            Ok(decision) => decision,
            Err(err) => {
                // Detection must never fail the triggering action.
                warn!(
                    %account_id,
                    %event,
                    %source_id,
                    error = %err,
                    "source record read failed, skipping detection"
                );
                return DetectionOutcome::SourceUnavailable;
            }
        };

        match decision {
            RuleDecision::Raise(finding) => self.raise(account_id, event, source_id, finding),
            RuleDecision::Clear => self.clear(account_id, event, source_id),
            RuleDecision::NotApplicable => {
                debug!(%account_id, %event, %source_id, "rule not applicable");
                DetectionOutcome::NotApplicable
            }
        }
    }

    /// Returns the open alerts for an account, oldest first.
    #[must_use]
    pub fn list_open_alerts(&self, account_id: &AccountId) -> Vec<Alert> {
        self.store.list_open(account_id)
    }

    /// Returns the per-account rollup of open alerts.
    #[must_use]
    pub fn alert_summary(&self, account_id: &AccountId) -> AlertSummary {
        self.store.summary(account_id)
    }

    /// Returns the audit entries for an alert, in recording order.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::AlertNotFound` for an unknown id.
    pub fn alert_events(&self, alert_id: &AlertId) -> Result<Vec<AlertEvent>> {
        if self.store.get(alert_id).is_none() {
            return Err(AlertError::AlertNotFound {
                id: alert_id.to_string(),
            });
        }
        Ok(self.store.events_for(alert_id))
    }

    fn evaluate(
        &self,
        event: BusinessEvent,
        source_id: &SourceId,
    ) -> tally_records::Result<RuleDecision> {
        // One rule per event variant, checked exhaustively.
        Ok(match event {
            BusinessEvent::ReceiptRecorded => {
                evaluate_receipt(self.records.receipt(source_id)?.as_ref())
            }
            BusinessEvent::ScopeWorkApproved => {
                evaluate_scoped_work(self.records.scoped_work(source_id)?.as_ref())
            }
            BusinessEvent::VoiceLogCaptured => {
                evaluate_voice_log(self.records.voice_log(source_id)?.as_ref())
            }
            BusinessEvent::InvoiceStateChanged => {
                evaluate_invoice(self.records.invoice(source_id)?.as_ref())
            }
        })
    }

    fn raise(
        &self,
        account_id: &AccountId,
        event: BusinessEvent,
        source_id: &SourceId,
        finding: RuleFinding,
    ) -> DetectionOutcome {
        let alert = Alert::new_open(
            *account_id,
            event.alert_kind(),
            SourceRef::new(event.source_kind(), *source_id),
            finding.confidence,
            finding.currency,
        )
        .with_client(finding.client_name, finding.client_email);

        let alert = match finding.estimated_amount {
            Some(amount) => alert.with_amount(amount),
            None => alert,
        };

        match self.store.open(alert) {
            OpenOutcome::Created(alert) => DetectionOutcome::AlertOpened(alert),
            OpenOutcome::DuplicateOpen(id) => DetectionOutcome::Duplicate(id),
        }
    }

    fn clear(
        &self,
        account_id: &AccountId,
        event: BusinessEvent,
        source_id: &SourceId,
    ) -> DetectionOutcome {
        let mut detail = HashMap::new();
        detail.insert("reason".to_string(), "precondition_cleared".to_string());
        detail.insert("event".to_string(), event.as_str().to_string());

        match self
            .store
            .close(account_id, event.alert_kind(), source_id, detail)
        {
            Some(alert) => DetectionOutcome::AlertClosed(alert),
            None => DetectionOutcome::NothingOpen,
        }
    }
}

impl std::fmt::Debug for DetectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionEngine")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertKind, AlertStatus};
    use chrono::Utc;
    use tally_records::{
        InMemoryRecordStore, Invoice, InvoiceId, InvoiceStatus, OpenEntitlements, Receipt,
        RecordStoreError, StaticEntitlements, VoiceLog,
    };

    fn receipt(account: AccountId, id: SourceId, linked: bool) -> Receipt {
        Receipt {
            id,
            account_id: account,
            vendor: "Hardware Depot".to_string(),
            amount: 450.0,
            currency: "USD".to_string(),
            client_name: Some("Acme Renovations".to_string()),
            client_email: Some("billing@acme.test".to_string()),
            invoice_id: linked.then(InvoiceId::new),
            captured_at: Utc::now(),
        }
    }

    fn engine_with_store() -> (DetectionEngine, Arc<InMemoryRecordStore>) {
        let records = Arc::new(InMemoryRecordStore::new());
        let engine = DetectionEngine::new(Arc::new(OpenEntitlements::new()), records.clone());
        (engine, records)
    }

    mod detection_tests {
        use super::*;

        #[test]
        fn unbilled_receipt_opens_alert() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_receipt(receipt(account, source, false));

            let outcome =
                engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);

            let DetectionOutcome::AlertOpened(alert) = outcome else {
                panic!("expected AlertOpened, got {outcome:?}");
            };
            assert_eq!(alert.kind, AlertKind::UnbilledReceipt);
            assert_eq!(alert.source.id, source);
            assert_eq!(alert.estimated_amount, Some(450.0));
            assert_eq!(alert.confidence, 90);
            assert_eq!(alert.client_name, Some("Acme Renovations".to_string()));
        }

        #[test]
        fn repeated_events_create_exactly_one_alert() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_receipt(receipt(account, source, false));

            let mut opened = 0;
            for _ in 0..5 {
                match engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source) {
                    DetectionOutcome::AlertOpened(_) => opened += 1,
                    DetectionOutcome::Duplicate(_) => {}
                    other => panic!("unexpected outcome {other:?}"),
                }
            }

            assert_eq!(opened, 1);
            assert_eq!(engine.list_open_alerts(&account).len(), 1);
        }

        #[test]
        fn linked_receipt_closes_open_alert() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_receipt(receipt(account, source, false));
            engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);

            // The receipt gets attached to an invoice; the next event
            // falsifies the precondition and closes the alert.
            records.upsert_receipt(receipt(account, source, true));
            let outcome =
                engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);

            let DetectionOutcome::AlertClosed(alert) = outcome else {
                panic!("expected AlertClosed, got {outcome:?}");
            };
            assert_eq!(alert.status, AlertStatus::Fixed);
            assert!(engine.list_open_alerts(&account).is_empty());
            // Fixed, not deleted.
            assert_eq!(engine.store().alert_count(), 1);
        }

        #[test]
        fn clear_without_open_alert_is_noop() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_receipt(receipt(account, source, true));

            let outcome =
                engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);
            assert_eq!(outcome, DetectionOutcome::NothingOpen);
        }

        #[test]
        fn missing_record_is_not_applicable() {
            let (engine, _) = engine_with_store();
            let outcome = engine.on_business_event(
                &AccountId::new(),
                BusinessEvent::ReceiptRecorded,
                &SourceId::new(),
            );
            assert_eq!(outcome, DetectionOutcome::NotApplicable);
        }

        #[test]
        fn draft_invoice_opens_then_sending_closes() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            let mut invoice = Invoice {
                id: source,
                account_id: account,
                client_name: None,
                client_email: None,
                total: 1200.0,
                currency: "USD".to_string(),
                status: InvoiceStatus::Draft,
                created_at: Utc::now(),
                sent_at: None,
            };
            records.upsert_invoice(invoice.clone());

            let outcome =
                engine.on_business_event(&account, BusinessEvent::InvoiceStateChanged, &source);
            assert!(matches!(outcome, DetectionOutcome::AlertOpened(_)));

            invoice.status = InvoiceStatus::Sent;
            invoice.sent_at = Some(Utc::now());
            records.upsert_invoice(invoice);

            let outcome =
                engine.on_business_event(&account, BusinessEvent::InvoiceStateChanged, &source);
            assert!(matches!(outcome, DetectionOutcome::AlertClosed(_)));
        }

        #[test]
        fn voice_log_without_amount_gets_lower_confidence() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_voice_log(VoiceLog {
                id: source,
                account_id: account,
                transcript: "fixed the gate latch".to_string(),
                estimated_amount: None,
                currency: "USD".to_string(),
                client_name: None,
                client_email: None,
                invoice_id: None,
                recorded_at: Utc::now(),
            });

            let outcome =
                engine.on_business_event(&account, BusinessEvent::VoiceLogCaptured, &source);
            let DetectionOutcome::AlertOpened(alert) = outcome else {
                panic!("expected AlertOpened");
            };
            assert_eq!(alert.confidence, crate::rules::VOICE_UNSTRUCTURED_CONFIDENCE);
            assert!(alert.estimated_amount.is_none());
        }
    }

    mod entitlement_tests {
        use super::*;

        #[test]
        fn ineligible_account_never_creates_alert() {
            let records = Arc::new(InMemoryRecordStore::new());
            let gate = Arc::new(StaticEntitlements::new());
            let engine = DetectionEngine::new(gate.clone(), records.clone());

            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_receipt(receipt(account, source, false));

            let outcome =
                engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);
            assert_eq!(outcome, DetectionOutcome::Ineligible);
            assert!(engine.list_open_alerts(&account).is_empty());

            // Plan state can change between events; the gate is re-checked.
            gate.grant(account);
            let outcome =
                engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);
            assert!(matches!(outcome, DetectionOutcome::AlertOpened(_)));
        }
    }

    mod failure_tests {
        use super::*;

        /// A record store that always fails, for the swallow-and-log path.
        #[derive(Debug)]
        struct BrokenRecordStore;

        impl SourceRecordStore for BrokenRecordStore {
            fn receipt(&self, _: &SourceId) -> tally_records::Result<Option<Receipt>> {
                Err(RecordStoreError::Unavailable {
                    reason: "database offline".to_string(),
                })
            }

            fn scoped_work(
                &self,
                _: &SourceId,
            ) -> tally_records::Result<Option<tally_records::ScopedWork>> {
                Err(RecordStoreError::Unavailable {
                    reason: "database offline".to_string(),
                })
            }

            fn voice_log(&self, _: &SourceId) -> tally_records::Result<Option<VoiceLog>> {
                Err(RecordStoreError::Unavailable {
                    reason: "database offline".to_string(),
                })
            }

            fn invoice(&self, _: &SourceId) -> tally_records::Result<Option<Invoice>> {
                Err(RecordStoreError::Unavailable {
                    reason: "database offline".to_string(),
                })
            }

            fn draft_invoices_older_than(
                &self,
                _: chrono::DateTime<Utc>,
            ) -> tally_records::Result<Vec<Invoice>> {
                Err(RecordStoreError::Unavailable {
                    reason: "database offline".to_string(),
                })
            }
        }

        #[test]
        fn record_store_failure_is_swallowed() {
            let engine = DetectionEngine::new(
                Arc::new(OpenEntitlements::new()),
                Arc::new(BrokenRecordStore),
            );

            let outcome = engine.on_business_event(
                &AccountId::new(),
                BusinessEvent::ReceiptRecorded,
                &SourceId::new(),
            );
            assert_eq!(outcome, DetectionOutcome::SourceUnavailable);
            assert_eq!(engine.store().alert_count(), 0);
        }
    }

    mod audit_tests {
        use super::*;
        use crate::events::AlertEventKind;

        #[test]
        fn alert_events_trace_the_lifecycle() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();
            let source = SourceId::new();
            records.upsert_receipt(receipt(account, source, false));

            let DetectionOutcome::AlertOpened(alert) =
                engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source)
            else {
                panic!("expected AlertOpened");
            };

            records.upsert_receipt(receipt(account, source, true));
            engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);

            let events = engine.alert_events(&alert.id).unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].kind, AlertEventKind::Created);
            assert_eq!(events[1].kind, AlertEventKind::Closed);
        }

        #[test]
        fn alert_events_unknown_id_fails() {
            let (engine, _) = engine_with_store();
            let result = engine.alert_events(&crate::types::AlertId::new());
            assert!(matches!(result.err(), Some(AlertError::AlertNotFound { .. })));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn summary_reflects_open_alerts() {
            let (engine, records) = engine_with_store();
            let account = AccountId::new();

            let r1 = SourceId::new();
            let r2 = SourceId::new();
            records.upsert_receipt(receipt(account, r1, false));
            records.upsert_receipt(receipt(account, r2, false));

            engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &r1);
            engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &r2);

            let summary = engine.alert_summary(&account);
            assert_eq!(summary.count, 2);
            assert!((summary.total_estimated_amount - 900.0).abs() < f64::EPSILON);

            // Fixing one alert removes it from the rollup.
            records.upsert_receipt(receipt(account, r1, true));
            engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &r1);

            let summary = engine.alert_summary(&account);
            assert_eq!(summary.count, 1);
            assert!((summary.total_estimated_amount - 450.0).abs() < f64::EPSILON);
        }
    }

    mod dedup_property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any interleaving of billed/unbilled record states keeps at
            /// most one open alert per (account, kind, source).
            #[test]
            fn at_most_one_open_alert(states in proptest::collection::vec(any::<bool>(), 1..32)) {
                let (engine, records) = engine_with_store();
                let account = AccountId::new();
                let source = SourceId::new();

                for linked in states {
                    records.upsert_receipt(receipt(account, source, linked));
                    engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);
                    prop_assert!(engine.list_open_alerts(&account).len() <= 1);
                }
            }

            /// Repeated true-precondition events produce exactly one open
            /// alert no matter how many times they fire.
            #[test]
            fn n_events_one_alert(n in 1usize..24) {
                let (engine, records) = engine_with_store();
                let account = AccountId::new();
                let source = SourceId::new();
                records.upsert_receipt(receipt(account, source, false));

                for _ in 0..n {
                    engine.on_business_event(&account, BusinessEvent::ReceiptRecorded, &source);
                }
                prop_assert_eq!(engine.list_open_alerts(&account).len(), 1);
            }
        }
    }
}
