//! Read-only access to source records.
//!
//! The detection engine and the reconciliation sweep observe receipts,
//! approved scope work, voice logs, and invoices but never mutate them;
//! mutation stays with the services that own those records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;
use crate::ids::SourceId;
use crate::records::{Invoice, Receipt, ScopedWork, VoiceLog};

/// Read-only view over the platform's source records.
///
/// Implementations may be backed by a database, a service client, or the
/// in-memory [`InMemoryRecordStore`]. Lookups return `Ok(None)` for unknown
/// ids; errors are reserved for backend failures.
pub trait SourceRecordStore: Send + Sync {
    /// Looks up a receipt by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn receipt(&self, id: &SourceId) -> Result<Option<Receipt>>;

    /// Looks up an approved scope work item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn scoped_work(&self, id: &SourceId) -> Result<Option<ScopedWork>>;

    /// Looks up a voice log by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn voice_log(&self, id: &SourceId) -> Result<Option<VoiceLog>>;

    /// Looks up an invoice by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn invoice(&self, id: &SourceId) -> Result<Option<Invoice>>;

    /// Returns draft invoices created at or before the cutoff.
    ///
    /// Used by the reconciliation sweep to catch drafts the synchronous
    /// event path missed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn draft_invoices_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Invoice>>;
}

/// In-memory source record store.
///
/// Mirrors the shape of the platform's other in-memory stores; primarily a
/// test and demo seam, with upsert helpers standing in for the services
/// that own each record type.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    receipts: RwLock<HashMap<SourceId, Receipt>>,
    scoped_work: RwLock<HashMap<SourceId, ScopedWork>>,
    voice_logs: RwLock<HashMap<SourceId, VoiceLog>>,
    invoices: RwLock<HashMap<SourceId, Invoice>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a receipt.
    pub fn upsert_receipt(&self, receipt: Receipt) {
        self.receipts.write().insert(receipt.id, receipt);
    }

    /// Inserts or replaces an approved scope work item.
    pub fn upsert_scoped_work(&self, work: ScopedWork) {
        self.scoped_work.write().insert(work.id, work);
    }

    /// Inserts or replaces a voice log.
    pub fn upsert_voice_log(&self, log: VoiceLog) {
        self.voice_logs.write().insert(log.id, log);
    }

    /// Inserts or replaces an invoice.
    pub fn upsert_invoice(&self, invoice: Invoice) {
        self.invoices.write().insert(invoice.id, invoice);
    }

    /// Returns the number of invoices held.
    #[must_use]
    pub fn invoice_count(&self) -> usize {
        self.invoices.read().len()
    }
}

impl SourceRecordStore for InMemoryRecordStore {
    fn receipt(&self, id: &SourceId) -> Result<Option<Receipt>> {
        Ok(self.receipts.read().get(id).cloned())
    }

    fn scoped_work(&self, id: &SourceId) -> Result<Option<ScopedWork>> {
        Ok(self.scoped_work.read().get(id).cloned())
    }

    fn voice_log(&self, id: &SourceId) -> Result<Option<VoiceLog>> {
        Ok(self.voice_logs.read().get(id).cloned())
    }

    fn invoice(&self, id: &SourceId) -> Result<Option<Invoice>> {
        Ok(self.invoices.read().get(id).cloned())
    }

    fn draft_invoices_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Invoice>> {
        Ok(self
            .invoices
            .read()
            .values()
            .filter(|i| i.is_unsent_draft() && i.created_at <= cutoff)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AccountId;
    use crate::records::InvoiceStatus;
    use chrono::Duration;

    fn invoice(status: InvoiceStatus, age_hours: i64) -> Invoice {
        Invoice {
            id: SourceId::new(),
            account_id: AccountId::new(),
            client_name: None,
            client_email: None,
            total: 500.0,
            currency: "USD".to_string(),
            status,
            created_at: Utc::now() - Duration::hours(age_hours),
            sent_at: None,
        }
    }

    #[test]
    fn lookup_missing_returns_none() {
        let store = InMemoryRecordStore::new();
        let result = store.receipt(&SourceId::new());
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn upsert_and_lookup_invoice() {
        let store = InMemoryRecordStore::new();
        let inv = invoice(InvoiceStatus::Draft, 1);
        let id = inv.id;
        store.upsert_invoice(inv.clone());
        let found = store.invoice(&id).unwrap();
        assert_eq!(found, Some(inv));
    }

    #[test]
    fn upsert_replaces_existing() {
        let store = InMemoryRecordStore::new();
        let mut inv = invoice(InvoiceStatus::Draft, 1);
        let id = inv.id;
        store.upsert_invoice(inv.clone());
        inv.status = InvoiceStatus::Sent;
        store.upsert_invoice(inv);
        let found = store.invoice(&id).unwrap().unwrap();
        assert_eq!(found.status, InvoiceStatus::Sent);
        assert_eq!(store.invoice_count(), 1);
    }

    #[test]
    fn draft_invoices_older_than_filters_status_and_age() {
        let store = InMemoryRecordStore::new();
        store.upsert_invoice(invoice(InvoiceStatus::Draft, 48)); // old draft
        store.upsert_invoice(invoice(InvoiceStatus::Draft, 1)); // fresh draft
        store.upsert_invoice(invoice(InvoiceStatus::Sent, 48)); // old but sent

        let cutoff = Utc::now() - Duration::hours(24);
        let drafts = store.draft_invoices_older_than(cutoff).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].status, InvoiceStatus::Draft);
    }
}
