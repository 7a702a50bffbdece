//! Owned entity store shared by the orchestrator and the dashboard.
//!
//! The store holds the last known server state of documents and findings.
//! Backend snapshots are authoritative, with two exceptions:
//!
//! - A refresh snapshot never moves a finding from a terminal review status
//!   back to `open`.
//! - While an action on a document is in flight (see
//!   [`AuditStore::begin_action`]), a collection snapshot that would move the
//!   document backwards in its lifecycle is held until the action's own
//!   reload lands. Single-document reloads always apply.
//!
//! Locks are never held across an await point.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use clearaudit_core::{
    DashboardStats, Document, DocumentStatus, Error, Finding, FindingStatus, Result,
    UploadReceipt,
};

/// Where a document snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotSource {
    /// `GET /documents`, fetched concurrently with other work
    Collection,
    /// An explicit single-document reload
    Detail,
}

#[derive(Debug, Default)]
struct StoreState {
    /// Documents in backend order (newest first).
    documents: Vec<Document>,
    /// Loaded findings, keyed by document id.
    findings: HashMap<i64, Vec<Finding>>,
    server_stats: Option<DashboardStats>,
    last_refresh: Option<DateTime<Utc>>,
    /// Number of in-flight actions per document.
    in_flight: HashMap<i64, usize>,
}

impl StoreState {
    fn is_in_flight(&self, document_id: i64) -> bool {
        self.in_flight.get(&document_id).copied().unwrap_or(0) > 0
    }

    /// Reconcile an incoming document with the local copy.
    fn merge_document(&self, mut incoming: Document, source: SnapshotSource) -> Document {
        if let Some(local) = self.documents.iter().find(|d| d.id == incoming.id) {
            if source == SnapshotSource::Collection
                && self.is_in_flight(incoming.id)
                && !local.status.can_advance_to(incoming.status)
            {
                debug!(
                    document_id = incoming.id,
                    local = %local.status,
                    incoming = %incoming.status,
                    "Holding stale collection status during an action"
                );
                incoming.status = local.status;
            }
            if incoming.extraction.is_none() {
                incoming.extraction = local.extraction.clone();
            }
            // The collection endpoint carries no classification.
            if incoming.doc_type.is_none() {
                incoming.doc_type = local.doc_type;
            }
        }
        incoming
    }
}

/// Thread-safe, cloneable handle to the entity store.
#[derive(Debug, Clone, Default)]
pub struct AuditStore {
    inner: Arc<RwLock<StoreState>>,
}

impl AuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Snapshot of all documents.
    pub fn documents(&self) -> Vec<Document> {
        self.read().documents.clone()
    }

    pub fn document(&self, id: i64) -> Option<Document> {
        self.read().documents.iter().find(|d| d.id == id).cloned()
    }

    /// Loaded findings of a document, or `None` if never loaded.
    pub fn findings(&self, document_id: i64) -> Option<Vec<Finding>> {
        self.read().findings.get(&document_id).cloned()
    }

    pub fn finding(&self, finding_id: i64) -> Option<Finding> {
        self.read()
            .findings
            .values()
            .flatten()
            .find(|f| f.id == finding_id)
            .cloned()
    }

    /// Open findings of a document.
    ///
    /// Derived from the loaded findings when present, otherwise the
    /// document's own `open_findings` attribute.
    pub fn open_findings(&self, document_id: i64) -> u32 {
        let state = self.read();
        match state.findings.get(&document_id) {
            Some(findings) => findings.iter().filter(|f| f.is_open()).count() as u32,
            None => state
                .documents
                .iter()
                .find(|d| d.id == document_id)
                .map(|d| d.open_findings)
                .unwrap_or(0),
        }
    }

    /// Last `/dashboard/stats` response.
    pub fn server_stats(&self) -> Option<DashboardStats> {
        self.read().server_stats
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.read().last_refresh
    }

    pub fn is_in_flight(&self, document_id: i64) -> bool {
        self.read().is_in_flight(document_id)
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Replace the document collection with a full snapshot.
    ///
    /// Loaded findings of documents absent from the snapshot are dropped.
    pub fn replace_documents(&self, documents: Vec<Document>) {
        let mut state = self.write();
        let merged: Vec<Document> = documents
            .into_iter()
            .map(|d| state.merge_document(d, SnapshotSource::Collection))
            .collect();
        state
            .findings
            .retain(|id, _| merged.iter().any(|d| d.id == *id));
        trace!(result_count = merged.len(), "Replacing document collection");
        state.documents = merged;
        state.last_refresh = Some(Utc::now());
    }

    /// Insert or update a single document, returning the stored copy.
    ///
    /// The reloaded status always replaces the local one.
    pub fn upsert_document(&self, document: Document) -> Document {
        let mut state = self.write();
        let merged = state.merge_document(document, SnapshotSource::Detail);
        match state.documents.iter_mut().find(|d| d.id == merged.id) {
            Some(slot) => *slot = merged.clone(),
            None => state.documents.insert(0, merged.clone()),
        }
        merged
    }

    /// Record an acknowledged upload.
    ///
    /// The document is added as `PENDING` unless the backend reported another
    /// status; an existing entry is left untouched.
    pub fn insert_uploaded(&self, receipt: &UploadReceipt, filename: &str) -> Document {
        let mut state = self.write();
        if let Some(existing) = state.documents.iter().find(|d| d.id == receipt.id) {
            return existing.clone();
        }
        let document = Document {
            id: receipt.id,
            filename: receipt
                .filename
                .clone()
                .unwrap_or_else(|| filename.to_string()),
            doc_type: None,
            status: receipt.status.unwrap_or(DocumentStatus::Pending),
            created_at: Some(Utc::now()),
            open_findings: 0,
            extraction: None,
        };
        state.documents.insert(0, document.clone());
        document
    }

    /// Replace a document's findings with a snapshot from the backend.
    pub fn replace_findings(&self, document_id: i64, findings: Vec<Finding>) -> Vec<Finding> {
        let mut state = self.write();
        let local = state.findings.remove(&document_id).unwrap_or_default();
        let merged: Vec<Finding> = findings
            .into_iter()
            .map(|mut incoming| {
                if let Some(previous) = local.iter().find(|f| f.id == incoming.id) {
                    if previous.status.is_terminal() && !incoming.status.is_terminal() {
                        debug!(
                            finding_id = incoming.id,
                            local = %previous.status,
                            "Ignoring stale open status for reviewed finding"
                        );
                        incoming.status = previous.status;
                    }
                }
                incoming
            })
            .collect();
        let open = merged.iter().filter(|f| f.is_open()).count() as u32;
        if let Some(doc) = state.documents.iter_mut().find(|d| d.id == document_id) {
            doc.open_findings = open;
        }
        state.findings.insert(document_id, merged.clone());
        merged
    }

    /// Apply an acknowledged review to the local finding.
    pub fn apply_review(&self, finding_id: i64, status: FindingStatus) -> Result<Finding> {
        let mut state = self.write();
        let finding = state
            .findings
            .values_mut()
            .flatten()
            .find(|f| f.id == finding_id)
            .ok_or_else(|| Error::NotFound(format!("finding {} is not loaded", finding_id)))?;

        if finding.status == status {
            return Ok(finding.clone());
        }
        if finding.status.is_terminal() {
            return Err(Error::ValidationFailed(format!(
                "finding {} is already {}",
                finding_id, finding.status
            )));
        }
        finding.status = status;
        let updated = finding.clone();

        let document_id = updated.document_id;
        let open = state
            .findings
            .get(&document_id)
            .map(|fs| fs.iter().filter(|f| f.is_open()).count() as u32);
        if let (Some(open), Some(doc)) = (
            open,
            state.documents.iter_mut().find(|d| d.id == document_id),
        ) {
            doc.open_findings = open;
        }
        Ok(updated)
    }

    pub fn set_server_stats(&self, stats: DashboardStats) {
        self.write().server_stats = Some(stats);
    }

    /// Mark an explicit action on a document as in flight.
    ///
    /// While the guard lives, collection snapshots cannot move the document
    /// backwards in its lifecycle.
    pub fn begin_action(&self, document_id: i64) -> ActionGuard {
        *self.write().in_flight.entry(document_id).or_insert(0) += 1;
        ActionGuard {
            store: self.clone(),
            document_id,
        }
    }

    fn end_action(&self, document_id: i64) {
        let mut state = self.write();
        if let Some(count) = state.in_flight.get_mut(&document_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.in_flight.remove(&document_id);
            }
        }
    }
}

/// Scope of an explicit action on one document.
#[derive(Debug)]
pub struct ActionGuard {
    store: AuditStore,
    document_id: i64,
}

impl ActionGuard {
    pub fn document_id(&self) -> i64 {
        self.document_id
    }
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        self.store.end_action(self.document_id);
    }
}
