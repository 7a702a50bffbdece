//! Dashboard aggregation over the entity store.
//!
//! Counters and the filtered view are derived from the store alone; only
//! [`DashboardRefresher`] talks to the backend, by driving
//! [`ReviewOrchestrator::refresh`] on a timer.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use clearaudit_core::{DashboardStats, Document, DocumentStatus, Result};
use clearaudit_jobs::{spawn_periodic, PeriodicHandle};

use crate::config::RefreshConfig;
use crate::orchestrator::ReviewOrchestrator;
use crate::store::AuditStore;

/// Status filter plus free-text search over the document list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFilter {
    /// Keep only documents in this status. `None` keeps all.
    pub status: Option<DocumentStatus>,
    /// Case-insensitive substring over filename and document type.
    pub query: String,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        if self.status.is_some_and(|s| s != document.status) {
            return false;
        }
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        document.filename.to_lowercase().contains(&query)
            || document
                .doc_type
                .is_some_and(|t| t.as_str().to_lowercase().contains(&query))
    }
}

/// Read-only view of the store for dashboard rendering.
#[derive(Debug, Clone)]
pub struct Dashboard {
    store: AuditStore,
}

impl Dashboard {
    pub fn new(store: AuditStore) -> Self {
        Self { store }
    }

    /// Counters derived from the local document collection.
    ///
    /// `PENDING` and `PROCESSING` both count as processing. Open findings
    /// come from loaded findings where available.
    pub fn stats(&self) -> DashboardStats {
        let documents = self.store.documents();
        let mut stats = DashboardStats::default();
        for doc in &documents {
            match doc.status {
                DocumentStatus::Pending | DocumentStatus::Processing => stats.processing += 1,
                DocumentStatus::ReviewNeeded => stats.needs_review += 1,
                DocumentStatus::Completed => stats.completed += 1,
                DocumentStatus::Failed => stats.failed += 1,
            }
            stats.open_findings += u64::from(self.store.open_findings(doc.id));
        }
        stats.total = documents.len() as u64;
        stats
    }

    /// Last stats reported by the backend, if any refresh fetched them.
    pub fn server_stats(&self) -> Option<DashboardStats> {
        self.store.server_stats()
    }

    /// Documents matching `filter`, in store order.
    pub fn view(&self, filter: &DocumentFilter) -> Vec<Document> {
        let documents: Vec<Document> = self
            .store
            .documents()
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        debug!(result_count = documents.len(), "Dashboard view filtered");
        documents
    }
}

/// Periodic full refresh of the document collection.
pub struct DashboardRefresher {
    handle: Option<PeriodicHandle>,
}

impl DashboardRefresher {
    /// Start refreshing every `config.interval_ms`.
    ///
    /// Refresh failures keep the stale data and are retried on the next tick.
    /// A disabled config starts nothing.
    pub fn start(orchestrator: ReviewOrchestrator, config: RefreshConfig) -> Self {
        if !config.enabled || config.interval_ms == 0 {
            info!(component = "dashboard", "Periodic refresh disabled");
            return Self { handle: None };
        }

        let handle = spawn_periodic("dashboard", config.interval(), move || {
            let orchestrator = orchestrator.clone();
            async move {
                // Failures are logged by refresh itself.
                let _ = orchestrator.refresh().await;
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop refreshing, waiting for an in-flight refresh to finish.
    pub async fn stop(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.stop().await,
            None => Ok(()),
        }
    }
}
