//! Document lifecycle orchestration.
//!
//! The orchestrator is the only writer of the [`AuditStore`]. Every mutating
//! action follows the same shape:
//!
//! 1. Validate locally (document type, finding status). Rejections here make
//!    no network call.
//! 2. Call the backend. On failure the store is left exactly as it was.
//! 3. Apply the acknowledged change locally, reload the affected document and
//!    re-fetch the full collection.
//!
//! Document statuses are never assigned locally; they only arrive through
//! backend snapshots.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use clearaudit_core::defaults;
use clearaudit_core::{
    AuditBackend, AuditLog, Document, DocumentAction, DocumentReport, Error, EvaluationReport,
    Finding, HealthStatus, Result, ReviewDecision, ReviewRequest, RiskAssessmentResult,
    RiskSubmission,
};
use clearaudit_jobs::{CancelToken, PollConfig, TaskPoller};

use crate::dashboard::Dashboard;
use crate::events::LifecycleEvent;
use crate::session::DocumentSession;
use crate::store::AuditStore;

/// Drives documents and findings through their lifecycles.
#[derive(Clone)]
pub struct ReviewOrchestrator {
    backend: Arc<dyn AuditBackend>,
    store: AuditStore,
    poller: TaskPoller,
    event_tx: broadcast::Sender<LifecycleEvent>,
}

impl ReviewOrchestrator {
    pub fn new(backend: Arc<dyn AuditBackend>, store: AuditStore, poll_config: PollConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        let poller = TaskPoller::new(backend.clone(), poll_config);

        info!(
            component = "orchestrator",
            poll_interval_ms = poll_config.interval_ms,
            poll_max_attempts = poll_config.max_attempts,
            "Review orchestrator ready"
        );

        Self {
            backend,
            store,
            poller,
            event_tx,
        }
    }

    pub fn store(&self) -> &AuditStore {
        &self.store
    }

    /// Read-only aggregation over this orchestrator's store.
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.store.clone())
    }

    /// Subscribe to lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    fn action_failed(&self, document_id: Option<i64>, op: &'static str, error: Error) -> Error {
        warn!(op, document_id = ?document_id, error = %error, "Action rejected, local state unchanged");
        self.emit(LifecycleEvent::ActionFailed {
            document_id,
            op,
            error: error.to_string(),
        });
        error
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Replace the document collection and server stats with fresh copies.
    ///
    /// On failure the store keeps its previous (stale) contents. A failed
    /// stats request alone does not fail the refresh.
    #[instrument(skip(self), fields(component = "orchestrator", op = "refresh"))]
    pub async fn refresh(&self) -> Result<()> {
        let (documents, stats) =
            tokio::join!(self.backend.list_documents(), self.backend.dashboard_stats());

        let documents = documents.map_err(|e| {
            warn!(error = %e, "Document refresh failed, keeping stale data");
            e
        })?;
        match stats {
            Ok(stats) => self.store.set_server_stats(stats),
            Err(e) => warn!(error = %e, "Stats refresh failed, keeping stale stats"),
        }

        let count = documents.len();
        self.store.replace_documents(documents);
        debug!(result_count = count, "Documents refreshed");
        self.emit(LifecycleEvent::DocumentsRefreshed { count });
        Ok(())
    }

    async fn refresh_after_mutation(&self) {
        // Already logged; the mutation itself succeeded.
        let _ = self.refresh().await;
    }

    /// Re-fetch one document and its findings.
    ///
    /// This is also the manual re-check after a `TaskTimeout`.
    #[instrument(skip(self), fields(component = "orchestrator", op = "reload"))]
    pub async fn reload(&self, document_id: i64) -> Result<(Document, Vec<Finding>)> {
        let (document, findings) = tokio::try_join!(
            self.backend.get_document(document_id),
            self.backend.list_findings(document_id),
        )?;

        let document = self.store.upsert_document(document);
        let findings = self.store.replace_findings(document_id, findings);
        let document = self.store.document(document_id).unwrap_or(document);
        debug!(
            status = %document.status,
            result_count = findings.len(),
            "Document reloaded"
        );
        Ok((document, findings))
    }

    async fn reload_after_mutation(&self, document_id: i64) {
        if let Err(e) = self.reload(document_id).await {
            warn!(document_id, error = %e, "Reload after mutation failed, keeping stale findings");
        }
    }

    /// Open a document view.
    ///
    /// Extraction and findings are fetched concurrently and are required; the
    /// PDF preview URL is fetched alongside them and may be missing.
    #[instrument(skip(self), fields(component = "orchestrator", op = "open_document", request_id = %Uuid::now_v7()))]
    pub async fn open_document(&self, document_id: i64) -> Result<DocumentSession> {
        let (loaded, pdf_url) =
            tokio::join!(self.reload(document_id), self.backend.pdf_url(document_id));
        loaded?;

        let pdf_url = pdf_url
            .map_err(|e| warn!(error = %e, "PDF preview unavailable"))
            .ok();
        Ok(DocumentSession::new(self.clone(), document_id, pdf_url))
    }

    pub async fn pdf_url(&self, document_id: i64) -> Result<String> {
        self.backend.pdf_url(document_id).await
    }

    pub async fn audit_log(&self, document_id: i64) -> Result<AuditLog> {
        self.backend.audit_log(document_id).await
    }

    /// Exportable report: each finding joined with its review decision.
    pub async fn report(&self, document_id: i64) -> Result<DocumentReport> {
        let report = self.backend.document_report(document_id).await?;
        debug!(
            document_id,
            result_count = report.findings.len(),
            undecided = report.undecided().count(),
            "Report fetched"
        );
        Ok(report)
    }

    pub async fn evaluation_report(&self) -> Result<EvaluationReport> {
        self.backend.evaluation_report().await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.backend.health().await
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Upload a file. The acknowledged document appears as `PENDING`.
    #[instrument(skip(self, content), fields(component = "orchestrator", op = "upload", size = content.len(), request_id = %Uuid::now_v7()))]
    pub async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Document> {
        if filename.trim().is_empty() {
            return Err(Error::ValidationFailed("filename must not be empty".to_string()));
        }
        if content.is_empty() {
            return Err(Error::ValidationFailed(format!("{} is empty", filename)));
        }

        let receipt = self
            .backend
            .upload(filename, content)
            .await
            .map_err(|e| self.action_failed(None, "upload", e))?;

        let document = self.store.insert_uploaded(&receipt, filename);
        info!(document_id = document.id, status = %document.status, "Upload acknowledged");
        self.emit(LifecycleEvent::DocumentUploaded {
            document_id: document.id,
            filename: document.filename.clone(),
        });

        self.refresh_after_mutation().await;
        Ok(self.store.document(document.id).unwrap_or(document))
    }

    fn validate_action(&self, document_id: i64, action: DocumentAction) -> Result<Document> {
        let document = self
            .store
            .document(document_id)
            .ok_or_else(|| Error::NotFound(format!("document {} is not loaded", document_id)))?;
        action.validate(&document)?;
        Ok(document)
    }

    /// Run invoice matching and return the document's reloaded findings.
    #[instrument(skip(self), fields(component = "orchestrator", op = "analyze", request_id = %Uuid::now_v7()))]
    pub async fn analyze(&self, document_id: i64) -> Result<Vec<Finding>> {
        self.validate_action(document_id, DocumentAction::Analyze)?;
        let _guard = self.store.begin_action(document_id);

        let receipt = self
            .backend
            .analyze(document_id)
            .await
            .map_err(|e| self.action_failed(Some(document_id), "analyze", e))?;

        self.reload_after_mutation(document_id).await;
        self.refresh_after_mutation().await;

        let open_findings = self.store.open_findings(document_id);
        info!(
            findings_count = ?receipt.findings_count,
            open_findings,
            "Analysis completed"
        );
        self.emit(LifecycleEvent::AnalysisCompleted {
            document_id,
            open_findings,
        });
        Ok(self.store.findings(document_id).unwrap_or_default())
    }

    /// Run contract risk scoring, polling when the backend queues a job.
    pub async fn assess_risk(&self, document_id: i64) -> Result<RiskAssessmentResult> {
        self.assess_risk_with(document_id, &CancelToken::new()).await
    }

    /// [`assess_risk`](Self::assess_risk) bound to a cancellation token.
    ///
    /// Once `cancel` fires the store is not touched again by this call.
    #[instrument(skip(self, cancel), fields(component = "orchestrator", op = "risk_assessment", request_id = %Uuid::now_v7()))]
    pub async fn assess_risk_with(
        &self,
        document_id: i64,
        cancel: &CancelToken,
    ) -> Result<RiskAssessmentResult> {
        self.validate_action(document_id, DocumentAction::RiskAssessment)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!(
                "risk assessment of document {} not submitted",
                document_id
            )));
        }
        let _guard = self.store.begin_action(document_id);

        let result = self
            .run_risk_assessment(document_id, cancel)
            .await
            .map_err(|e| self.action_failed(Some(document_id), "risk_assessment", e))?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!(
                "risk assessment of document {} completed after cancellation",
                document_id
            )));
        }

        self.reload_after_mutation(document_id).await;
        self.refresh_after_mutation().await;

        info!(risks = result.risks.len(), "Risk assessment completed");
        self.emit(LifecycleEvent::RiskAssessmentCompleted {
            document_id,
            risks: result.risks.len(),
        });
        Ok(result)
    }

    /// Resolve the submission: an immediate result returns as is, a queued
    /// job goes to the poller.
    async fn run_risk_assessment(
        &self,
        document_id: i64,
        cancel: &CancelToken,
    ) -> Result<RiskAssessmentResult> {
        match self.backend.submit_risk_assessment(document_id).await? {
            RiskSubmission::Immediate(result) => {
                debug!(risks = result.risks.len(), "Risk assessment returned inline");
                Ok(result)
            }
            RiskSubmission::Queued(handle) => {
                info!(task_id = %handle.task_id, "Risk assessment queued");
                self.emit(LifecycleEvent::RiskAssessmentQueued {
                    document_id,
                    task_id: handle.task_id.clone(),
                });
                let payload = self.poller.poll(&handle, cancel).await?;
                RiskAssessmentResult::from_task_result(payload)
            }
        }
    }

    /// Record a review decision on a loaded finding.
    ///
    /// The local finding changes only after the backend acknowledges. A
    /// finding that already carries `decision` is returned unchanged without
    /// a request; switching a terminal finding to the other decision is
    /// rejected.
    #[instrument(skip(self, comment), fields(component = "orchestrator", op = "review", request_id = %Uuid::now_v7()))]
    pub async fn review_finding(
        &self,
        finding_id: i64,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<Finding> {
        let finding = self
            .store
            .finding(finding_id)
            .ok_or_else(|| Error::NotFound(format!("finding {} is not loaded", finding_id)))?;

        if finding.status.is_terminal() {
            finding.status.apply(decision)?;
            debug!(status = %finding.status, "Finding already carries this decision");
            return Ok(finding);
        }

        let document_id = finding.document_id;
        let _guard = self.store.begin_action(document_id);
        let request = ReviewRequest {
            decision,
            comment: comment.filter(|c| !c.trim().is_empty()),
        };

        self.backend
            .review_finding(finding_id, &request)
            .await
            .map_err(|e| self.action_failed(Some(document_id), "review", e))?;

        let updated = self.store.apply_review(finding_id, decision.resulting_status())?;
        info!(
            document_id,
            status = %updated.status,
            label = updated.category().label(decision),
            "Finding reviewed"
        );
        self.emit(LifecycleEvent::FindingReviewed {
            finding_id,
            document_id,
            status: updated.status,
        });

        self.reload_after_mutation(document_id).await;
        self.refresh_after_mutation().await;
        Ok(self.store.finding(finding_id).unwrap_or(updated))
    }
}
