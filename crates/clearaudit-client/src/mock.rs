//! Scripted in-memory audit backend for deterministic testing.
//!
//! Behaves like a small audit server: uploads create `PENDING` documents,
//! analysis and risk assessment publish staged findings, reviews close
//! findings and complete the document once none remain open. Task status
//! responses are scripted per task id.
//!
//! ## Usage
//!
//! ```rust
//! use clearaudit_client::mock::{MockBackend, MockOp};
//! use clearaudit_core::{AuditBackend, DocumentStatus, DocumentType, TaskStatus};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MockBackend::new()
//!         .with_document(7, "INV-7.pdf", Some(DocumentType::Invoice), DocumentStatus::Pending)
//!         .with_task_script("t1", vec![TaskStatus::running("t1")]);
//!
//!     let docs = backend.list_documents().await.unwrap();
//!     assert_eq!(docs.len(), 1);
//!     assert_eq!(backend.call_count(MockOp::ListDocuments), 1);
//! }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use clearaudit_core::{
    AnalysisReceipt, AuditBackend, AuditLog, DashboardStats, Document, DocumentReport,
    DocumentStatus, DocumentType, Error, EvaluationReport, Finding, FindingStatus, HealthStatus,
    ReportFinding, Result, ReviewRecord, ReviewRequest, RiskAssessmentResult, RiskSubmission,
    Severity, TaskHandle, TaskState, TaskStatus, UploadReceipt,
};

/// Backend operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ListDocuments,
    DashboardStats,
    GetDocument,
    ListFindings,
    PdfUrl,
    Upload,
    Analyze,
    RiskAssessment,
    Review,
    TaskStatus,
    AuditLog,
    Report,
    Evaluation,
    Health,
}

#[derive(Default)]
struct MockState {
    documents: Vec<Document>,
    findings: HashMap<i64, Vec<Finding>>,
    /// Findings published by the next analyze / risk assessment of a document
    staged: HashMap<i64, Vec<Finding>>,
    /// Whether a document's risk assessment is queued (task id) or immediate
    risk_tasks: HashMap<i64, String>,
    task_scripts: HashMap<String, VecDeque<TaskStatus>>,
    task_documents: HashMap<String, i64>,
    /// Failure injected per op: (message, remaining count; None = always)
    failures: HashMap<MockOp, (String, Option<usize>)>,
    decisions: Vec<ReviewRecord>,
    calls: HashMap<MockOp, usize>,
    next_document_id: i64,
}

/// Scripted in-memory backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a document.
    pub fn with_document(
        self,
        id: i64,
        filename: &str,
        doc_type: Option<DocumentType>,
        status: DocumentStatus,
    ) -> Self {
        {
            let mut state = self.lock();
            state.documents.push(Document {
                id,
                filename: filename.to_string(),
                doc_type,
                status,
                created_at: Some(Utc::now()),
                open_findings: 0,
                extraction: None,
            });
            state.next_document_id = state.next_document_id.max(id);
        }
        self
    }

    /// Seed findings already recorded for a document.
    pub fn with_findings(self, document_id: i64, findings: Vec<Finding>) -> Self {
        {
            let mut state = self.lock();
            state.findings.insert(document_id, findings);
            state.sync_document(document_id, false);
        }
        self
    }

    /// Stage findings that the next analyze / risk assessment publishes.
    pub fn with_staged_findings(self, document_id: i64, findings: Vec<Finding>) -> Self {
        self.lock().staged.insert(document_id, findings);
        self
    }

    /// Make the risk assessment of `document_id` queue task `task_id`.
    pub fn with_queued_risk(self, document_id: i64, task_id: &str) -> Self {
        {
            let mut state = self.lock();
            state.risk_tasks.insert(document_id, task_id.to_string());
            state.task_documents.insert(task_id.to_string(), document_id);
        }
        self
    }

    /// Script the status responses of a task. The last entry repeats.
    pub fn with_task_script(self, task_id: &str, script: Vec<TaskStatus>) -> Self {
        self.lock()
            .task_scripts
            .insert(task_id.to_string(), script.into_iter().collect());
        self
    }

    /// Fail the next `times` calls of `op` with `RequestFailed(message)`.
    pub fn fail_next(&self, op: MockOp, message: &str, times: usize) {
        self.lock()
            .failures
            .insert(op, (message.to_string(), Some(times)));
    }

    /// Fail every call of `op` until [`MockBackend::clear_failures`].
    pub fn fail_always(&self, op: MockOp, message: &str) {
        self.lock().failures.insert(op, (message.to_string(), None));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Number of calls made to `op`.
    pub fn call_count(&self, op: MockOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Server-side copy of a document.
    pub fn document(&self, id: i64) -> Option<Document> {
        self.lock().documents.iter().find(|d| d.id == id).cloned()
    }

    /// Server-side copy of a finding.
    pub fn finding(&self, id: i64) -> Option<Finding> {
        self.lock()
            .findings
            .values()
            .flatten()
            .find(|f| f.id == id)
            .cloned()
    }

    /// Set a document's status server-side, as a background job would.
    pub fn set_status(&self, id: i64, status: DocumentStatus) {
        if let Some(doc) = self.lock().documents.iter_mut().find(|d| d.id == id) {
            doc.status = status;
        }
    }

    /// Build a finding for seeding.
    pub fn finding_fixture(id: i64, document_id: i64, finding_type: &str) -> Finding {
        Finding {
            id,
            document_id,
            finding_type: finding_type.to_string(),
            severity: Severity::High,
            description: format!("{} detected", finding_type),
            evidence: json!({}),
            status: FindingStatus::Open,
        }
    }

    /// Count the call and return an injected failure, if any.
    fn enter(&self, op: MockOp) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;

        let injected = match state.failures.get_mut(&op) {
            Some((message, None)) => Some(message.clone()),
            Some((message, Some(remaining))) if *remaining > 0 => {
                *remaining -= 1;
                Some(message.clone())
            }
            _ => None,
        };
        match injected {
            Some(message) => Err(Error::RequestFailed(message)),
            None => Ok(state),
        }
    }
}

impl MockState {
    fn document_mut(&mut self, id: i64) -> Result<&mut Document> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(format!("document {}", id)))
    }

    /// Publish staged findings for a document.
    fn publish(&mut self, document_id: i64) {
        if let Some(staged) = self.staged.remove(&document_id) {
            self.findings.entry(document_id).or_default().extend(staged);
        }
        self.sync_document(document_id, true);
    }

    /// Recompute the open count and status of a document from its findings.
    fn sync_document(&mut self, document_id: i64, analyzed: bool) {
        let open = self
            .findings
            .get(&document_id)
            .map(|fs| fs.iter().filter(|f| f.is_open()).count())
            .unwrap_or(0) as u32;
        let has_findings = self
            .findings
            .get(&document_id)
            .is_some_and(|fs| !fs.is_empty());

        if let Some(doc) = self.documents.iter_mut().find(|d| d.id == document_id) {
            doc.open_findings = open;
            if open > 0 {
                doc.status = DocumentStatus::ReviewNeeded;
            } else if analyzed || has_findings {
                doc.status = DocumentStatus::Completed;
            }
        }
    }

    fn stats(&self) -> DashboardStats {
        let mut stats = DashboardStats::default();
        for doc in &self.documents {
            match doc.status {
                DocumentStatus::Pending | DocumentStatus::Processing => stats.processing += 1,
                DocumentStatus::ReviewNeeded => stats.needs_review += 1,
                DocumentStatus::Completed => stats.completed += 1,
                DocumentStatus::Failed => stats.failed += 1,
            }
            stats.open_findings += u64::from(doc.open_findings);
            stats.total += 1;
        }
        stats
    }
}

#[async_trait]
impl AuditBackend for MockBackend {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        let state = self.enter(MockOp::ListDocuments)?;
        // Newest first, like the backend.
        Ok(state.documents.iter().rev().cloned().collect())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let state = self.enter(MockOp::DashboardStats)?;
        Ok(state.stats())
    }

    async fn get_document(&self, document_id: i64) -> Result<Document> {
        let state = self.enter(MockOp::GetDocument)?;
        state
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document {}", document_id)))
    }

    async fn list_findings(&self, document_id: i64) -> Result<Vec<Finding>> {
        let state = self.enter(MockOp::ListFindings)?;
        Ok(state.findings.get(&document_id).cloned().unwrap_or_default())
    }

    async fn pdf_url(&self, document_id: i64) -> Result<String> {
        let _state = self.enter(MockOp::PdfUrl)?;
        Ok(format!("https://files.test/documents/{}.pdf", document_id))
    }

    async fn upload(&self, filename: &str, _content: Vec<u8>) -> Result<UploadReceipt> {
        let mut state = self.enter(MockOp::Upload)?;
        state.next_document_id += 1;
        let id = state.next_document_id;
        state.documents.push(Document {
            id,
            filename: filename.to_string(),
            doc_type: None,
            status: DocumentStatus::Pending,
            created_at: Some(Utc::now()),
            open_findings: 0,
            extraction: None,
        });
        Ok(UploadReceipt {
            id,
            filename: Some(filename.to_string()),
            status: Some(DocumentStatus::Pending),
            message: Some("Upload successful".to_string()),
        })
    }

    async fn analyze(&self, document_id: i64) -> Result<AnalysisReceipt> {
        let mut state = self.enter(MockOp::Analyze)?;
        state.document_mut(document_id)?;
        let count = state.staged.get(&document_id).map(Vec::len).unwrap_or(0) as u32;
        state.publish(document_id);
        Ok(AnalysisReceipt {
            status: Some("success".to_string()),
            findings_count: Some(count),
        })
    }

    async fn submit_risk_assessment(&self, document_id: i64) -> Result<RiskSubmission> {
        let mut state = self.enter(MockOp::RiskAssessment)?;
        state.document_mut(document_id)?;
        if let Some(task_id) = state.risk_tasks.get(&document_id).cloned() {
            return Ok(RiskSubmission::Queued(TaskHandle::new(task_id, document_id)));
        }
        state.publish(document_id);
        Ok(RiskSubmission::Immediate(RiskAssessmentResult {
            status: "success".to_string(),
            risks: Vec::new(),
        }))
    }

    async fn review_finding(&self, finding_id: i64, request: &ReviewRequest) -> Result<()> {
        let mut state = self.enter(MockOp::Review)?;
        let finding = state
            .findings
            .values_mut()
            .flatten()
            .find(|f| f.id == finding_id)
            .ok_or_else(|| Error::NotFound(format!("finding {}", finding_id)))?;
        finding.status = request.decision.resulting_status();
        let document_id = finding.document_id;

        let record_id = state.decisions.len() as i64 + 1;
        state.decisions.push(ReviewRecord {
            id: Some(record_id),
            finding_id,
            decision: request.decision,
            comment: request.comment.clone(),
            user_id: Some("user_123".to_string()),
            created_at: Some(Utc::now()),
        });
        state.sync_document(document_id, false);
        Ok(())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let mut state = self.enter(MockOp::TaskStatus)?;
        let script = state
            .task_scripts
            .get_mut(task_id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        let status = next.unwrap_or_else(|| TaskStatus::running(task_id));

        let worker_error = status
            .result
            .as_ref()
            .and_then(|r| r.get("status"))
            .and_then(|s| s.as_str())
            == Some("error");
        if status.state == TaskState::Success && !worker_error {
            if let Some(document_id) = state.task_documents.get(task_id).copied() {
                state.publish(document_id);
            }
        }
        Ok(status)
    }

    async fn audit_log(&self, document_id: i64) -> Result<AuditLog> {
        let state = self.enter(MockOp::AuditLog)?;
        let ids: Vec<i64> = state
            .findings
            .get(&document_id)
            .map(|fs| fs.iter().map(|f| f.id).collect())
            .unwrap_or_default();
        Ok(AuditLog {
            decisions: state
                .decisions
                .iter()
                .filter(|d| ids.contains(&d.finding_id))
                .cloned()
                .collect(),
        })
    }

    async fn document_report(&self, document_id: i64) -> Result<DocumentReport> {
        let state = self.enter(MockOp::Report)?;
        let doc = state
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .ok_or_else(|| Error::NotFound(format!("document {}", document_id)))?;
        let findings = state
            .findings
            .get(&document_id)
            .map(|fs| {
                fs.iter()
                    .map(|f| {
                        let decision = state.decisions.iter().rev().find(|d| d.finding_id == f.id);
                        ReportFinding {
                            finding_type: f.finding_type.clone(),
                            severity: f.severity,
                            description: f.description.clone(),
                            status: f.status,
                            review_decision: decision.map(|d| d.decision),
                            review_comment: decision.and_then(|d| d.comment.clone()),
                            reviewed_by: decision.and_then(|d| d.user_id.clone()),
                            reviewed_at: decision.and_then(|d| d.created_at),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(DocumentReport {
            document_id,
            filename: doc.filename.clone(),
            status: doc.status,
            findings,
        })
    }

    async fn evaluation_report(&self) -> Result<EvaluationReport> {
        let _state = self.enter(MockOp::Evaluation)?;
        Ok(EvaluationReport {
            timestamp: "N/A".to_string(),
            ..EvaluationReport::default()
        })
    }

    async fn health(&self) -> Result<HealthStatus> {
        let _state = self.enter(MockOp::Health)?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            services: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearaudit_core::ReviewDecision;

    #[tokio::test]
    async fn test_upload_creates_pending_document() {
        let backend = MockBackend::new();
        let receipt = backend.upload("INV-1.pdf", vec![1, 2, 3]).await.unwrap();
        let doc = backend.document(receipt.id).unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert_eq!(backend.dashboard_stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_task_script_repeats_last_entry() {
        let backend = MockBackend::new().with_task_script(
            "t1",
            vec![TaskStatus::running("t1"), TaskStatus::succeeded("t1", json!({}))],
        );
        assert_eq!(
            backend.task_status("t1").await.unwrap().state,
            TaskState::Running
        );
        assert_eq!(
            backend.task_status("t1").await.unwrap().state,
            TaskState::Success
        );
        assert_eq!(
            backend.task_status("t1").await.unwrap().state,
            TaskState::Success
        );
        assert_eq!(backend.call_count(MockOp::TaskStatus), 3);
    }

    #[tokio::test]
    async fn test_fail_next_is_bounded() {
        let backend = MockBackend::new();
        backend.fail_next(MockOp::ListDocuments, "connection reset", 1);
        assert!(matches!(
            backend.list_documents().await,
            Err(Error::RequestFailed(_))
        ));
        assert!(backend.list_documents().await.is_ok());
    }

    #[tokio::test]
    async fn test_review_closes_last_finding_completes_document() {
        let backend = MockBackend::new()
            .with_document(2, "MSA.pdf", Some(DocumentType::Contract), DocumentStatus::Processing)
            .with_findings(2, vec![MockBackend::finding_fixture(101, 2, "term_mismatch")]);
        assert_eq!(
            backend.document(2).unwrap().status,
            DocumentStatus::ReviewNeeded
        );

        let req = ReviewRequest {
            decision: ReviewDecision::Override,
            comment: None,
        };
        backend.review_finding(101, &req).await.unwrap();

        let doc = backend.document(2).unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.open_findings, 0);
        assert_eq!(backend.audit_log(2).await.unwrap().decisions.len(), 1);
    }
}
