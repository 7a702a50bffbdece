//! Core traits for ClearAudit abstractions.
//!
//! The backend is consumed only through [`AuditBackend`], so the
//! orchestration layer can run against the HTTP client or an in-memory
//! double.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

/// The audit backend's HTTP surface.
///
/// Every method is one request; none of them retry.
#[async_trait]
pub trait AuditBackend: Send + Sync {
    /// `GET /documents`
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// `GET /dashboard/stats`
    async fn dashboard_stats(&self) -> Result<DashboardStats>;

    /// `GET /documents/{id}/extraction`
    async fn get_document(&self, document_id: i64) -> Result<Document>;

    /// `GET /documents/{id}/findings`
    async fn list_findings(&self, document_id: i64) -> Result<Vec<Finding>>;

    /// `GET /documents/{id}/pdf`
    async fn pdf_url(&self, document_id: i64) -> Result<String>;

    /// `POST /upload` (multipart)
    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<UploadReceipt>;

    /// `POST /documents/{id}/analyze`
    async fn analyze(&self, document_id: i64) -> Result<AnalysisReceipt>;

    /// `POST /contracts/{id}/risk_assessment`
    async fn submit_risk_assessment(&self, document_id: i64) -> Result<RiskSubmission>;

    /// `POST /findings/{id}/review`
    async fn review_finding(&self, finding_id: i64, request: &ReviewRequest) -> Result<()>;

    /// `GET /tasks/{id}/status`
    async fn task_status(&self, task_id: &str) -> Result<TaskStatus>;

    /// `GET /documents/{id}/audit`
    async fn audit_log(&self, document_id: i64) -> Result<AuditLog>;

    /// `GET /documents/{id}/report`
    async fn document_report(&self, document_id: i64) -> Result<DocumentReport>;

    /// `GET /evaluation/report`
    async fn evaluation_report(&self) -> Result<EvaluationReport>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus>;
}
