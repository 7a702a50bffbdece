//! reqwest implementation of the audit backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use clearaudit_core::defaults;
use clearaudit_core::{
    AnalysisReceipt, AuditBackend, AuditLog, DashboardStats, Document, DocumentList,
    DocumentReport, Error, EvaluationReport, Finding, FindingList, HealthStatus, PdfLink, Result,
    ReviewRequest, RiskSubmission, TaskStatus, UploadReceipt,
};

use crate::config::ClientConfig;
use crate::error::{to_audit_error, ErrorBody};

/// HTTP client for the audit backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Create a new backend client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout_seconds,
            authenticated = config.api_token.is_some(),
            "Initializing audit backend client"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.config.api_token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.config.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.config.url(path)))
    }

    /// Send a request and map transport failures and non-2xx statuses.
    async fn send(&self, req: RequestBuilder, context: &str) -> Result<Response> {
        let start = Instant::now();
        let response = req
            .send()
            .await
            .map_err(|e| Error::RequestFailed(format!("{} failed: {}", context, e)))?;

        let status = response.status();
        debug!(
            op = context,
            http_status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Backend responded"
        );

        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        warn!(op = context, http_status = status.as_u16(), error = %message, "Backend request rejected");
        Err(to_audit_error(status.as_u16(), context, &message))
    }

    async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Serialization(format!("{}: invalid response body: {}", context, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let context = format!("GET {}", path);
        let response = self.send(self.get(path), &context).await?;
        Self::decode(response, &context).await
    }
}

#[async_trait]
impl AuditBackend for HttpBackend {
    async fn list_documents(&self) -> Result<Vec<Document>> {
        let list: DocumentList = self.get_json("/documents").await?;
        debug!(result_count = list.documents.len(), "Fetched document list");
        Ok(list.documents)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.get_json("/dashboard/stats").await
    }

    async fn get_document(&self, document_id: i64) -> Result<Document> {
        self.get_json(&format!("/documents/{}/extraction", document_id))
            .await
    }

    async fn list_findings(&self, document_id: i64) -> Result<Vec<Finding>> {
        let list: FindingList = self
            .get_json(&format!("/documents/{}/findings", document_id))
            .await?;
        Ok(list.findings)
    }

    async fn pdf_url(&self, document_id: i64) -> Result<String> {
        let link: PdfLink = self
            .get_json(&format!("/documents/{}/pdf", document_id))
            .await?;
        Ok(link.url)
    }

    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<UploadReceipt> {
        let size = content.len();
        let content_type = detect_content_type(filename, &content);
        debug!(filename, content_type = %content_type, "Detected upload content type");
        let part = reqwest::multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(&content_type)
            .map_err(|e| Error::RequestFailed(format!("Failed to build multipart body: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let context = "POST /upload";
        let response = self.send(self.post("/upload").multipart(form), context).await?;
        let receipt: UploadReceipt = Self::decode(response, context).await?;

        info!(document_id = receipt.id, filename, size, "Document uploaded");
        Ok(receipt)
    }

    async fn analyze(&self, document_id: i64) -> Result<AnalysisReceipt> {
        let context = format!("POST /documents/{}/analyze", document_id);
        let response = self
            .send(
                self.post(&format!("/documents/{}/analyze", document_id)),
                &context,
            )
            .await?;

        // The backend may answer with an empty body; the findings are
        // re-fetched afterwards either way.
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(AnalysisReceipt::default());
        }
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }

    async fn submit_risk_assessment(&self, document_id: i64) -> Result<RiskSubmission> {
        let path = format!("/contracts/{}/risk_assessment", document_id);
        let context = format!("POST {}", path);
        let response = self.send(self.post(&path), &context).await?;
        let body: serde_json::Value = Self::decode(response, &context).await?;
        RiskSubmission::from_response(document_id, body)
    }

    async fn review_finding(&self, finding_id: i64, request: &ReviewRequest) -> Result<()> {
        let path = format!("/findings/{}/review", finding_id);
        let context = format!("POST {}", path);
        self.send(self.post(&path).json(request), &context).await?;
        Ok(())
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatus> {
        let mut status: TaskStatus = self.get_json(&format!("/tasks/{}/status", task_id)).await?;
        if status.task_id.is_empty() {
            status.task_id = task_id.to_string();
        }
        Ok(status)
    }

    async fn audit_log(&self, document_id: i64) -> Result<AuditLog> {
        self.get_json(&format!("/documents/{}/audit", document_id))
            .await
    }

    async fn document_report(&self, document_id: i64) -> Result<DocumentReport> {
        self.get_json(&format!("/documents/{}/report", document_id))
            .await
    }

    async fn evaluation_report(&self) -> Result<EvaluationReport> {
        self.get_json("/evaluation/report").await
    }

    async fn health(&self) -> Result<HealthStatus> {
        let context = "GET /health";
        let req = self
            .get("/health")
            .timeout(Duration::from_secs(defaults::HEALTH_TIMEOUT_SECS));
        let response = self.send(req, context).await?;
        Self::decode(response, context).await
    }
}

/// Content type for an uploaded file.
///
/// Magic bytes win. Only text formats, which have no signature, fall back to
/// the extension; anything else unrecognized is sent as
/// `application/octet-stream`.
fn detect_content_type(filename: &str, data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    filename
        .rsplit_once('.')
        .and_then(|(_, ext)| text_mime_from_extension(ext))
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn text_mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "json" => Some("application/json"),
        "xml" => Some("application/xml"),
        "html" | "htm" => Some("text/html"),
        _ => None,
    }
}
