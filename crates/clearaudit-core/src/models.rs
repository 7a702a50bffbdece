//! Core data models for the ClearAudit client.
//!
//! These types are shared across all ClearAudit crates and mirror the
//! response shapes of the audit backend. Backend inconsistencies are
//! normalized here, at the deserialization boundary, so the rest of the
//! client only ever sees one canonical shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::warn;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// Processing status of a document.
///
/// `PENDING → PROCESSING → {REVIEW_NEEDED, COMPLETED, FAILED}`. Status is
/// always assigned by the backend; the client only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    /// Uploaded, not yet classified or queued
    Pending,
    /// A backend job is in flight
    Processing,
    /// Findings await human adjudication
    ReviewNeeded,
    /// No open findings remain
    Completed,
    /// Unrecoverable processing error
    Failed,
}

impl DocumentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [DocumentStatus; 5] = [
        Self::Pending,
        Self::Processing,
        Self::ReviewNeeded,
        Self::Completed,
        Self::Failed,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::ReviewNeeded => "REVIEW_NEEDED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// `COMPLETED` and `FAILED` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn stage(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::ReviewNeeded => 2,
            Self::Completed | Self::Failed => 3,
        }
    }

    /// Whether moving from `self` to `next` respects the monotonic lifecycle
    /// without an explicit re-analysis request. Snapshots failing this check
    /// are held while an action on the document is in flight.
    pub fn can_advance_to(&self, next: DocumentStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        next.stage() > self.stage()
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::ValidationFailed(format!("unknown document status: {}", s)))
    }
}

/// Classification of a document, assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Contract,
    /// Anything the backend could not classify as invoice or contract
    #[serde(other)]
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Contract => "contract",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-type-specific backend actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentAction {
    /// Invoice-to-contract/PO matching, produces mismatch findings
    Analyze,
    /// Clause risk scoring, produces risk findings
    RiskAssessment,
}

impl DocumentAction {
    /// The only document type this action accepts.
    pub fn required_type(&self) -> DocumentType {
        match self {
            Self::Analyze => DocumentType::Invoice,
            Self::RiskAssessment => DocumentType::Contract,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::RiskAssessment => "risk_assessment",
        }
    }

    /// Reject the action for a document whose type does not support it.
    pub fn validate(&self, document: &Document) -> Result<()> {
        let required = self.required_type();
        match document.doc_type {
            Some(t) if t == required => Ok(()),
            Some(t) => Err(Error::ValidationFailed(format!(
                "{} requires document type {}, document {} is {}",
                self.as_str(),
                required,
                document.id,
                t
            ))),
            None => Err(Error::ValidationFailed(format!(
                "{} requires document type {}, document {} is not classified yet",
                self.as_str(),
                required,
                document.id
            ))),
        }
    }
}

impl std::fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document tracked through the audit pipeline.
///
/// The extraction payload is canonical under `extraction`. On the wire the
/// backend nests it under `result` (detail endpoint) or `extraction_result`
/// (list shape); both are accepted, `result` wins when both are present.
/// The classification is read from `doc_type`, or from the payload's
/// `doc_type` when the top-level key is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentWire")]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub doc_type: Option<DocumentType>,
    pub status: DocumentStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub open_findings: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<JsonValue>,
}

#[derive(Deserialize)]
struct DocumentWire {
    id: i64,
    filename: String,
    #[serde(default)]
    doc_type: Option<DocumentType>,
    status: DocumentStatus,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    open_findings: Option<u32>,
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    extraction_result: Option<JsonValue>,
    #[serde(default)]
    extraction: Option<JsonValue>,
}

impl From<DocumentWire> for Document {
    fn from(w: DocumentWire) -> Self {
        let extraction = [w.result, w.extraction_result, w.extraction]
            .into_iter()
            .flatten()
            .find(|v| !v.is_null());
        let doc_type = w.doc_type.or_else(|| {
            extraction
                .as_ref()
                .and_then(|payload| payload.get("doc_type"))
                .and_then(|t| DocumentType::deserialize(t).ok())
        });

        Self {
            id: w.id,
            filename: w.filename,
            doc_type,
            status: w.status,
            created_at: w.created_at,
            open_findings: w.open_findings.unwrap_or(0),
            extraction,
        }
    }
}

impl Document {
    /// Whether this document supports the given action.
    pub fn supports(&self, action: DocumentAction) -> bool {
        self.doc_type == Some(action.required_type())
    }
}

/// Accept RFC 3339 timestamps as well as the naive ISO-8601 strings Python's
/// `datetime.isoformat()` produces (interpreted as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parse a backend timestamp. Returns `None` for unparsable input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Response of `GET /documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: i64,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /documents/{id}/pdf`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfLink {
    pub url: String,
}

/// Aggregate counters for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    /// `PENDING` + `PROCESSING`
    pub processing: u64,
    pub needs_review: u64,
    pub completed: u64,
    pub failed: u64,
    /// Sum of open findings across all documents
    pub open_findings: u64,
    pub total: u64,
}

// =============================================================================
// FINDING TYPES
// =============================================================================

/// Finding types produced by invoice matching. Everything else is a risk.
pub const MISMATCH_FINDING_TYPES: [&str; 5] = [
    "term_mismatch",
    "rate_mismatch",
    "calculation_error",
    "missing_po",
    "anomaly",
];

/// Ordinal severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Review state of a finding: `open → {reviewed, overridden}`, one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Open,
    Reviewed,
    Overridden,
}

impl FindingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }

    /// Status after recording `decision`.
    ///
    /// Re-applying the decision that produced a terminal status is a no-op;
    /// any other change to a terminal finding is rejected.
    pub fn apply(self, decision: ReviewDecision) -> Result<FindingStatus> {
        let target = decision.resulting_status();
        match self {
            Self::Open => Ok(target),
            current if current == target => Ok(current),
            current => Err(Error::ValidationFailed(format!(
                "finding is already {}, cannot record {}",
                current, decision
            ))),
        }
    }
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Reviewed => write!(f, "reviewed"),
            Self::Overridden => write!(f, "overridden"),
        }
    }
}

/// Reviewer decision on a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    /// The finding is a genuine issue
    Approve,
    /// The finding is a false positive or an acceptable risk
    Override,
}

impl ReviewDecision {
    pub fn resulting_status(&self) -> FindingStatus {
        match self {
            Self::Approve => FindingStatus::Reviewed,
            Self::Override => FindingStatus::Overridden,
        }
    }
}

impl std::fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::Override => write!(f, "OVERRIDE"),
        }
    }
}

/// Display grouping of findings; also selects the review button labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    Mismatch,
    Risk,
}

impl FindingCategory {
    pub fn of(finding_type: &str) -> Self {
        if MISMATCH_FINDING_TYPES.contains(&finding_type) {
            Self::Mismatch
        } else {
            Self::Risk
        }
    }

    /// Button label for a decision on a finding of this category.
    pub fn label(&self, decision: ReviewDecision) -> &'static str {
        match (self, decision) {
            (Self::Mismatch, ReviewDecision::Approve) => "Confirm Issue",
            (Self::Mismatch, ReviewDecision::Override) => "Mark as Safe",
            (Self::Risk, ReviewDecision::Approve) => "Accept Risk",
            (Self::Risk, ReviewDecision::Override) => "Override",
        }
    }
}

/// A single detected issue attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: i64,
    /// Back-reference to the owning document (non-owning).
    pub document_id: i64,
    pub finding_type: String,
    pub severity: Severity,
    pub description: String,
    /// Untyped bag whose keys depend on `finding_type`.
    #[serde(default)]
    pub evidence: JsonValue,
    pub status: FindingStatus,
}

impl Finding {
    pub fn category(&self) -> FindingCategory {
        FindingCategory::of(&self.finding_type)
    }

    pub fn is_open(&self) -> bool {
        self.status == FindingStatus::Open
    }

    /// Whether the evidence bag carries a non-null value under `key`.
    pub fn has_evidence(&self, key: &str) -> bool {
        self.evidence.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn evidence_str(&self, key: &str) -> Option<&str> {
        self.evidence.get(key).and_then(JsonValue::as_str)
    }

    /// Numeric evidence (variance fields, risk score). Numeric strings count.
    pub fn evidence_f64(&self, key: &str) -> Option<f64> {
        match self.evidence.get(key)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Response of `GET /documents/{id}/findings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingList {
    #[serde(default)]
    pub findings: Vec<Finding>,
}

/// Body of `POST /findings/{id}/review`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Response of `POST /documents/{id}/analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub findings_count: Option<u32>,
}

// =============================================================================
// TASK TYPES
// =============================================================================

/// State of a backend job as reported by `GET /tasks/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Success,
    Failure,
    /// `PENDING`, `STARTED`, `RETRY` and anything else non-terminal
    #[serde(other)]
    Running,
}

/// Response of `GET /tasks/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub task_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatus {
    pub fn running(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Running,
            result: None,
            error: None,
        }
    }

    pub fn succeeded(task_id: impl Into<String>, result: JsonValue) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(task_id: impl Into<String>, error: Option<&str>) -> Self {
        Self {
            task_id: task_id.into(),
            state: TaskState::Failure,
            result: None,
            error: error.map(String::from),
        }
    }
}

/// Handle for a submitted asynchronous job. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub document_id: i64,
    pub submitted_at: DateTime<Utc>,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>, document_id: i64) -> Self {
        Self {
            task_id: task_id.into(),
            document_id,
            submitted_at: Utc::now(),
        }
    }
}

// =============================================================================
// RISK ASSESSMENT TYPES
// =============================================================================

/// One clause flagged by risk scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskClause {
    pub clause_type: String,
    #[serde(default)]
    pub risk_score: Option<u8>,
    #[serde(default)]
    pub risk_level: Option<Severity>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub redline_text: Option<String>,
    #[serde(default)]
    pub standard_clause: Option<String>,
}

/// Terminal result of a risk assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub risks: Vec<RiskClause>,
}

impl RiskAssessmentResult {
    /// Interpret a job result payload.
    ///
    /// The payload is either `{status, risks}` or a bare clause array.
    /// A worker that caught its own failure reports `{status: "error",
    /// message}` under a `SUCCESS` state; that is a `TaskFailed`. Anything
    /// else unrecognized yields an empty, successful result (the findings are
    /// re-fetched from the backend regardless).
    pub fn from_task_result(payload: JsonValue) -> Result<Self> {
        if payload.get("status").and_then(JsonValue::as_str) == Some("error") {
            let message = payload
                .get("message")
                .or_else(|| payload.get("error"))
                .and_then(JsonValue::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(defaults::TASK_FAILED_MESSAGE);
            return Err(Error::TaskFailed(message.to_string()));
        }

        match payload {
            JsonValue::Array(_) => Ok(Self {
                status: "success".to_string(),
                risks: serde_json::from_value(payload).unwrap_or_else(|e| {
                    warn!(error = %e, "Unrecognized risk clause list in task result");
                    Vec::new()
                }),
            }),
            JsonValue::Object(_) => {
                let mut result: Self = serde_json::from_value(payload).unwrap_or_else(|e| {
                    warn!(error = %e, "Unrecognized risk assessment payload in task result");
                    Self::default()
                });
                if result.status.is_empty() {
                    result.status = "success".to_string();
                }
                Ok(result)
            }
            _ => Ok(Self {
                status: "success".to_string(),
                risks: Vec::new(),
            }),
        }
    }
}

/// Outcome of submitting a risk assessment: either the result arrived in the
/// response body, or the backend queued a job that must be polled.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskSubmission {
    Immediate(RiskAssessmentResult),
    Queued(TaskHandle),
}

#[derive(Deserialize)]
struct RiskSubmissionWire {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    risks: Option<Vec<RiskClause>>,
    #[serde(default)]
    task_id: Option<String>,
}

impl RiskSubmission {
    /// Classify a `POST /contracts/{id}/risk_assessment` response body.
    ///
    /// A body carrying `risks` is immediate; otherwise a `task_id` means the
    /// job was queued. A body with neither is an immediate empty result.
    pub fn from_response(document_id: i64, body: JsonValue) -> Result<Self> {
        let wire: RiskSubmissionWire = serde_json::from_value(body)?;
        match (wire.risks, wire.task_id) {
            (Some(risks), _) => Ok(Self::Immediate(RiskAssessmentResult {
                status: wire.status.unwrap_or_else(|| "success".to_string()),
                risks,
            })),
            (None, Some(task_id)) if !task_id.is_empty() => {
                Ok(Self::Queued(TaskHandle::new(task_id, document_id)))
            }
            (None, _) if wire.status.as_deref() == Some("queued") => Err(Error::Serialization(
                "risk assessment queued without a task_id".to_string(),
            )),
            (None, _) => Ok(Self::Immediate(RiskAssessmentResult {
                status: wire.status.unwrap_or_else(|| "success".to_string()),
                risks: Vec::new(),
            })),
        }
    }
}

// =============================================================================
// AUDIT TRAIL AND REPORT TYPES
// =============================================================================

/// A recorded review decision (`GET /documents/{id}/audit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub finding_id: i64,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Response of `GET /documents/{id}/audit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    #[serde(default)]
    pub decisions: Vec<ReviewRecord>,
}

/// A finding joined with its review decision in an exported report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFinding {
    #[serde(rename = "type")]
    pub finding_type: String,
    pub severity: Severity,
    pub description: String,
    pub status: FindingStatus,
    #[serde(default)]
    pub review_decision: Option<ReviewDecision>,
    #[serde(default)]
    pub review_comment: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Response of `GET /documents/{id}/report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub document_id: i64,
    pub filename: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub findings: Vec<ReportFinding>,
}

impl DocumentReport {
    /// Findings still awaiting a decision.
    pub fn undecided(&self) -> impl Iterator<Item = &ReportFinding> {
        self.findings.iter().filter(|f| f.review_decision.is_none())
    }
}

/// Headline accuracy metrics of the offline evaluation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationMetrics {
    pub extraction_f1: f64,
    pub mismatch_accuracy: f64,
    pub risk_recall: f64,
}

/// Per-scenario evaluation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDetail {
    pub scenario_id: i64,
    #[serde(default)]
    pub extraction_score: f64,
    #[serde(default)]
    pub found_mismatch: bool,
    #[serde(default)]
    pub expected_mismatch: bool,
    #[serde(default)]
    pub mismatch_correct: bool,
}

/// Response of `GET /evaluation/report`. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(default)]
    pub metrics: EvaluationMetrics,
    #[serde(default)]
    pub details: Vec<EvaluationDetail>,
    #[serde(default)]
    pub timestamp: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub services: HashMap<String, String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice_json() -> JsonValue {
        json!({
            "id": 7,
            "filename": "INV-2024-001_AcmeCorp.pdf",
            "status": "PENDING",
            "doc_type": "invoice",
            "created_at": "2024-03-01T10:15:30.123456",
            "open_findings": 0
        })
    }

    #[test]
    fn test_document_flat_shape_without_payload() {
        let doc: Document = serde_json::from_value(invoice_json()).unwrap();
        assert_eq!(doc.id, 7);
        assert_eq!(doc.doc_type, Some(DocumentType::Invoice));
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(doc.created_at.is_some());
        assert!(doc.extraction.is_none());
    }

    #[test]
    fn test_document_payload_under_result_key() {
        let doc: Document = serde_json::from_value(json!({
            "id": 2,
            "filename": "MSA_Globex_Signed.pdf",
            "status": "REVIEW_NEEDED",
            "result": {"doc_type": "contract", "data": {"party_a": "Globex"}}
        }))
        .unwrap();
        let payload = doc.extraction.expect("payload normalized");
        assert_eq!(payload["data"]["party_a"], "Globex");
        assert_eq!(doc.open_findings, 0);
        assert!(doc.created_at.is_none());
    }

    #[test]
    fn test_document_payload_under_extraction_result_key() {
        let doc: Document = serde_json::from_value(json!({
            "id": 3,
            "filename": "a.pdf",
            "status": "COMPLETED",
            "extraction_result": {"total_amount": 100.0}
        }))
        .unwrap();
        assert_eq!(doc.extraction.unwrap()["total_amount"], 100.0);
    }

    #[test]
    fn test_document_null_result_falls_back() {
        let doc: Document = serde_json::from_value(json!({
            "id": 3,
            "filename": "a.pdf",
            "status": "COMPLETED",
            "result": null,
            "extraction_result": {"k": 1}
        }))
        .unwrap();
        assert_eq!(doc.extraction.unwrap()["k"], 1);
    }

    #[test]
    fn test_document_serializes_canonical_field() {
        let doc: Document = serde_json::from_value(json!({
            "id": 3,
            "filename": "a.pdf",
            "status": "FAILED",
            "result": {"k": 1}
        }))
        .unwrap();
        let out = serde_json::to_value(&doc).unwrap();
        assert_eq!(out["extraction"]["k"], 1);
        assert!(out.get("result").is_none());

        let back: Document = serde_json::from_value(out).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_unknown_doc_type_is_other() {
        let doc: Document = serde_json::from_value(json!({
            "id": 1, "filename": "x.pdf", "status": "COMPLETED", "doc_type": "receipt"
        }))
        .unwrap();
        assert_eq!(doc.doc_type, Some(DocumentType::Other));
        assert!(!doc.supports(DocumentAction::Analyze));
        assert!(!doc.supports(DocumentAction::RiskAssessment));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-03-01T10:15:30Z").is_some());
        assert!(parse_timestamp("2024-03-01T10:15:30+02:00").is_some());
        assert!(parse_timestamp("2024-03-01T10:15:30.5").is_some());
        assert!(parse_timestamp("2024-03-01 10:15:30").is_some());
        assert!(parse_timestamp("N/A").is_none());
    }

    #[test]
    fn test_status_monotonic_transitions() {
        use DocumentStatus::*;
        assert!(Pending.can_advance_to(Processing));
        assert!(Processing.can_advance_to(ReviewNeeded));
        assert!(ReviewNeeded.can_advance_to(Completed));
        assert!(Pending.can_advance_to(Failed));
        assert!(!Processing.can_advance_to(Pending));
        assert!(!ReviewNeeded.can_advance_to(Processing));
        assert!(!Completed.can_advance_to(ReviewNeeded));
        assert!(!Failed.can_advance_to(Completed));
        assert!(Completed.can_advance_to(Completed));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "review_needed".parse::<DocumentStatus>().unwrap(),
            DocumentStatus::ReviewNeeded
        );
        assert!("ARCHIVED".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_doc_type_read_from_extraction_payload() {
        let doc: Document = serde_json::from_value(json!({
            "id": 7,
            "filename": "INV.pdf",
            "status": "COMPLETED",
            "result": {"doc_type": "invoice", "data": {"vendor": "Acme Corp"}}
        }))
        .unwrap();
        assert_eq!(doc.doc_type, Some(DocumentType::Invoice));
        assert!(DocumentAction::Analyze.validate(&doc).is_ok());

        // The top-level key wins.
        let doc: Document = serde_json::from_value(json!({
            "id": 8,
            "filename": "MSA.pdf",
            "status": "REVIEW_NEEDED",
            "doc_type": "contract",
            "extraction_result": {"doc_type": "invoice"}
        }))
        .unwrap();
        assert_eq!(doc.doc_type, Some(DocumentType::Contract));

        let doc: Document = serde_json::from_value(json!({
            "id": 9,
            "filename": "scan.pdf",
            "status": "PROCESSING",
            "result": null
        }))
        .unwrap();
        assert!(doc.doc_type.is_none());
    }

    #[test]
    fn test_action_validation() {
        let invoice: Document = serde_json::from_value(invoice_json()).unwrap();
        assert!(DocumentAction::Analyze.validate(&invoice).is_ok());
        let err = DocumentAction::RiskAssessment.validate(&invoice).unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)));
        assert!(err.to_string().contains("requires document type contract"));

        let unclassified = Document {
            doc_type: None,
            ..invoice
        };
        let err = DocumentAction::Analyze.validate(&unclassified).unwrap_err();
        assert!(err.to_string().contains("not classified"));
    }

    #[test]
    fn test_finding_transitions_are_one_way() {
        use FindingStatus::*;
        assert_eq!(Open.apply(ReviewDecision::Approve).unwrap(), Reviewed);
        assert_eq!(Open.apply(ReviewDecision::Override).unwrap(), Overridden);
        assert_eq!(Reviewed.apply(ReviewDecision::Approve).unwrap(), Reviewed);
        assert_eq!(
            Overridden.apply(ReviewDecision::Override).unwrap(),
            Overridden
        );
        assert!(Reviewed.apply(ReviewDecision::Override).is_err());
        assert!(Overridden.apply(ReviewDecision::Approve).is_err());
    }

    #[test]
    fn test_partition_by_category() {
        assert_eq!(FindingCategory::of("rate_mismatch"), FindingCategory::Mismatch);
        assert_eq!(
            FindingCategory::of("unfair_termination_clause"),
            FindingCategory::Risk
        );
        for t in MISMATCH_FINDING_TYPES {
            assert_eq!(FindingCategory::of(t), FindingCategory::Mismatch);
        }
    }

    #[test]
    fn test_review_labels() {
        assert_eq!(
            FindingCategory::Mismatch.label(ReviewDecision::Override),
            "Mark as Safe"
        );
        assert_eq!(
            FindingCategory::Risk.label(ReviewDecision::Approve),
            "Accept Risk"
        );
    }

    #[test]
    fn test_finding_evidence_bag() {
        let finding: Finding = serde_json::from_value(json!({
            "id": 102,
            "document_id": 2,
            "finding_type": "indemnification_risk",
            "severity": "critical",
            "description": "Unlimited indemnification clause detected.",
            "evidence": {"risk_score": 9, "original": "all losses", "redline": null, "variance": "12.5"},
            "status": "open"
        }))
        .unwrap();
        assert_eq!(finding.category(), FindingCategory::Risk);
        assert!(finding.is_open());
        assert!(finding.has_evidence("original"));
        assert!(!finding.has_evidence("redline"));
        assert!(!finding.has_evidence("missing"));
        assert_eq!(finding.evidence_f64("risk_score"), Some(9.0));
        assert_eq!(finding.evidence_f64("variance"), Some(12.5));
        assert_eq!(finding.evidence_str("original"), Some("all losses"));
    }

    #[test]
    fn test_finding_without_evidence() {
        let finding: Finding = serde_json::from_value(json!({
            "id": 103, "document_id": 2, "finding_type": "missing_po",
            "severity": "medium", "description": "PO missing", "status": "open"
        }))
        .unwrap();
        assert!(finding.evidence.is_null());
        assert!(!finding.has_evidence("anything"));
    }

    #[test]
    fn test_severity_is_ordinal() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_review_request_serialization() {
        let req = ReviewRequest {
            decision: ReviewDecision::Override,
            comment: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"decision": "OVERRIDE"})
        );
    }

    #[test]
    fn test_task_state_unknown_is_running() {
        let status: TaskStatus =
            serde_json::from_value(json!({"task_id": "t1", "state": "STARTED"})).unwrap();
        assert_eq!(status.state, TaskState::Running);
        let status: TaskStatus =
            serde_json::from_value(json!({"task_id": "t1", "state": "PENDING"})).unwrap();
        assert_eq!(status.state, TaskState::Running);
        let status: TaskStatus = serde_json::from_value(
            json!({"task_id": "t1", "state": "FAILURE", "error": "model timeout"}),
        )
        .unwrap();
        assert_eq!(status.state, TaskState::Failure);
        assert_eq!(status.error.as_deref(), Some("model timeout"));
    }

    #[test]
    fn test_risk_submission_immediate() {
        let sub = RiskSubmission::from_response(
            4,
            json!({
                "status": "success",
                "risks": [{
                    "clause_type": "Liability Cap",
                    "risk_score": 8,
                    "risk_level": "high",
                    "explanation": "uncapped",
                    "original_text": "no limit"
                }]
            }),
        )
        .unwrap();
        match sub {
            RiskSubmission::Immediate(result) => {
                assert_eq!(result.risks.len(), 1);
                assert_eq!(result.risks[0].risk_level, Some(Severity::High));
            }
            other => panic!("expected immediate, got {:?}", other),
        }
    }

    #[test]
    fn test_risk_submission_queued() {
        let sub = RiskSubmission::from_response(
            4,
            json!({"status": "queued", "task_id": "task_4242"}),
        )
        .unwrap();
        match sub {
            RiskSubmission::Queued(handle) => {
                assert_eq!(handle.task_id, "task_4242");
                assert_eq!(handle.document_id, 4);
            }
            other => panic!("expected queued, got {:?}", other),
        }
    }

    #[test]
    fn test_risk_submission_queued_without_task_id_is_error() {
        let err = RiskSubmission::from_response(4, json!({"status": "queued"})).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_risk_result_from_task_payload() {
        let empty = RiskAssessmentResult::from_task_result(json!({})).unwrap();
        assert_eq!(empty.status, "success");
        assert!(empty.risks.is_empty());

        let array = RiskAssessmentResult::from_task_result(json!([
            {"clause_type": "Termination", "explanation": "one-sided"}
        ]))
        .unwrap();
        assert_eq!(array.risks.len(), 1);

        let counted = RiskAssessmentResult::from_task_result(
            json!({"status": "success", "document_id": 4, "findings_count": 3}),
        )
        .unwrap();
        assert_eq!(counted.status, "success");

        let null = RiskAssessmentResult::from_task_result(JsonValue::Null).unwrap();
        assert!(null.risks.is_empty());
    }

    #[test]
    fn test_worker_error_result_is_task_failure() {
        let err = RiskAssessmentResult::from_task_result(
            json!({"status": "error", "message": "Document 4 not found"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TaskFailed(ref m) if m == "Document 4 not found"));

        let err = RiskAssessmentResult::from_task_result(json!({"status": "error"})).unwrap_err();
        assert!(matches!(err, Error::TaskFailed(ref m) if m == "Task failed"));
    }

    #[test]
    fn test_report_and_audit_shapes() {
        let report: DocumentReport = serde_json::from_value(json!({
            "document_id": 2,
            "filename": "MSA.pdf",
            "status": "REVIEW_NEEDED",
            "findings": [
                {"type": "term_mismatch", "severity": "high", "description": "d",
                 "status": "reviewed", "review_decision": "APPROVE",
                 "reviewed_by": "user_123", "reviewed_at": "2024-03-01T10:00:00"},
                {"type": "missing_po", "severity": "low", "description": "d",
                 "status": "open", "review_decision": null}
            ]
        }))
        .unwrap();
        assert_eq!(report.undecided().count(), 1);

        let audit: AuditLog = serde_json::from_value(json!({
            "decisions": [{"id": 1, "finding_id": 101, "decision": "OVERRIDE", "comment": "ok"}]
        }))
        .unwrap();
        assert_eq!(audit.decisions[0].decision, ReviewDecision::Override);
    }

    #[test]
    fn test_evaluation_report_fallback_shape() {
        let report: EvaluationReport = serde_json::from_value(json!({
            "metrics": {"extraction_f1": 0, "mismatch_accuracy": 0, "risk_recall": 0},
            "details": [],
            "timestamp": "N/A"
        }))
        .unwrap();
        assert_eq!(report.metrics.extraction_f1, 0.0);
        assert!(report.details.is_empty());
    }
}
