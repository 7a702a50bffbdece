//! Lifecycle events broadcast by the orchestrator.

use serde::Serialize;

use clearaudit_core::FindingStatus;

/// Event emitted after a lifecycle step completes or fails.
///
/// Presentation layers subscribe through
/// [`ReviewOrchestrator::events`](crate::ReviewOrchestrator::events).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The document collection was replaced by a fresh snapshot.
    DocumentsRefreshed { count: usize },
    DocumentUploaded { document_id: i64, filename: String },
    /// Invoice matching finished and findings were reloaded.
    AnalysisCompleted { document_id: i64, open_findings: u32 },
    RiskAssessmentQueued { document_id: i64, task_id: String },
    RiskAssessmentCompleted { document_id: i64, risks: usize },
    FindingReviewed {
        finding_id: i64,
        document_id: i64,
        status: FindingStatus,
    },
    /// A mutating action was rejected; local state is unchanged.
    ActionFailed {
        document_id: Option<i64>,
        op: &'static str,
        error: String,
    },
}
