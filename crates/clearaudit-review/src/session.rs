//! An open document view.
//!
//! Every poll started through a session shares the session's cancellation
//! token, so closing (or dropping) the session stops them all and none of
//! them writes to the store afterwards.

use tracing::debug;

use clearaudit_core::{Document, Finding, Result, ReviewDecision, RiskAssessmentResult};
use clearaudit_jobs::CancelToken;

use crate::orchestrator::ReviewOrchestrator;

pub struct DocumentSession {
    orchestrator: ReviewOrchestrator,
    document_id: i64,
    pdf_url: Option<String>,
    cancel: CancelToken,
}

impl DocumentSession {
    pub(crate) fn new(
        orchestrator: ReviewOrchestrator,
        document_id: i64,
        pdf_url: Option<String>,
    ) -> Self {
        Self {
            orchestrator,
            document_id,
            pdf_url,
            cancel: CancelToken::new(),
        }
    }

    pub fn document_id(&self) -> i64 {
        self.document_id
    }

    /// Current store copy of the document.
    pub fn document(&self) -> Option<Document> {
        self.orchestrator.store().document(self.document_id)
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.orchestrator
            .store()
            .findings(self.document_id)
            .unwrap_or_default()
    }

    /// PDF preview URL, if the backend provided one on open.
    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn analyze(&self) -> Result<Vec<Finding>> {
        self.orchestrator.analyze(self.document_id).await
    }

    /// Risk assessment whose poll ends when the session closes.
    pub async fn assess_risk(&self) -> Result<RiskAssessmentResult> {
        self.orchestrator
            .assess_risk_with(self.document_id, &self.cancel)
            .await
    }

    pub async fn review(
        &self,
        finding_id: i64,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<Finding> {
        self.orchestrator
            .review_finding(finding_id, decision, comment)
            .await
    }

    /// Re-fetch the document and its findings.
    pub async fn recheck(&self) -> Result<(Document, Vec<Finding>)> {
        self.orchestrator.reload(self.document_id).await
    }

    /// Token shared by this session's polls; cancelling it closes the session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn close(self) {
        // Drop does the work.
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!(document_id = self.document_id, "Closing document session");
            self.cancel.cancel();
        }
    }
}
