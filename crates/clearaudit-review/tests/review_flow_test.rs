//! End-to-end lifecycle tests: orchestrator and HTTP backend against a mock
//! audit API.

use std::sync::Arc;

use clearaudit_client::{ClientConfig, HttpBackend};
use clearaudit_review::{
    AuditStore, DocumentStatus, Error, FindingStatus, PollConfig, ReviewDecision,
    ReviewOrchestrator,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator_for(server: &MockServer) -> ReviewOrchestrator {
    let backend = HttpBackend::new(ClientConfig::default().with_base_url(server.uri()))
        .expect("Failed to create backend");
    ReviewOrchestrator::new(
        Arc::new(backend),
        AuditStore::new(),
        PollConfig::default().with_interval(10).with_max_attempts(5),
    )
}

fn finding_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "document_id": 7,
        "finding_type": "rate_mismatch",
        "severity": "high",
        "description": "Billed rate $150/hr exceeds contracted $125/hr",
        "evidence": {"invoice_rate": 150, "contract_rate": 125, "variance": 0.2},
        "status": status
    })
}

async fn mount_document_list(server: &MockServer, documents: Value) {
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "documents": documents })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dashboard/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processing": 0, "needs_review": 1, "completed": 0,
            "failed": 0, "open_findings": 1, "total": 1
        })))
        .mount(server)
        .await;
}

async fn mount_invoice(server: &MockServer) {
    mount_document_list(
        server,
        json!([{"id": 7, "filename": "INV-2024-007.pdf", "doc_type": "invoice",
                "status": "REVIEW_NEEDED", "created_at": "2024-03-01T10:00:00", "open_findings": 1}]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/documents/7/extraction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "filename": "INV-2024-007.pdf", "doc_type": "invoice",
            "status": "REVIEW_NEEDED", "open_findings": 1,
            "result": {"vendor": "Acme Corp", "total_amount": 4200.0}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/7/pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"url": "https://files.test/7.pdf"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_review_override_round_trip() {
    let server = MockServer::start().await;
    mount_invoice(&server).await;

    // First fetch shows the finding open, later fetches show the stored decision.
    Mock::given(method("GET"))
        .and(path("/documents/7/findings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"findings": [finding_json(42, "open")]})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/7/findings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"findings": [finding_json(42, "overridden")]})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/findings/42/review"))
        .and(body_json(json!({"decision": "OVERRIDE"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let orch = orchestrator_for(&server);
    orch.refresh().await.unwrap();
    let session = orch.open_document(7).await.unwrap();

    assert_eq!(session.pdf_url(), Some("https://files.test/7.pdf"));
    assert_eq!(
        session.document().unwrap().extraction.unwrap()["vendor"],
        "Acme Corp"
    );
    assert_eq!(orch.store().open_findings(7), 1);

    let updated = session
        .review(42, ReviewDecision::Override, None)
        .await
        .unwrap();

    assert_eq!(updated.status, FindingStatus::Overridden);
    assert_eq!(session.findings()[0].status, FindingStatus::Overridden);
    assert_eq!(orch.store().open_findings(7), 0);
    assert_eq!(orch.dashboard().stats().open_findings, 0);
}

#[tokio::test]
async fn test_rejected_review_keeps_finding_open() {
    let server = MockServer::start().await;
    mount_invoice(&server).await;
    Mock::given(method("GET"))
        .and(path("/documents/7/findings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"findings": [finding_json(42, "open")]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/findings/42/review"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"detail": [{"msg": "invalid decision"}]})),
        )
        .mount(&server)
        .await;

    let orch = orchestrator_for(&server);
    let session = orch.open_document(7).await.unwrap();

    let err = session
        .review(42, ReviewDecision::Approve, Some("looks right".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RequestFailed(ref m) if m.contains("invalid decision")));
    assert_eq!(orch.store().finding(42).unwrap().status, FindingStatus::Open);
}

#[tokio::test]
async fn test_queued_risk_failure_leaves_status_unchanged() {
    let server = MockServer::start().await;
    mount_document_list(
        &server,
        json!([{"id": 4, "filename": "MSA_Globex_Signed.pdf", "doc_type": "contract",
                "status": "PROCESSING", "open_findings": 0}]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/contracts/4/risk_assessment"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "queued", "task_id": "t-4"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-4/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t-4", "state": "FAILURE", "error": "model timeout"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orch = orchestrator_for(&server);
    orch.refresh().await.unwrap();
    let before = orch.store().document(4).unwrap();

    let err = orch.assess_risk(4).await.unwrap_err();

    assert!(matches!(err, Error::TaskFailed(ref m) if m == "model timeout"));
    assert_eq!(orch.store().document(4).unwrap(), before);
    assert_eq!(before.status, DocumentStatus::Processing);
}

#[tokio::test]
async fn test_queued_risk_success_after_pending() {
    let server = MockServer::start().await;
    mount_document_list(
        &server,
        json!([{"id": 4, "filename": "MSA_Globex_Signed.pdf", "doc_type": "contract",
                "status": "PROCESSING", "open_findings": 0}]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/contracts/4/risk_assessment"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "queued", "task_id": "t-5"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-5/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task_id": "t-5", "state": "PENDING"})),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t-5/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "t-5", "state": "SUCCESS",
            "result": {"status": "success", "risks": [
                {"clause_type": "Unfair Termination", "risk_score": 9, "risk_level": "critical",
                 "explanation": "Vendor may terminate without notice"}
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/4/extraction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "filename": "MSA_Globex_Signed.pdf", "doc_type": "contract",
            "status": "REVIEW_NEEDED"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents/4/findings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"findings": [{
            "id": 400, "document_id": 4, "finding_type": "unfair_termination_clause",
            "severity": "critical", "description": "Termination without notice",
            "evidence": {"original_text": "at any time", "redline_text": "with 30 days notice"},
            "status": "open"
        }]})))
        .mount(&server)
        .await;

    let orch = orchestrator_for(&server);
    orch.refresh().await.unwrap();

    let result = orch.assess_risk(4).await.unwrap();

    assert_eq!(result.risks.len(), 1);
    let findings = orch.store().findings(4).unwrap();
    assert_eq!(findings.len(), 1);
    assert!(findings[0].has_evidence("redline_text"));
    assert_eq!(orch.store().open_findings(4), 1);
}
