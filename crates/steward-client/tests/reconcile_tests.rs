//! HTTP-level reconciliation tests against a mock Splunk API.
//!
//! These pin the externally observable contract: which routes are called,
//! with which payloads, and that dry runs never touch a mutating route.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use steward_client::{SplunkClient, SplunkConfig};
use steward_core::models::finding::Finding;
use steward_core::models::investigation::Investigation;
use steward_core::models::investigation_type::InvestigationTypeSpec;
use steward_core::models::plan::{Phase, ResponsePlan, Task};
use steward_core::{SplunkError, TaskRequest};

const FINDINGS_PATH: &str = "/servicesNS/nobody/SplunkEnterpriseSecuritySuite/public/v2/findings";
const FINDING_REF: &str = "2008e99d-af14-4fec-89da-b9b17a81820a@@notable@@time1768225865";
const FINDING_REF_ENCODED: &str =
    "2008e99d-af14-4fec-89da-b9b17a81820a%40%40notable%40%40time1768225865";
const INVESTIGATIONS_PATH: &str = "/servicesNS/nobody/missioncontrol/public/v2/investigations";
const TEMPLATES_PATH: &str = "/servicesNS/nobody/missioncontrol/v1/responsetemplates";

fn client_for(server: &MockServer) -> SplunkClient {
    SplunkClient::new(SplunkConfig::new(server.uri())).unwrap()
}

fn api_finding(status: &str) -> serde_json::Value {
    json!({
        "finding_id": FINDING_REF,
        "rule_title": "T",
        "rule_description": "D",
        "security_domain": "access",
        "risk_object": "e",
        "risk_object_type": "user",
        "risk_score": "50.0",
        "owner": "admin",
        "status": status,
        "urgency": "high",
        "disposition": "disposition:1"
    })
}

#[tokio::test]
async fn test_finding_create() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FINDINGS_PATH))
        .and(query_param("output_mode", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_finding("1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = Finding {
        title: Some("T".into()),
        description: Some("D".into()),
        security_domain: Some("access".into()),
        entity: Some("e".into()),
        entity_type: Some("user".into()),
        finding_score: Some(50),
        ..Finding::default()
    };
    let outcome = steward_client::FindingsApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap();

    assert!(outcome.changed);
    assert!(outcome.before.is_none());
    let after = outcome.after.unwrap();
    assert_eq!(after.title.as_deref(), Some("T"));
    assert_eq!(after.finding_score, Some(50));

    // The create payload uses API key names and carries the fixed app.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["rule_title"], "T");
    assert_eq!(body["app"], "SplunkEnterpriseSecuritySuite");
}

#[tokio::test]
async fn test_finding_create_missing_fields_is_local_error() {
    let server = MockServer::start().await;
    // No mocks mounted: validation must fail before any request.
    let client = client_for(&server);
    let desired = Finding {
        title: Some("T".into()),
        ..Finding::default()
    };
    let err = steward_client::FindingsApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap_err();
    assert!(matches!(err, SplunkError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_finding_update_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{FINDINGS_PATH}/{FINDING_REF_ENCODED}")))
        .and(query_param("earliest", "1768225865"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_finding("4")))
        .mount(&server)
        .await;
    // The update route must never fire when the state already matches.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = Finding {
        ref_id: Some(FINDING_REF.into()),
        status: Some("resolved".into()),
        ..Finding::default()
    };
    let outcome = steward_client::FindingsApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap();
    assert!(!outcome.changed);
    assert_eq!(outcome.before, outcome.after);
}

#[tokio::test]
async fn test_finding_update_posts_translated_diff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{FINDINGS_PATH}/{FINDING_REF_ENCODED}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_finding("1")))
        .mount(&server)
        .await;
    let update_path = format!(
        "/servicesNS/nobody/missioncontrol/v1/investigations/{FINDING_REF_ENCODED}"
    );
    Mock::given(method("POST"))
        .and(path(update_path))
        .and(query_param("notable_time", "1768225865"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = Finding {
        ref_id: Some(FINDING_REF.into()),
        status: Some("resolved".into()),
        owner: Some("analyst".into()),
        ..Finding::default()
    };
    let outcome = steward_client::FindingsApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.after.unwrap().status.as_deref(), Some("resolved"));

    let requests = server.received_requests().await.unwrap();
    let update = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&update.body).unwrap();
    // Status goes over the wire as its numeric code; owner as assignee.
    assert_eq!(body["status"], "4");
    assert_eq!(body["assignee"], "analyst");
    // Fields that were not requested stay out of the payload.
    assert!(body.get("urgency").is_none());
}

#[tokio::test]
async fn test_finding_dry_run_never_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{FINDINGS_PATH}/{FINDING_REF_ENCODED}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_finding("1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = Finding {
        ref_id: Some(FINDING_REF.into()),
        status: Some("resolved".into()),
        ..Finding::default()
    };
    let outcome = steward_client::FindingsApi::new(&client)
        .apply(&desired, true)
        .await
        .unwrap();
    // Same changed verdict a real run would produce, zero mutating calls.
    assert!(outcome.changed);
    assert_eq!(outcome.after.unwrap().status.as_deref(), Some("resolved"));
}

#[tokio::test]
async fn test_investigation_finding_ids_merge_is_additive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INVESTIGATIONS_PATH))
        .and(query_param("ids", "guid-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "investigation_guid": "guid-1",
            "name": "Case",
            "status": "1",
            "consolidated_findings": {"event_id": "f1"}
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{INVESTIGATIONS_PATH}/guid-1/findings")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = Investigation {
        ref_id: Some("guid-1".into()),
        finding_ids: vec!["f1".into(), "f2".into()],
        ..Investigation::default()
    };
    let outcome = steward_client::InvestigationsApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(
        outcome.after.unwrap().finding_ids,
        vec!["f1".to_string(), "f2".to_string()]
    );

    // Only the new id goes over the wire.
    let requests = server.received_requests().await.unwrap();
    let attach = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&attach.body).unwrap();
    assert_eq!(body["finding_ids"], json!(["f2"]));
}

#[tokio::test]
async fn test_form_bodies_are_urlencoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/legacy/endpoint"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .post_form(
            "services/legacy/endpoint",
            &[],
            &[("rule_title".to_string(), "a b&c".to_string())],
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("Content-Type")
        .map(|v| v.to_str().unwrap_or("").to_string())
        .unwrap_or_default();
    assert_eq!(content_type, "application/x-www-form-urlencoded");
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("rule_title=a+b%26c"));
}

#[tokio::test]
async fn test_mc_0050_body_reads_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/servicesNS/nobody/missioncontrol/v1/incidenttypes/Ransomware",
        ))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "MC_0050",
            "message": "resource missing"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/servicesNS/nobody/missioncontrol/v1/incidenttypes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "incident_type": "Ransomware",
            "description": "Encryption events"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let spec = InvestigationTypeSpec {
        name: "Ransomware".into(),
        description: Some("Encryption events".into()),
        response_plan_ids: None,
    };
    // The 500 is classified as "absent", so apply falls through to create.
    let outcome = steward_client::InvestigationTypesApi::new(&client)
        .apply(&spec, false)
        .await
        .unwrap();
    assert!(outcome.changed);
    assert!(outcome.before.is_none());
}

fn existing_plan_json() -> serde_json::Value {
    json!({"items": [{
        "id": "rp-001",
        "name": "Incident Response",
        "description": "Standard procedure",
        "template_status": "published",
        "phases": [
            {"id": "phase-a", "name": "A", "order": 1, "tasks": [
                {"id": "task-a1", "name": "t1", "description": "", "is_note_required": false,
                 "owner": "unassigned", "suggestions": {"searches": []}}
            ]},
            {"id": "phase-b", "name": "B", "order": 2, "tasks": []},
            {"id": "phase-c", "name": "C", "order": 3, "tasks": []}
        ]
    }]})
}

#[tokio::test]
async fn test_response_plan_update_is_full_replacement() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TEMPLATES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(existing_plan_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{TEMPLATES_PATH}/rp-001")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = ResponsePlan {
        name: "Incident Response".into(),
        description: "Standard procedure".into(),
        template_status: "published".into(),
        phases: vec![
            Phase {
                name: "A".into(),
                tasks: vec![Task {
                    name: "t1".into(),
                    description: String::new(),
                    is_note_required: false,
                    owner: "unassigned".into(),
                    searches: vec![],
                }],
            },
            Phase {
                name: "B".into(),
                tasks: vec![],
            },
        ],
    };
    let outcome = steward_client::ResponsePlansApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap();
    assert!(outcome.changed);

    let requests = server.received_requests().await.unwrap();
    let update = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&update.body).unwrap();
    // Phase C is simply gone from the replacement payload; A and B keep
    // their server ids, and the matched task keeps its id too.
    let phases = body["phases"].as_array().unwrap();
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[0]["id"], "phase-a");
    assert_eq!(phases[1]["id"], "phase-b");
    assert_eq!(phases[0]["tasks"][0]["id"], "task-a1");
    assert_eq!(body["id"], "rp-001");
}

#[tokio::test]
async fn test_response_plan_apply_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TEMPLATES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(existing_plan_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let desired = ResponsePlan {
        name: "Incident Response".into(),
        description: "Standard procedure".into(),
        template_status: "published".into(),
        phases: vec![
            Phase {
                name: "A".into(),
                tasks: vec![Task {
                    name: "t1".into(),
                    description: String::new(),
                    is_note_required: false,
                    owner: "unassigned".into(),
                    searches: vec![],
                }],
            },
            Phase {
                name: "B".into(),
                tasks: vec![],
            },
            Phase {
                name: "C".into(),
                tasks: vec![],
            },
        ],
    };
    let outcome = steward_client::ResponsePlansApi::new(&client)
        .apply(&desired, false)
        .await
        .unwrap();
    assert!(!outcome.changed);
}

#[tokio::test]
async fn test_response_plan_remove_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TEMPLATES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = steward_client::ResponsePlansApi::new(&client)
        .remove("Incident Response", false)
        .await
        .unwrap();
    assert!(!outcome.changed);
    assert!(outcome.before.is_none());
    assert!(outcome.after.is_none());
}

#[tokio::test]
async fn test_execution_apply_is_idempotent_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TEMPLATES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
            {"id": "11111111-2222-3333-4444-555555555555", "name": "Incident Response"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/servicesNS/nobody/missioncontrol/v1/incidents/inv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "inv-1",
            "response_plans": [{"id": "applied-1", "name": "Incident Response", "phases": []}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = steward_client::ExecutionsApi::new(&client)
        .apply("inv-1", "Incident Response", &[], false)
        .await
        .unwrap();
    assert!(!outcome.changed);
    assert!(outcome.before.applied);
    assert_eq!(outcome.before.applied_plan_id.as_deref(), Some("applied-1"));
}

#[tokio::test]
async fn test_execution_task_updates_only_what_differs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TEMPLATES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
            {"id": "tpl-1", "name": "Incident Response"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/servicesNS/nobody/missioncontrol/v1/incidents/inv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "inv-1",
            "response_plans": [{
                "id": "applied-1",
                "name": "Incident Response",
                "phases": [{
                    "id": "ph-1",
                    "name": "Triage",
                    "tasks": [{
                        "id": "tk-1",
                        "name": "Review",
                        "status": "Pending",
                        "owner": "analyst"
                    }]
                }]
            }]
        })))
        .mount(&server)
        .await;
    let task_path =
        "/servicesNS/nobody/missioncontrol/v1/incidents/inv-1/responseplans/applied-1/phase/ph-1/tasks/tk-1";
    Mock::given(method("POST"))
        .and(path(task_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tasks = vec![
        TaskRequest {
            phase_name: "Triage".into(),
            task_name: "Review".into(),
            status: Some("started".into()),
            // Owner already matches; it must stay out of the payload.
            owner: Some("analyst".into()),
        },
        TaskRequest {
            phase_name: "Missing".into(),
            task_name: "Nope".into(),
            status: Some("started".into()),
            owner: None,
        },
    ];
    let outcome = steward_client::ExecutionsApi::new(&client)
        .apply("inv-1", "Incident Response", &tasks, false)
        .await
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.tasks_updated.len(), 2);
    assert!(outcome.tasks_updated[0].changed);
    assert_eq!(outcome.tasks_updated[0].status.as_deref(), Some("started"));
    // A lookup miss is reported per task, not as an overall failure.
    assert!(!outcome.tasks_updated[1].changed);
    assert!(outcome.tasks_updated[1]
        .error
        .as_deref()
        .unwrap()
        .contains("phase 'Missing' not found"));

    let requests = server.received_requests().await.unwrap();
    let update = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&update.body).unwrap();
    assert_eq!(body["status"], "Started");
    assert!(body.get("owner").is_none());
}
