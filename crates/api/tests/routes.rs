//! End-to-end route tests through the full middleware stack.
//!
//! Requests are driven with `tower::ServiceExt::oneshot` against the
//! same router the binary serves. Tokens are signed locally with the
//! test secret; seed data from the migrations provides the tenants
//! (trial 1 belongs to organization 1, investigator 1 is active).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use trialgate_api::auth::jwt::{generate_token, JwtConfig};
use trialgate_api::config::ServerConfig;
use trialgate_api::router::build_app_router;
use trialgate_api::state::AppState;
use trialgate_core::roles::{ROLE_AUDITOR, ROLE_INVESTIGATOR, ROLE_SPONSOR};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "route-test-secret".to_string(),
            expiry_mins: 5,
        },
    }
}

fn app(pool: PgPool) -> (Router, ServerConfig) {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    (build_app_router(state, &config), config)
}

fn sponsor_token(config: &ServerConfig) -> String {
    generate_token(&config.jwt, 2, ROLE_SPONSOR, Some(1), None).unwrap()
}

fn investigator_token(config: &ServerConfig, investigator_id: i64) -> String {
    generate_token(&config.jwt, 10, ROLE_INVESTIGATOR, None, Some(investigator_id)).unwrap()
}

fn auditor_token(config: &ServerConfig) -> String {
    generate_token(&config.jwt, 3, ROLE_AUDITOR, Some(1), None).unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn snapshot(patient_id: &str) -> Value {
    json!({
        "patient_id": patient_id,
        "age": 57,
        "gender": "M",
        "eligibility": "eligible",
        "confidence": 0.88,
        "reasons": ["meets inclusion criteria"],
    })
}

async fn create_submission(app: &Router, token: &str, patient_ids: &[&str]) -> i64 {
    let patients: Vec<Value> = patient_ids.iter().map(|id| snapshot(id)).collect();
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/submissions",
        Some(token),
        Some(json!({
            "trial_id": 1,
            "principal_investigator_id": 1,
            "patients": patients,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    body["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Authentication boundary
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_is_public(pool: PgPool) {
    let (app, _) = app(pool);
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submissions_require_a_token(pool: PgPool) {
    let (app, _) = app(pool);
    let (status, _) = send(&app, Method::GET, "/api/v1/submissions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Review flow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn full_review_flow_reaches_approved_with_a_valid_chain(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let investigator = investigator_token(&config, 1);
    let auditor = auditor_token(&config);

    let id = create_submission(&app, &sponsor, &["PT-001", "PT-002"]).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/submissions/{id}/approve-all"),
        Some(&investigator),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["data"]["status"], "approved");

    // Two audited actions so far: creation and the bulk decision.
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/audit/verify-integrity",
        Some(&auditor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["entries_checked"], 2);

    let (status, body) = send(&app, Method::GET, "/api/v1/audit/logs", Some(&auditor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn single_decision_moves_to_under_review(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let investigator = investigator_token(&config, 1);

    let id = create_submission(&app, &sponsor, &["PT-001", "PT-002"]).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/submissions/{id}/approve-patient"),
        Some(&investigator),
        Some(json!({ "patient_id": "PT-001", "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["data"]["status"], "under_review");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn decisions_on_unknown_patients_are_rejected(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let investigator = investigator_token(&config, 1);

    let id = create_submission(&app, &sponsor, &["PT-001"]).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/submissions/{id}/approve-bulk"),
        Some(&investigator),
        Some(json!({ "patient_ids": ["PT-001", "PT-404"], "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn withdrawn_submissions_refuse_decisions(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let investigator = investigator_token(&config, 1);

    let id = create_submission(&app, &sponsor, &["PT-001"]).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/submissions/{id}/withdraw"),
        Some(&sponsor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/submissions/{id}/approve-all"),
        Some(&investigator),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn review_notes_never_carry_patient_decisions(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let investigator = investigator_token(&config, 1);

    let id = create_submission(&app, &sponsor, &["PT-001"]).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/submissions/{id}/review"),
        Some(&investigator),
        Some(json!({ "review_type": "general_comment", "comment": "protocol deviation noted" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Decision types are reserved for the approve endpoints.
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/submissions/{id}/review"),
        Some(&investigator),
        Some(json!({ "review_type": "patient_approval", "patient_id": "PT-001" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cross_tenant_submissions_read_as_not_found(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let id = create_submission(&app, &sponsor, &["PT-001"]).await;

    // Organization 2's sponsor must not learn the submission exists.
    let other_sponsor = generate_token(&config.jwt, 4, ROLE_SPONSOR, Some(2), None).unwrap();
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/submissions/{id}"),
        Some(&other_sponsor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_investigator_is_forbidden(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);
    let id = create_submission(&app, &sponsor, &["PT-001"]).await;

    let other = investigator_token(&config, 2);
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/submissions/{id}/approve-all"),
        Some(&other),
        Some(json!({ "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn investigators_have_no_audit_view(pool: PgPool) {
    let (app, config) = app(pool);
    let investigator = investigator_token(&config, 1);
    let (status, _) = send(&app, Method::GET, "/api/v1/audit/logs", Some(&investigator), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_sponsors_create_submissions(pool: PgPool) {
    let (app, config) = app(pool);
    let investigator = investigator_token(&config, 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(&investigator),
        Some(json!({
            "trial_id": 1,
            "principal_investigator_id": 1,
            "patients": [snapshot("PT-001")],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inactive_investigators_cannot_receive_submissions(pool: PgPool) {
    let (app, config) = app(pool);
    let sponsor = sponsor_token(&config);

    // Investigator 2 is seeded as inactive.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/submissions",
        Some(&sponsor),
        Some(json!({
            "trial_id": 1,
            "principal_investigator_id": 2,
            "patients": [snapshot("PT-001")],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
