//! Handlers for the submission workflow endpoints.
//!
//! Request validation runs before any transaction opens; everything
//! stateful is delegated to the workflow engine.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use trialgate_core::patient::PatientSnapshot;
use trialgate_core::types::DbId;
use trialgate_core::workflow::ReviewType;
use validator::Validate;

use crate::engine::workflow;
use crate::error::AppResult;
use crate::middleware::principal::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for POST /submissions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    pub trial_id: DbId,
    pub principal_investigator_id: DbId,
    /// Frozen eligibility snapshots supplied by the caller; the engine
    /// never re-derives them from the scoring service.
    #[validate(length(min = 1, message = "patients must not be empty"))]
    pub patients: Vec<PatientSnapshot>,
    pub notes: Option<String>,
    pub report_data: Option<serde_json::Value>,
}

/// Body for PUT /submissions/{id}/approve-patient.
#[derive(Debug, Deserialize, Validate)]
pub struct ApprovePatientRequest {
    #[validate(length(min = 1, message = "patient_id must not be empty"))]
    pub patient_id: String,
    pub approved: bool,
    pub comment: Option<String>,
}

/// Body for PUT /submissions/{id}/approve-bulk.
#[derive(Debug, Deserialize, Validate)]
pub struct ApproveBulkRequest {
    #[validate(length(min = 1, message = "patient_ids must not be empty"))]
    pub patient_ids: Vec<String>,
    pub approved: bool,
    pub comment: Option<String>,
}

/// Body for PUT /submissions/{id}/approve-all.
#[derive(Debug, Deserialize)]
pub struct ApproveAllRequest {
    /// Decision applied to the whole roster; defaults to approval.
    #[serde(default = "default_true")]
    pub approved: bool,
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Body for POST /submissions/{id}/review.
#[derive(Debug, Deserialize)]
pub struct ReviewNoteRequest {
    /// One of `general_comment`, `request_info`, `document_approval`.
    pub review_type: String,
    pub patient_id: Option<String>,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/submissions
pub async fn create_submission(
    principal: Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateSubmissionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let detail = workflow::create_submission(
        &state.pool,
        &principal,
        input.trial_id,
        input.principal_investigator_id,
        input.patients,
        input.notes,
        input.report_data,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/submissions
///
/// Role-scoped listing: investigators see received submissions,
/// sponsors their organization's sent ones.
pub async fn list_submissions(
    principal: Principal,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let submissions = workflow::list_visible_to(&state.pool, &principal).await?;
    Ok(Json(DataResponse { data: submissions }))
}

/// GET /api/v1/submissions/{id}
pub async fn get_submission(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = workflow::get_submission(&state.pool, &principal, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/submissions/{id}/approve-patient
pub async fn approve_patient(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ApprovePatientRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let submission = workflow::decide_patients(
        &state.pool,
        &principal,
        id,
        vec![input.patient_id],
        input.approved,
        input.comment,
    )
    .await?;

    Ok(Json(DataResponse { data: submission }))
}

/// PUT /api/v1/submissions/{id}/approve-bulk
pub async fn approve_bulk(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ApproveBulkRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let submission = workflow::decide_patients(
        &state.pool,
        &principal,
        id,
        input.patient_ids,
        input.approved,
        input.comment,
    )
    .await?;

    Ok(Json(DataResponse { data: submission }))
}

/// PUT /api/v1/submissions/{id}/approve-all
pub async fn approve_all(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ApproveAllRequest>,
) -> AppResult<impl IntoResponse> {
    let submission = workflow::decide_all_patients(
        &state.pool,
        &principal,
        id,
        input.approved,
        input.comment,
    )
    .await?;

    Ok(Json(DataResponse { data: submission }))
}

/// POST /api/v1/submissions/{id}/review
pub async fn add_review_note(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewNoteRequest>,
) -> AppResult<impl IntoResponse> {
    let review_type = ReviewType::parse(&input.review_type)?;

    workflow::add_review_note(
        &state.pool,
        &principal,
        id,
        review_type,
        input.patient_id,
        input.comment,
    )
    .await?;

    Ok(StatusCode::CREATED)
}

/// POST /api/v1/submissions/{id}/withdraw
pub async fn withdraw_submission(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let submission = workflow::withdraw_submission(&state.pool, &principal, id).await?;
    Ok(Json(DataResponse { data: submission }))
}
