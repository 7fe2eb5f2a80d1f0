//! Handlers for audit trail endpoints: org-scoped log queries, CSV
//! export, and chain verification.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use trialgate_core::error::CoreError;
use trialgate_core::types::DbId;
use trialgate_db::models::audit::{AuditLogPage, AuditQuery};
use trialgate_db::repositories::{AuditRepo, OrganizationRepo};

use crate::engine::audit as audit_engine;
use crate::error::{AppError, AppResult};
use crate::middleware::principal::Principal;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter types
// ---------------------------------------------------------------------------

/// Query parameters for audit log listing.
#[derive(Debug, Deserialize)]
pub struct AuditLogParams {
    /// Explicit tenant; only meaningful for admins, everyone else is
    /// pinned to their own organization.
    pub organization_id: Option<DbId>,
    pub agent: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for export.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub organization_id: Option<DbId>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query parameters for chain verification.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub organization_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve which organization's chain the caller may read.
///
/// Sponsors and auditors are pinned to their own tenant regardless of
/// the query parameter; admins must name an existing one;
/// investigators own no chain at all.
async fn resolve_organization(
    pool: &trialgate_db::DbPool,
    principal: &Principal,
    requested: Option<DbId>,
) -> AppResult<DbId> {
    if let Some(organization_id) = principal.organization_id() {
        return Ok(organization_id);
    }
    match principal {
        Principal::Admin { .. } => {
            let organization_id = requested.ok_or_else(|| {
                AppError::BadRequest(
                    "organization_id query parameter is required for admins".into(),
                )
            })?;
            OrganizationRepo::find_by_id(pool, organization_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Organization", organization_id))?;
            Ok(organization_id)
        }
        _ => Err(AppError::Core(CoreError::Forbidden(
            "Audit logs are tenant-scoped; investigators have no audit view".into(),
        ))),
    }
}

/// Quote a CSV field per RFC 4180. Hashes, ids, and timestamps are
/// structurally safe; everything sourced from entry text goes through
/// here.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parse an ISO 8601 timestamp, with a fallback when absent.
fn parse_timestamp(
    s: &Option<String>,
    fallback: chrono::DateTime<chrono::Utc>,
) -> AppResult<chrono::DateTime<chrono::Utc>> {
    match s {
        Some(v) => v
            .parse::<chrono::DateTime<chrono::Utc>>()
            .map_err(|_| AppError::BadRequest("Invalid date format".into())),
        None => Ok(fallback),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/audit/logs
pub async fn list_logs(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<AuditLogParams>,
) -> AppResult<impl IntoResponse> {
    let organization_id =
        resolve_organization(&state.pool, &principal, params.organization_id).await?;

    let query = AuditQuery {
        agent: params.agent,
        action: params.action,
        target_type: params.target_type,
        limit: params.limit,
        offset: params.offset,
    };

    let items = AuditRepo::query(&state.pool, organization_id, &query).await?;
    let total = AuditRepo::count(&state.pool, organization_id, &query).await?;

    Ok(Json(DataResponse {
        data: AuditLogPage { items, total },
    }))
}

/// GET /api/v1/audit/logs/export?from=X&to=Y
///
/// CSV export of one organization's entries for compliance review.
pub async fn export_logs(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let organization_id =
        resolve_organization(&state.pool, &principal, params.organization_id).await?;

    let from = parse_timestamp(
        &params.from,
        chrono::Utc::now() - chrono::Duration::days(30),
    )?;
    let to = parse_timestamp(&params.to, chrono::Utc::now())?;

    let logs = AuditRepo::export_range(&state.pool, organization_id, from, to).await?;

    let mut csv = String::from(
        "id,timestamp,action,target_type,target_id,agent,status,previous_hash,entry_hash\n",
    );
    for log in &logs {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            log.id,
            log.timestamp.to_rfc3339(),
            csv_field(&log.action),
            csv_field(log.target_type.as_deref().unwrap_or("")),
            csv_field(log.target_id.as_deref().unwrap_or("")),
            csv_field(&log.agent),
            csv_field(&log.status),
            log.previous_hash,
            log.entry_hash,
        ));
    }

    axum::response::Response::builder()
        .status(200)
        .header("Content-Type", "text/csv")
        .header(
            "Content-Disposition",
            "attachment; filename=\"audit-logs.csv\"",
        )
        .body(axum::body::Body::from(csv))
        .map_err(|e| AppError::Internal(format!("response build: {e}")))
}

/// GET /api/v1/audit/verify-integrity
///
/// Replay the organization's chain and report every break found.
/// Read-only; a broken chain is never repaired here.
pub async fn verify_integrity(
    principal: Principal,
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> AppResult<impl IntoResponse> {
    let organization_id =
        resolve_organization(&state.pool, &principal, params.organization_id).await?;
    let report = audit_engine::verify_chain(&state.pool, organization_id).await?;
    Ok(Json(DataResponse { data: report }))
}
