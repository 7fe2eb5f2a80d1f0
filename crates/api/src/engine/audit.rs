//! Audit chain service: append entries for audited actions and verify
//! a tenant's chain on demand.

use sqlx::PgPool;
use trialgate_core::audit::{self, statuses, ChainEntryView, EntryContent};
use trialgate_core::types::DbId;
use trialgate_db::models::audit::{AuditLog, ChainVerification, NewAuditEntry};
use trialgate_db::repositories::AuditRepo;

use crate::error::AppResult;

/// Append one entry to an organization's chain for a committed action.
///
/// The workflow mutation and its audit entry are separate commits; if
/// the append fails the mutation stands, the failure is logged, and
/// the caller sees an error rather than a silent gap in the trail.
pub async fn record(
    pool: &PgPool,
    organization_id: DbId,
    action: &str,
    target_type: &str,
    target_id: DbId,
    agent: String,
    details: serde_json::Value,
) -> AppResult<AuditLog> {
    let entry = NewAuditEntry {
        organization_id,
        action: action.to_string(),
        target_type: Some(target_type.to_string()),
        target_id: Some(target_id.to_string()),
        agent,
        status: statuses::SUCCESS.to_string(),
        details: Some(details),
        document_hash: None,
    };

    let row = AuditRepo::append(pool, &entry).await.inspect_err(|err| {
        tracing::error!(
            organization_id,
            action,
            error = %err,
            "Failed to append audit entry for a committed action"
        );
    })?;

    Ok(row)
}

/// Replay and verify one organization's chain.
///
/// Read-only diagnostic: a broken chain is reported, never repaired,
/// and verification never gates any other operation.
pub async fn verify_chain(pool: &PgPool, organization_id: DbId) -> AppResult<ChainVerification> {
    let rows = AuditRepo::fetch_chain(pool, organization_id).await?;
    let views: Vec<ChainEntryView> = rows.iter().map(chain_view).collect();
    let report = audit::verify_chain(&views);

    if !report.valid {
        tracing::warn!(
            organization_id,
            issues = report.issues.len(),
            "Audit chain verification found integrity issues"
        );
    }

    Ok(ChainVerification {
        organization_id,
        entries_checked: report.entries_checked,
        valid: report.valid,
        issues: report.issues,
    })
}

/// Rebuild the canonical hash input from a stored row.
fn chain_view(row: &AuditLog) -> ChainEntryView {
    let content = EntryContent {
        organization_id: row.organization_id,
        action: &row.action,
        target_type: row.target_type.as_deref(),
        target_id: row.target_id.as_deref(),
        agent: &row.agent,
        status: &row.status,
        details: row.details.as_ref(),
        document_hash: row.document_hash.as_deref(),
        timestamp: row.timestamp,
    }
    .canonical();

    ChainEntryView {
        entry_id: row.id,
        previous_hash: row.previous_hash.clone(),
        entry_hash: row.entry_hash.clone(),
        canonical_content: content,
    }
}
