//! Audit log entity models and DTOs.
//!
//! Audit rows are append-only and hash-chained per organization; there
//! is no update DTO and no `updated_at` column by design.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trialgate_core::audit::ChainIssue;
use trialgate_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A single audit log entry. Immutable once created.
///
/// `id` doubles as the chain-order sequence: within one organization,
/// ascending `id` is the authoritative order the `previous_hash` links
/// materialize, independent of wall-clock timestamps.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLog {
    pub id: DbId,
    pub organization_id: DbId,
    pub timestamp: Timestamp,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub agent: String,
    pub status: String,
    pub details: Option<serde_json::Value>,
    /// Content hash of an associated artifact, if any.
    pub document_hash: Option<String>,
    pub previous_hash: String,
    pub entry_hash: String,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for appending an entry. Hashes and timestamp are computed by
/// the repository at append time, never supplied by callers.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub organization_id: DbId,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub agent: String,
    pub status: String,
    pub details: Option<serde_json::Value>,
    pub document_hash: Option<String>,
}

/// Filter parameters for querying one organization's entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub agent: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated response for audit log queries.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub items: Vec<AuditLog>,
    pub total: i64,
}

/// Chain verification report for one organization.
#[derive(Debug, Clone, Serialize)]
pub struct ChainVerification {
    pub organization_id: DbId,
    pub entries_checked: usize,
    pub valid: bool,
    pub issues: Vec<ChainIssue>,
}
