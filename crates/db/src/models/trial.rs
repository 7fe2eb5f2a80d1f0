//! Clinical trial entity. Trials are created by the external document
//! ingestion pipeline; the workflow core consumes them read-only.

use serde::Serialize;
use sqlx::FromRow;
use trialgate_core::types::{DbId, Timestamp};

/// A row from the `clinical_trials` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClinicalTrial {
    pub id: DbId,
    pub organization_id: DbId,
    /// External registry identifier (e.g. an NCT number).
    pub trial_identifier: String,
    pub title: String,
    pub phase: Option<String>,
    pub created_at: Timestamp,
}
