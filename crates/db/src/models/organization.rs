//! Tenant entity. Organizations own trials, users, and audit chains;
//! they are seeded at deploy time and immutable afterwards.

use serde::Serialize;
use sqlx::FromRow;
use trialgate_core::types::{DbId, Timestamp};

/// A row from the `organizations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Organization {
    pub id: DbId,
    pub name: String,
    pub domain: Option<String>,
    pub created_at: Timestamp,
}
