//! User entity. Authentication happens in an external identity layer;
//! this table only anchors `submitted_by` references and role lookups.

use serde::Serialize;
use sqlx::FromRow;
use trialgate_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    /// `None` for platform admins and investigator accounts.
    pub organization_id: Option<DbId>,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: Timestamp,
}
