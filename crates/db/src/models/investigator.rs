//! Principal investigator entity. Investigators are reviewer
//! identities independent of any tenant and may receive submissions
//! from several organizations.

use serde::Serialize;
use sqlx::FromRow;
use trialgate_core::types::{DbId, Timestamp};

/// Status value for an investigator who can receive new submissions.
pub const INVESTIGATOR_ACTIVE: &str = "active";
/// Inactive investigators keep their history but receive nothing new.
pub const INVESTIGATOR_INACTIVE: &str = "inactive";

/// A row from the `principal_investigators` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PrincipalInvestigator {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub status: String,
    pub created_at: Timestamp,
}

impl PrincipalInvestigator {
    pub fn is_active(&self) -> bool {
        self.status == INVESTIGATOR_ACTIVE
    }
}
