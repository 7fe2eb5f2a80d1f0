//! Repository for the `organizations` table.

use sqlx::PgPool;
use trialgate_core::types::DbId;

use crate::models::organization::Organization;

const COLUMNS: &str = "id, name, domain, created_at";

/// Read-only lookups; organizations are seeded, never mutated.
pub struct OrganizationRepo;

impl OrganizationRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Organization>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM organizations WHERE id = $1");
        sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
