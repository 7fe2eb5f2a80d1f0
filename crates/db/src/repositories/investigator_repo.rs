//! Repository for the `principal_investigators` table.

use sqlx::PgPool;
use trialgate_core::types::DbId;

use crate::models::investigator::PrincipalInvestigator;

const COLUMNS: &str = "id, name, email, status, created_at";

pub struct InvestigatorRepo;

impl InvestigatorRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PrincipalInvestigator>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM principal_investigators WHERE id = $1");
        sqlx::query_as::<_, PrincipalInvestigator>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
