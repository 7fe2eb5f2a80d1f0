//! Repository for the `clinical_trials` table. Trials are created by
//! the external ingestion pipeline; the workflow only reads them.

use sqlx::PgPool;
use trialgate_core::types::DbId;

use crate::models::trial::ClinicalTrial;

const COLUMNS: &str = "id, organization_id, trial_identifier, title, phase, created_at";

pub struct TrialRepo;

impl TrialRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ClinicalTrial>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clinical_trials WHERE id = $1");
        sqlx::query_as::<_, ClinicalTrial>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a trial only if it belongs to the given organization.
    ///
    /// The tenant check lives in the query so a cross-tenant id and a
    /// nonexistent id are indistinguishable to the caller.
    pub async fn find_for_organization(
        pool: &PgPool,
        id: DbId,
        organization_id: DbId,
    ) -> Result<Option<ClinicalTrial>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM clinical_trials WHERE id = $1 AND organization_id = $2");
        sqlx::query_as::<_, ClinicalTrial>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }
}
