//! Repository for the `pi_reviews` table. Insert and list only; the
//! table is append-only history and has no update or delete path.

use sqlx::{PgPool, Postgres, Transaction};
use trialgate_core::types::DbId;

use crate::models::review::{NewReview, PiReview};

const COLUMNS: &str = "id, submission_id, review_type, patient_id, comment, decision, reviewed_at";

pub struct ReviewRepo;

impl ReviewRepo {
    /// Append a standalone review annotation.
    pub async fn create(pool: &PgPool, input: &NewReview) -> Result<PiReview, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let review = Self::create_in_tx(&mut tx, input).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Append a review inside an already-open transaction. Used by
    /// `SubmissionRepo::apply_decisions` so the review row commits
    /// atomically with the patient-state and status writes.
    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &NewReview,
    ) -> Result<PiReview, sqlx::Error> {
        let query = format!(
            "INSERT INTO pi_reviews (submission_id, review_type, patient_id, comment, decision) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PiReview>(&query)
            .bind(input.submission_id)
            .bind(&input.review_type)
            .bind(&input.patient_id)
            .bind(&input.comment)
            .bind(&input.decision)
            .fetch_one(&mut **tx)
            .await
    }

    /// List a submission's review history, oldest first.
    pub async fn list_for_submission(
        pool: &PgPool,
        submission_id: DbId,
    ) -> Result<Vec<PiReview>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM pi_reviews WHERE submission_id = $1 ORDER BY id");
        sqlx::query_as::<_, PiReview>(&query)
            .bind(submission_id)
            .fetch_all(pool)
            .await
    }
}
