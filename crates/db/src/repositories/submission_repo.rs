//! Repository for `trial_submissions` and `submission_patients`.
//!
//! All mutations of a submission's roster and aggregate status run in
//! one transaction that locks the full roster, so two concurrent
//! reviewers can never compute the aggregate from a stale read.

use std::collections::HashSet;

use sqlx::PgPool;
use trialgate_core::types::DbId;
use trialgate_core::workflow::{self, SubmissionStatus};

use crate::models::review::NewReview;
use crate::models::submission::{NewSubmission, PatientDecision, Submission, SubmissionPatient};
use crate::repositories::ReviewRepo;

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const COLUMNS: &str = "\
    id, trial_id, principal_investigator_id, submitted_by_user_id, status, \
    submission_date, reviewed_at, notes, report_data, created_at, updated_at";

/// Same columns qualified for joined queries.
const QUALIFIED_COLUMNS: &str = "\
    s.id, s.trial_id, s.principal_investigator_id, s.submitted_by_user_id, s.status, \
    s.submission_date, s.reviewed_at, s.notes, s.report_data, s.created_at, s.updated_at";

const PATIENT_COLUMNS: &str =
    "id, submission_id, patient_id, patient_data, is_approved, created_at, updated_at";

/// Upper bound on waiting for the roster lock; expiry surfaces as a
/// Postgres `55P03` error, which the API maps to a retryable Conflict.
const LOCK_TIMEOUT: &str = "SET LOCAL lock_timeout = '5s'";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure modes of a review-decision transaction.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The batch referenced patient ids not on this submission's
    /// roster. The whole transaction is rolled back.
    #[error("unknown patient ids for submission {submission_id}: {patient_ids:?}")]
    UnknownPatients {
        submission_id: DbId,
        patient_ids: Vec<String>,
    },

    /// The submission was withdrawn before the decision transaction
    /// acquired its lock. Withdrawn is hard-terminal; no decision may
    /// pull a submission back out of it.
    #[error("submission {0} has been withdrawn")]
    Withdrawn(DbId),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// SubmissionRepo
// ---------------------------------------------------------------------------

pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Insert a submission and its full patient roster atomically.
    ///
    /// Every patient row starts with `is_approved = NULL` (pending);
    /// the submission starts in `submitted`.
    pub async fn create(pool: &PgPool, input: &NewSubmission) -> Result<Submission, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_query = format!(
            "INSERT INTO trial_submissions \
                (trial_id, principal_investigator_id, submitted_by_user_id, status, notes, report_data) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let submission = sqlx::query_as::<_, Submission>(&insert_query)
            .bind(input.trial_id)
            .bind(input.principal_investigator_id)
            .bind(input.submitted_by_user_id)
            .bind(SubmissionStatus::Submitted.as_str())
            .bind(&input.notes)
            .bind(&input.report_data)
            .fetch_one(&mut *tx)
            .await?;

        for patient in &input.patients {
            sqlx::query(
                "INSERT INTO submission_patients (submission_id, patient_id, patient_data) \
                 VALUES ($1, $2, $3)",
            )
            .bind(submission.id)
            .bind(&patient.patient_id)
            .bind(&patient.patient_data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(submission)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Submission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM trial_submissions WHERE id = $1");
        sqlx::query_as::<_, Submission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load a submission's roster, oldest row first.
    pub async fn fetch_patients(
        pool: &PgPool,
        submission_id: DbId,
    ) -> Result<Vec<SubmissionPatient>, sqlx::Error> {
        let query = format!(
            "SELECT {PATIENT_COLUMNS} FROM submission_patients \
             WHERE submission_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, SubmissionPatient>(&query)
            .bind(submission_id)
            .fetch_all(pool)
            .await
    }

    /// Submissions received by an investigator, newest first.
    pub async fn list_for_investigator(
        pool: &PgPool,
        investigator_id: DbId,
    ) -> Result<Vec<Submission>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM trial_submissions \
             WHERE principal_investigator_id = $1 \
             ORDER BY submission_date DESC"
        );
        sqlx::query_as::<_, Submission>(&query)
            .bind(investigator_id)
            .fetch_all(pool)
            .await
    }

    /// Submissions sent by an organization, newest first. Scoping goes
    /// through the trial's owning organization, which is fixed at
    /// creation time.
    pub async fn list_for_organization(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<Submission>, sqlx::Error> {
        let query = format!(
            "SELECT {QUALIFIED_COLUMNS} FROM trial_submissions s \
             JOIN clinical_trials t ON t.id = s.trial_id \
             WHERE t.organization_id = $1 \
             ORDER BY s.submission_date DESC"
        );
        sqlx::query_as::<_, Submission>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Submission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM trial_submissions ORDER BY submission_date DESC");
        sqlx::query_as::<_, Submission>(&query).fetch_all(pool).await
    }

    /// Apply a batch of reviewer decisions as one atomic unit.
    ///
    /// The transaction: bounds lock waiting, locks the submission row
    /// and refuses withdrawn submissions, locks the full roster with
    /// `FOR UPDATE`, rejects unknown patient ids, writes the
    /// decisions, recomputes the aggregate from a fresh in-transaction
    /// read of the roster, persists the new status + `reviewed_at`,
    /// and appends exactly one review row. Either everything commits
    /// or nothing does.
    ///
    /// Re-applying a decision a patient already carries is a no-op for
    /// the roster state, which makes retries after a Conflict safe.
    pub async fn apply_decisions(
        pool: &PgPool,
        submission_id: DbId,
        decisions: &[PatientDecision],
        review: &NewReview,
    ) -> Result<Submission, DecisionError> {
        let mut tx = pool.begin().await?;

        sqlx::query(LOCK_TIMEOUT).execute(&mut *tx).await?;

        // Lock the submission row and re-check its status under the
        // lock. Any pre-transaction read the caller made can be stale:
        // a withdrawal committing in between must not be overwritten
        // by the aggregate write below.
        let current_status: String =
            sqlx::query_scalar("SELECT status FROM trial_submissions WHERE id = $1 FOR UPDATE")
                .bind(submission_id)
                .fetch_one(&mut *tx)
                .await?;
        if current_status == SubmissionStatus::Withdrawn.as_str() {
            return Err(DecisionError::Withdrawn(submission_id));
        }

        // Lock the whole roster, not just the rows being decided:
        // the aggregate depends on every row.
        let roster_query = format!(
            "SELECT {PATIENT_COLUMNS} FROM submission_patients \
             WHERE submission_id = $1 ORDER BY id FOR UPDATE"
        );
        let roster: Vec<SubmissionPatient> = sqlx::query_as(&roster_query)
            .bind(submission_id)
            .fetch_all(&mut *tx)
            .await?;

        let known: HashSet<&str> = roster.iter().map(|p| p.patient_id.as_str()).collect();
        let unknown: Vec<String> = decisions
            .iter()
            .filter(|d| !known.contains(d.patient_id.as_str()))
            .map(|d| d.patient_id.clone())
            .collect();
        if !unknown.is_empty() {
            // Dropping the transaction rolls everything back.
            return Err(DecisionError::UnknownPatients {
                submission_id,
                patient_ids: unknown,
            });
        }

        for decision in decisions {
            sqlx::query(
                "UPDATE submission_patients \
                 SET is_approved = $3, updated_at = now() \
                 WHERE submission_id = $1 AND patient_id = $2",
            )
            .bind(submission_id)
            .bind(&decision.patient_id)
            .bind(decision.approved)
            .execute(&mut *tx)
            .await?;
        }

        // Recompute from a fresh read of the locked roster rather than
        // the in-memory copy; the status write must reflect exactly
        // what this transaction commits.
        let flags: Vec<Option<bool>> = sqlx::query_scalar(
            "SELECT is_approved FROM submission_patients WHERE submission_id = $1 ORDER BY id",
        )
        .bind(submission_id)
        .fetch_all(&mut *tx)
        .await?;
        let status = workflow::aggregate(&flags);

        let update_query = format!(
            "UPDATE trial_submissions \
             SET status = $2, reviewed_at = now(), updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let submission = sqlx::query_as::<_, Submission>(&update_query)
            .bind(submission_id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        ReviewRepo::create_in_tx(&mut tx, review).await?;

        tx.commit().await?;

        tracing::debug!(
            submission_id,
            decisions = decisions.len(),
            status = status.as_str(),
            "Applied review decisions"
        );

        Ok(submission)
    }

    /// Sponsor-side withdrawal. Only non-terminal submissions can be
    /// withdrawn; returns `None` when the status no longer allows it.
    pub async fn withdraw(
        pool: &PgPool,
        submission_id: DbId,
    ) -> Result<Option<Submission>, sqlx::Error> {
        let query = format!(
            "UPDATE trial_submissions \
             SET status = $2, updated_at = now() \
             WHERE id = $1 AND status IN ('submitted', 'under_review') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&query)
            .bind(submission_id)
            .bind(SubmissionStatus::Withdrawn.as_str())
            .fetch_optional(pool)
            .await
    }
}
