//! Submission workflow engine.
//!
//! Orchestrates submission creation, reviewer decisions, annotations,
//! and withdrawal on top of the repositories, and appends one audit
//! entry per state-changing operation. Tenant and assignment checks
//! happen here, before any transaction opens.

use std::collections::HashSet;

use serde_json::json;
use sqlx::PgPool;
use trialgate_core::audit::actions;
use trialgate_core::error::CoreError;
use trialgate_core::patient::PatientSnapshot;
use trialgate_core::types::DbId;
use trialgate_core::workflow::{ReviewType, SubmissionStatus};
use trialgate_db::models::review::NewReview;
use trialgate_db::models::submission::{
    NewSubmission, NewSubmissionPatient, PatientDecision, Submission, SubmissionDetail,
};
use trialgate_db::repositories::{
    InvestigatorRepo, ReviewRepo, SubmissionRepo, TrialRepo, UserRepo,
};

use crate::engine::audit;
use crate::error::{AppError, AppResult};
use crate::middleware::principal::Principal;

const TARGET_SUBMISSION: &str = "trial_submission";

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Create a submission with a frozen patient roster.
///
/// Preconditions: caller is a sponsor; the trial belongs to the
/// caller's organization (cross-tenant ids read as NotFound); the
/// investigator exists and is active; the roster is non-empty with
/// unique, valid patient snapshots.
pub async fn create_submission(
    pool: &PgPool,
    principal: &Principal,
    trial_id: DbId,
    principal_investigator_id: DbId,
    patients: Vec<PatientSnapshot>,
    notes: Option<String>,
    report_data: Option<serde_json::Value>,
) -> AppResult<SubmissionDetail> {
    let Principal::Sponsor {
        user_id,
        organization_id,
    } = principal
    else {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only organization users may create submissions".into(),
        )));
    };

    if patients.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "patient list must not be empty".into(),
        )));
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for snapshot in &patients {
        snapshot.validate()?;
        if !seen.insert(snapshot.patient_id.as_str()) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "duplicate patient id '{}' in roster",
                snapshot.patient_id
            ))));
        }
    }

    // Tokens are issued externally; re-anchor the subject against the
    // user table so a submission can never reference a removed or
    // re-homed account.
    let user = UserRepo::find_by_id(pool, *user_id)
        .await?
        .ok_or_else(|| CoreError::Unauthorized("token subject no longer exists".into()))?;
    if user.organization_id != Some(*organization_id) {
        return Err(AppError::Core(CoreError::Unauthorized(
            "token organization does not match the user record".into(),
        )));
    }

    let trial = TrialRepo::find_for_organization(pool, trial_id, *organization_id)
        .await?
        .ok_or_else(|| CoreError::not_found("ClinicalTrial", trial_id))?;

    let investigator = InvestigatorRepo::find_by_id(pool, principal_investigator_id)
        .await?
        .ok_or_else(|| CoreError::not_found("PrincipalInvestigator", principal_investigator_id))?;
    if !investigator.is_active() {
        return Err(AppError::Core(CoreError::Validation(format!(
            "investigator '{}' is inactive and cannot receive submissions",
            investigator.name
        ))));
    }

    let roster: Vec<NewSubmissionPatient> = patients
        .iter()
        .map(|p| {
            Ok(NewSubmissionPatient {
                patient_id: p.patient_id.clone(),
                patient_data: serde_json::to_value(p)
                    .map_err(|e| CoreError::Internal(format!("snapshot serialization: {e}")))?,
            })
        })
        .collect::<Result<_, CoreError>>()?;

    let submission = SubmissionRepo::create(
        pool,
        &NewSubmission {
            trial_id,
            principal_investigator_id,
            submitted_by_user_id: *user_id,
            notes,
            report_data,
            patients: roster,
        },
    )
    .await?;

    audit::record(
        pool,
        *organization_id,
        actions::SUBMISSION_CREATED,
        TARGET_SUBMISSION,
        submission.id,
        principal.agent(),
        json!({
            "trial_identifier": trial.trial_identifier,
            "principal_investigator_id": principal_investigator_id,
            "patient_count": patients.len(),
        }),
    )
    .await?;

    tracing::info!(
        submission_id = submission.id,
        trial_id,
        principal_investigator_id,
        patient_count = patients.len(),
        "Submission created"
    );

    let rows = SubmissionRepo::fetch_patients(pool, submission.id).await?;
    Ok(SubmissionDetail {
        submission,
        patients: rows,
        reviews: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Reviewer decisions
// ---------------------------------------------------------------------------

/// Apply one uniform decision to a set of patients (single, bulk, or
/// whole roster).
///
/// The caller must be the submission's assigned investigator. Each
/// call commits one transaction and produces exactly one review row
/// and one audit entry. Re-applying a decision a patient already
/// carries leaves roster and status unchanged, so a Conflict retry is
/// safe.
pub async fn decide_patients(
    pool: &PgPool,
    principal: &Principal,
    submission_id: DbId,
    patient_ids: Vec<String>,
    approved: bool,
    comment: Option<String>,
) -> AppResult<Submission> {
    let submission = assigned_submission(pool, principal, submission_id).await?;

    if patient_ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "patient id list must not be empty".into(),
        )));
    }

    let status = SubmissionStatus::parse(&submission.status)?;
    if status == SubmissionStatus::Withdrawn {
        return Err(AppError::Core(CoreError::Conflict(
            "submission has been withdrawn".into(),
        )));
    }

    let single = (patient_ids.len() == 1).then(|| patient_ids[0].clone());
    let review_type = if approved {
        ReviewType::PatientApproval
    } else {
        ReviewType::PatientRejection
    };
    let review = NewReview {
        submission_id,
        review_type: review_type.as_str().to_string(),
        patient_id: single.clone(),
        comment,
        decision: Some(if approved { "approved" } else { "rejected" }.to_string()),
    };

    let decisions: Vec<PatientDecision> = patient_ids
        .iter()
        .map(|patient_id| PatientDecision {
            patient_id: patient_id.clone(),
            approved,
        })
        .collect();

    let updated = SubmissionRepo::apply_decisions(pool, submission_id, &decisions, &review).await?;

    let organization_id = owning_organization(pool, &submission).await?;
    let (action, details) = match &single {
        Some(patient_id) => (
            if approved {
                actions::PATIENT_APPROVED
            } else {
                actions::PATIENT_REJECTED
            },
            json!({
                "patient_id": patient_id,
                "approved": approved,
                "new_status": updated.status,
            }),
        ),
        None => (
            actions::BULK_REVIEW,
            json!({
                "patient_ids": patient_ids,
                "approved": approved,
                "count": patient_ids.len(),
                "new_status": updated.status,
            }),
        ),
    };
    audit::record(
        pool,
        organization_id,
        action,
        TARGET_SUBMISSION,
        submission_id,
        principal.agent(),
        details,
    )
    .await?;

    tracing::info!(
        submission_id,
        decisions = decisions.len(),
        approved,
        status = %updated.status,
        "Review decisions applied"
    );

    Ok(updated)
}

/// Apply one decision to the entire roster.
pub async fn decide_all_patients(
    pool: &PgPool,
    principal: &Principal,
    submission_id: DbId,
    approved: bool,
    comment: Option<String>,
) -> AppResult<Submission> {
    // Assignment is re-checked by decide_patients; this read only
    // collects the roster ids.
    let roster = SubmissionRepo::fetch_patients(pool, submission_id).await?;
    if roster.is_empty() {
        return Err(AppError::Core(CoreError::not_found(
            "TrialSubmission",
            submission_id,
        )));
    }
    let patient_ids = roster.into_iter().map(|p| p.patient_id).collect();
    decide_patients(pool, principal, submission_id, patient_ids, approved, comment).await
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// Append a free-form review annotation (comment, information
/// request, or document approval). Patient decisions must go through
/// the decision operations; this path never mutates roster state.
pub async fn add_review_note(
    pool: &PgPool,
    principal: &Principal,
    submission_id: DbId,
    review_type: ReviewType,
    patient_id: Option<String>,
    comment: Option<String>,
) -> AppResult<()> {
    if matches!(
        review_type,
        ReviewType::PatientApproval | ReviewType::PatientRejection
    ) {
        return Err(AppError::Core(CoreError::Validation(
            "patient decisions must use the approve endpoints".into(),
        )));
    }

    let submission = assigned_submission(pool, principal, submission_id).await?;

    ReviewRepo::create(
        pool,
        &NewReview {
            submission_id,
            review_type: review_type.as_str().to_string(),
            patient_id,
            comment,
            decision: None,
        },
    )
    .await?;

    let organization_id = owning_organization(pool, &submission).await?;
    audit::record(
        pool,
        organization_id,
        actions::REVIEW_NOTE,
        TARGET_SUBMISSION,
        submission_id,
        principal.agent(),
        json!({ "review_type": review_type.as_str() }),
    )
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

/// Withdraw a submission before it reaches an aggregate outcome.
/// Sponsor-side operation; reviewers never act on withdrawn
/// submissions.
pub async fn withdraw_submission(
    pool: &PgPool,
    principal: &Principal,
    submission_id: DbId,
) -> AppResult<Submission> {
    let Principal::Sponsor {
        organization_id, ..
    } = principal
    else {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only organization users may withdraw submissions".into(),
        )));
    };

    let submission = SubmissionRepo::find_by_id(pool, submission_id)
        .await?
        .ok_or_else(|| CoreError::not_found("TrialSubmission", submission_id))?;

    // Cross-tenant ids read as NotFound.
    TrialRepo::find_for_organization(pool, submission.trial_id, *organization_id)
        .await?
        .ok_or_else(|| CoreError::not_found("TrialSubmission", submission_id))?;

    let withdrawn = SubmissionRepo::withdraw(pool, submission_id)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "submission {submission_id} is already in state '{}' and cannot be withdrawn",
                submission.status
            ))
        })?;

    audit::record(
        pool,
        *organization_id,
        actions::SUBMISSION_WITHDRAWN,
        TARGET_SUBMISSION,
        submission_id,
        principal.agent(),
        json!({ "previous_status": submission.status }),
    )
    .await?;

    tracing::info!(submission_id, "Submission withdrawn");
    Ok(withdrawn)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// List the submissions a principal may see: investigators their
/// received ones, sponsors their organization's sent ones, platform
/// roles everything in scope.
pub async fn list_visible_to(pool: &PgPool, principal: &Principal) -> AppResult<Vec<Submission>> {
    let submissions = match principal {
        Principal::Investigator {
            investigator_id, ..
        } => SubmissionRepo::list_for_investigator(pool, *investigator_id).await?,
        Principal::Sponsor {
            organization_id, ..
        }
        | Principal::Auditor {
            organization_id, ..
        } => SubmissionRepo::list_for_organization(pool, *organization_id).await?,
        Principal::Admin { .. } => SubmissionRepo::list_all(pool).await?,
    };
    Ok(submissions)
}

/// Load a submission with roster and review history, enforcing the
/// visibility rules: the assigned investigator, the owning tenant's
/// users, and admins.
pub async fn get_submission(
    pool: &PgPool,
    principal: &Principal,
    submission_id: DbId,
) -> AppResult<SubmissionDetail> {
    let submission = SubmissionRepo::find_by_id(pool, submission_id)
        .await?
        .ok_or_else(|| CoreError::not_found("TrialSubmission", submission_id))?;

    match principal {
        Principal::Admin { .. } => {}
        Principal::Investigator {
            investigator_id, ..
        } => {
            if submission.principal_investigator_id != *investigator_id {
                return Err(AppError::Core(CoreError::Forbidden(
                    "submission is assigned to a different investigator".into(),
                )));
            }
        }
        Principal::Sponsor {
            organization_id, ..
        }
        | Principal::Auditor {
            organization_id, ..
        } => {
            TrialRepo::find_for_organization(pool, submission.trial_id, *organization_id)
                .await?
                .ok_or_else(|| CoreError::not_found("TrialSubmission", submission_id))?;
        }
    }

    let patients = SubmissionRepo::fetch_patients(pool, submission_id).await?;
    let reviews = ReviewRepo::list_for_submission(pool, submission_id).await?;
    Ok(SubmissionDetail {
        submission,
        patients,
        reviews,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a submission and require that the principal is its assigned
/// investigator.
async fn assigned_submission(
    pool: &PgPool,
    principal: &Principal,
    submission_id: DbId,
) -> AppResult<Submission> {
    let Principal::Investigator {
        investigator_id, ..
    } = principal
    else {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the assigned investigator may review a submission".into(),
        )));
    };

    let submission = SubmissionRepo::find_by_id(pool, submission_id)
        .await?
        .ok_or_else(|| CoreError::not_found("TrialSubmission", submission_id))?;

    if submission.principal_investigator_id != *investigator_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "submission is assigned to a different investigator".into(),
        )));
    }
    Ok(submission)
}

/// Resolve the organization whose audit chain records actions on this
/// submission: the tenant owning the submission's trial.
async fn owning_organization(pool: &PgPool, submission: &Submission) -> AppResult<DbId> {
    let trial = TrialRepo::find_by_id(pool, submission.trial_id)
        .await?
        .ok_or_else(|| CoreError::not_found("ClinicalTrial", submission.trial_id))?;
    Ok(trial.organization_id)
}
