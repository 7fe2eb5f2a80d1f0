//! Trial submission entities and DTOs.
//!
//! A submission bundles one trial with a frozen set of patient
//! eligibility snapshots, addressed to one investigator. Its `status`
//! column is only ever written by the aggregation rule inside
//! `SubmissionRepo::apply_decisions`; nothing else mutates it except
//! the sponsor-side withdrawal path.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trialgate_core::types::{DbId, Timestamp};

use crate::models::review::PiReview;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A row from the `trial_submissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Submission {
    pub id: DbId,
    pub trial_id: DbId,
    pub principal_investigator_id: DbId,
    pub submitted_by_user_id: DbId,
    pub status: String,
    pub submission_date: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub notes: Option<String>,
    /// Opaque snapshot of trial metadata at submission time.
    pub report_data: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `submission_patients` table.
///
/// `is_approved` is tri-state: `None` = pending, `Some(true)` =
/// approved, `Some(false)` = rejected.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubmissionPatient {
    pub id: DbId,
    pub submission_id: DbId,
    /// De-identified external record id; unique per submission.
    pub patient_id: String,
    /// Frozen eligibility snapshot, never refreshed from source.
    pub patient_data: serde_json::Value,
    pub is_approved: Option<bool>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// One patient row to persist at creation time.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmissionPatient {
    pub patient_id: String,
    pub patient_data: serde_json::Value,
}

/// DTO for inserting a submission with its roster in one transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubmission {
    pub trial_id: DbId,
    pub principal_investigator_id: DbId,
    pub submitted_by_user_id: DbId,
    pub notes: Option<String>,
    pub report_data: Option<serde_json::Value>,
    pub patients: Vec<NewSubmissionPatient>,
}

/// A single reviewer decision on one patient.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientDecision {
    pub patient_id: String,
    pub approved: bool,
}

/// Submission plus its roster and review history.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: Submission,
    pub patients: Vec<SubmissionPatient>,
    pub reviews: Vec<PiReview>,
}
