//! Submission lifecycle state machine and approval aggregation.
//!
//! The aggregate status of a submission is a pure function of its
//! per-patient decisions and must be recomputed from the full, freshly
//! read roster inside the same transaction that mutates it. The
//! repository layer owns that transaction; this module owns the rule.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Submission status
// ---------------------------------------------------------------------------

/// Lifecycle state of a trial submission.
///
/// Stored as lowercase snake_case text in `trial_submissions.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Created; no patient has been reviewed yet.
    Submitted,
    /// At least one patient reviewed, at least one still pending.
    UnderReview,
    /// Every patient approved.
    Approved,
    /// Every patient decided; some approved, some rejected.
    PartiallyApproved,
    /// Every patient rejected.
    Rejected,
    /// Withdrawn by the submitting organization. Hard-terminal: no
    /// review action is accepted afterwards.
    Withdrawn,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::PartiallyApproved => "partially_approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Withdrawn => "withdrawn",
        }
    }

    /// Parse the database text representation.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "submitted" => Ok(SubmissionStatus::Submitted),
            "under_review" => Ok(SubmissionStatus::UnderReview),
            "approved" => Ok(SubmissionStatus::Approved),
            "partially_approved" => Ok(SubmissionStatus::PartiallyApproved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            "withdrawn" => Ok(SubmissionStatus::Withdrawn),
            other => Err(CoreError::Internal(format!(
                "unknown submission status '{other}'"
            ))),
        }
    }

    /// Whether this status is an aggregate outcome (or a withdrawal).
    ///
    /// Terminal here does not mean frozen: a re-review of an already
    /// decided patient re-triggers aggregation. Only `Withdrawn`
    /// blocks further review actions.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            SubmissionStatus::Submitted | SubmissionStatus::UnderReview
        )
    }
}

// ---------------------------------------------------------------------------
// Approval aggregation
// ---------------------------------------------------------------------------

/// Compute the aggregate submission status from per-patient decisions.
///
/// `None` means the patient is still pending. The rule:
/// any pending -> `UnderReview`; all approved -> `Approved`;
/// some approved -> `PartiallyApproved`; all rejected -> `Rejected`.
///
/// An empty roster returns `Submitted`; submission creation rejects
/// empty patient lists, so this only keeps the function total.
pub fn aggregate(decisions: &[Option<bool>]) -> SubmissionStatus {
    if decisions.is_empty() {
        return SubmissionStatus::Submitted;
    }
    if decisions.iter().any(|d| d.is_none()) {
        return SubmissionStatus::UnderReview;
    }
    let approved = decisions.iter().filter(|d| **d == Some(true)).count();
    if approved == decisions.len() {
        SubmissionStatus::Approved
    } else if approved > 0 {
        SubmissionStatus::PartiallyApproved
    } else {
        SubmissionStatus::Rejected
    }
}

// ---------------------------------------------------------------------------
// Review types
// ---------------------------------------------------------------------------

/// Kind of an append-only PI review annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    PatientApproval,
    PatientRejection,
    DocumentApproval,
    GeneralComment,
    RequestInfo,
}

impl ReviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewType::PatientApproval => "patient_approval",
            ReviewType::PatientRejection => "patient_rejection",
            ReviewType::DocumentApproval => "document_approval",
            ReviewType::GeneralComment => "general_comment",
            ReviewType::RequestInfo => "request_info",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "patient_approval" => Ok(ReviewType::PatientApproval),
            "patient_rejection" => Ok(ReviewType::PatientRejection),
            "document_approval" => Ok(ReviewType::DocumentApproval),
            "general_comment" => Ok(ReviewType::GeneralComment),
            "request_info" => Ok(ReviewType::RequestInfo),
            other => Err(CoreError::Validation(format!(
                "unknown review type '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roster_stays_submitted() {
        assert_eq!(aggregate(&[]), SubmissionStatus::Submitted);
    }

    #[test]
    fn any_pending_means_under_review() {
        assert_eq!(
            aggregate(&[Some(true), None, Some(false)]),
            SubmissionStatus::UnderReview
        );
        assert_eq!(aggregate(&[None, None, None]), SubmissionStatus::UnderReview);
    }

    #[test]
    fn all_approved() {
        assert_eq!(
            aggregate(&[Some(true), Some(true), Some(true)]),
            SubmissionStatus::Approved
        );
    }

    #[test]
    fn mixed_decisions_are_partial() {
        assert_eq!(
            aggregate(&[Some(true), Some(false), Some(false)]),
            SubmissionStatus::PartiallyApproved
        );
    }

    #[test]
    fn all_rejected() {
        assert_eq!(
            aggregate(&[Some(false), Some(false), Some(false)]),
            SubmissionStatus::Rejected
        );
    }

    #[test]
    fn single_patient_outcomes() {
        assert_eq!(aggregate(&[None]), SubmissionStatus::UnderReview);
        assert_eq!(aggregate(&[Some(true)]), SubmissionStatus::Approved);
        assert_eq!(aggregate(&[Some(false)]), SubmissionStatus::Rejected);
    }

    #[test]
    fn status_text_round_trips() {
        for status in [
            SubmissionStatus::Submitted,
            SubmissionStatus::UnderReview,
            SubmissionStatus::Approved,
            SubmissionStatus::PartiallyApproved,
            SubmissionStatus::Rejected,
            SubmissionStatus::Withdrawn,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SubmissionStatus::parse("frozen").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SubmissionStatus::Submitted.is_terminal());
        assert!(!SubmissionStatus::UnderReview.is_terminal());
        assert!(SubmissionStatus::Approved.is_terminal());
        assert!(SubmissionStatus::PartiallyApproved.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
        assert!(SubmissionStatus::Withdrawn.is_terminal());
    }

    #[test]
    fn review_type_round_trips() {
        assert_eq!(
            ReviewType::parse("general_comment").unwrap(),
            ReviewType::GeneralComment
        );
        assert_eq!(
            ReviewType::parse(ReviewType::RequestInfo.as_str()).unwrap(),
            ReviewType::RequestInfo
        );
        assert!(ReviewType::parse("drive_by").is_err());
    }
}
