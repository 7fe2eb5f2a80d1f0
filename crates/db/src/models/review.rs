//! PI review annotations. Append-only workflow history, distinct from
//! the audit chain: reviews are domain records, audit entries are
//! cross-cutting security records. No update or delete path exists.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use trialgate_core::types::{DbId, Timestamp};

/// A row from the `pi_reviews` table. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PiReview {
    pub id: DbId,
    pub submission_id: DbId,
    pub review_type: String,
    pub patient_id: Option<String>,
    pub comment: Option<String>,
    pub decision: Option<String>,
    pub reviewed_at: Timestamp,
}

/// DTO for appending a review record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub submission_id: DbId,
    pub review_type: String,
    pub patient_id: Option<String>,
    pub comment: Option<String>,
    pub decision: Option<String>,
}
