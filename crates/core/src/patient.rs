//! Frozen patient eligibility snapshots.
//!
//! Snapshots are produced by the external eligibility-scoring service
//! at submission time and are never refreshed afterwards; the schema
//! is explicit and versioned so the audit digest and any downstream
//! consumer operate on a stable shape rather than an untyped map.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Current snapshot schema version. Bump when the shape changes.
pub const SNAPSHOT_SCHEMA_VERSION: u16 = 1;

fn default_schema_version() -> u16 {
    SNAPSHOT_SCHEMA_VERSION
}

/// Eligibility verdict returned by the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    Indeterminate,
}

/// One patient's eligibility result, frozen at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    /// De-identified external record id; not a database foreign key.
    pub patient_id: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub eligibility: EligibilityStatus,
    /// Scoring confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl PatientSnapshot {
    /// Validate a snapshot supplied by a caller before it is persisted.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.patient_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "patient_id must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(CoreError::Validation(format!(
                "confidence for patient '{}' must be within [0.0, 1.0], got {}",
                self.patient_id, self.confidence
            )));
        }
        if let Some(age) = self.age {
            if age < 0 {
                return Err(CoreError::Validation(format!(
                    "age for patient '{}' must not be negative",
                    self.patient_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn snapshot() -> PatientSnapshot {
        PatientSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            patient_id: "PT-1042".to_string(),
            age: Some(54),
            gender: Some("female".to_string()),
            eligibility: EligibilityStatus::Eligible,
            confidence: 0.91,
            reasons: vec!["age within protocol range".to_string()],
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        assert!(snapshot().validate().is_ok());
    }

    #[test]
    fn blank_patient_id_rejected() {
        let mut s = snapshot();
        s.patient_id = "  ".to_string();
        assert_matches!(s.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn confidence_out_of_range_rejected() {
        let mut s = snapshot();
        s.confidence = 1.2;
        assert_matches!(s.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn negative_age_rejected() {
        let mut s = snapshot();
        s.age = Some(-1);
        assert_matches!(s.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn schema_version_defaults_on_deserialize() {
        let s: PatientSnapshot = serde_json::from_str(
            r#"{"patient_id":"PT-7","eligibility":"indeterminate","confidence":0.4}"#,
        )
        .unwrap();
        assert_eq!(s.schema_version, SNAPSHOT_SCHEMA_VERSION);
        assert!(s.reasons.is_empty());
        assert_eq!(s.eligibility, EligibilityStatus::Indeterminate);
    }
}
