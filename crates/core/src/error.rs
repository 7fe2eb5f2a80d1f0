use std::fmt::Display;

/// Domain-level error taxonomy shared by every layer.
///
/// Tenant-scoping failures are deliberately reported as [`CoreError::NotFound`]
/// rather than `Forbidden` so that the existence of cross-tenant records is
/// never leaked to the caller.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Entity absent, or present but outside the caller's tenant.
    ///
    /// `id` is a string because some referenced identifiers (de-identified
    /// patient ids) are external strings, not database keys.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A downstream collaborator (eligibility scoring, auth) is unreachable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a `NotFound` with any displayable id.
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
