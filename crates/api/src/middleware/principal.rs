//! Capability-scoped principal.
//!
//! Role handling is a closed enum built once at extraction time, not
//! string comparisons scattered across handlers. Each variant carries
//! exactly the identity the capability needs: sponsors and auditors a
//! tenant, investigators a reviewer identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use trialgate_core::error::CoreError;
use trialgate_core::roles::{ROLE_ADMIN, ROLE_AUDITOR, ROLE_INVESTIGATOR, ROLE_SPONSOR};
use trialgate_core::types::DbId;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// A verified caller, dispatched by capability.
#[derive(Debug, Clone)]
pub enum Principal {
    /// Platform operator; sees every tenant.
    Admin { user_id: DbId },
    /// Organization user who creates and withdraws submissions.
    Sponsor { user_id: DbId, organization_id: DbId },
    /// Reviewer; acts only on submissions assigned to them.
    Investigator { user_id: DbId, investigator_id: DbId },
    /// Read-only compliance role, scoped to one tenant's chain.
    Auditor { user_id: DbId, organization_id: DbId },
}

impl Principal {
    pub fn user_id(&self) -> DbId {
        match self {
            Principal::Admin { user_id }
            | Principal::Sponsor { user_id, .. }
            | Principal::Investigator { user_id, .. }
            | Principal::Auditor { user_id, .. } => *user_id,
        }
    }

    /// Actor identity string recorded in audit entries.
    pub fn agent(&self) -> String {
        format!("user:{}", self.user_id())
    }

    /// The tenant this principal is scoped to, if any.
    pub fn organization_id(&self) -> Option<DbId> {
        match self {
            Principal::Sponsor {
                organization_id, ..
            }
            | Principal::Auditor {
                organization_id, ..
            } => Some(*organization_id),
            Principal::Admin { .. } | Principal::Investigator { .. } => None,
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        let missing = |claim: &str| {
            AppError::Core(CoreError::Unauthorized(format!(
                "Token for role '{}' is missing the '{claim}' claim",
                user.role
            )))
        };

        match user.role.as_str() {
            ROLE_ADMIN => Ok(Principal::Admin {
                user_id: user.user_id,
            }),
            ROLE_SPONSOR => Ok(Principal::Sponsor {
                user_id: user.user_id,
                organization_id: user.organization_id.ok_or_else(|| missing("org"))?,
            }),
            ROLE_INVESTIGATOR => Ok(Principal::Investigator {
                user_id: user.user_id,
                investigator_id: user.investigator_id.ok_or_else(|| missing("pi"))?,
            }),
            ROLE_AUDITOR => Ok(Principal::Auditor {
                user_id: user.user_id,
                organization_id: user.organization_id.ok_or_else(|| missing("org"))?,
            }),
            other => Err(AppError::Core(CoreError::Forbidden(format!(
                "Unknown role '{other}'"
            )))),
        }
    }
}
