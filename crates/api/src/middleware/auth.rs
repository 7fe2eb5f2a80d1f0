//! JWT-based authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use trialgate_core::error::CoreError;
use trialgate_core::roles::validate_role;
use trialgate_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a Bearer token in the
/// `Authorization` header. Most handlers should use
/// [`crate::middleware::principal::Principal`] instead, which adds the
/// capability dispatch; this extractor is the raw claim set.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: String,
    pub organization_id: Option<DbId>,
    pub investigator_id: Option<DbId>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        validate_role(&claims.role).map_err(|msg| AppError::Core(CoreError::Forbidden(msg)))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
            organization_id: claims.org,
            investigator_id: claims.pi,
        })
    }
}
