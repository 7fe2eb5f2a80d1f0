//! JWT access-token validation.
//!
//! Token issuance belongs to the platform's external identity service;
//! this service only verifies HS256 signatures and extracts the
//! claims. `generate_token` exists for tests and local tooling.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use trialgate_core::types::DbId;
use uuid::Uuid;

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Role name from the closed set in `trialgate_core::roles`.
    pub role: String,
    /// Tenant the user belongs to. Absent for platform admins and
    /// investigator accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<DbId>,
    /// Investigator identity for users with the `investigator` role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi: Option<DbId>,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier.
    pub jti: String,
}

/// Configuration for token validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret shared with the identity service.
    pub secret: String,
    /// Token lifetime in minutes when generating (tests/tooling).
    pub expiry_mins: i64,
}

const DEFAULT_EXPIRY_MINS: i64 = 15;

impl JwtConfig {
    /// Load from `JWT_SECRET` (required) and `JWT_EXPIRY_MINS`.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let expiry_mins = std::env::var("JWT_EXPIRY_MINS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EXPIRY_MINS);

        Self {
            secret,
            expiry_mins,
        }
    }
}

/// Validate a token and return its claims.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Sign a token for the given identity. Test/tooling helper; the
/// production issuer is external.
pub fn generate_token(
    config: &JwtConfig,
    user_id: DbId,
    role: &str,
    org: Option<DbId>,
    pi: Option<DbId>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        org,
        pi,
        exp: (now + chrono::Duration::minutes(config.expiry_mins)).timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialgate_core::roles::{ROLE_INVESTIGATOR, ROLE_SPONSOR};

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiry_mins: 5,
        }
    }

    #[test]
    fn round_trip_preserves_claims() {
        let cfg = config();
        let token = generate_token(&cfg, 42, ROLE_SPONSOR, Some(7), None).unwrap();
        let claims = validate_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, ROLE_SPONSOR);
        assert_eq!(claims.org, Some(7));
        assert_eq!(claims.pi, None);
    }

    #[test]
    fn investigator_token_carries_pi_claim() {
        let cfg = config();
        let token = generate_token(&cfg, 9, ROLE_INVESTIGATOR, None, Some(3)).unwrap();
        let claims = validate_token(&token, &cfg).unwrap();
        assert_eq!(claims.pi, Some(3));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(&config(), 1, ROLE_SPONSOR, Some(1), None).unwrap();
        let other = JwtConfig {
            secret: "different".to_string(),
            expiry_mins: 5,
        };
        assert!(validate_token(&token, &other).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(validate_token("not.a.token", &config()).is_err());
    }
}
