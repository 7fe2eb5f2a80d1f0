//! Role name constants.
//!
//! The closed set of roles the authentication layer may assert. Role
//! dispatch happens on the API's `Principal` enum, never on ad hoc
//! string comparisons in handlers.

pub const ROLE_ADMIN: &str = "admin";
/// Organization user who creates and withdraws submissions.
pub const ROLE_SPONSOR: &str = "sponsor";
/// Principal investigator; reviews received submissions.
pub const ROLE_INVESTIGATOR: &str = "investigator";
/// Read-only compliance role; queries and verifies the audit chain.
pub const ROLE_AUDITOR: &str = "auditor";

pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_SPONSOR, ROLE_INVESTIGATOR, ROLE_AUDITOR];

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_accepted() {
        for role in VALID_ROLES {
            assert!(validate_role(role).is_ok());
        }
    }

    #[test]
    fn unknown_role_rejected() {
        let err = validate_role("superuser").unwrap_err();
        assert!(err.contains("Invalid role"));
    }
}
