use serde::{Deserialize, Serialize};

use crate::claims::{Claims, UserRole};
use crate::error::AuthError;

/// Integration metadata carried by API-key authenticated principals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    /// The external integration's project namespace
    pub project_id: String,
    /// Permission strings granted to the key
    pub permissions: Vec<String>,
    /// User linked to the key, when the integration is user-bound
    pub linked_user: Option<String>,
}

/// The normalized result of authenticating one request.
///
/// A principal is created fresh per request and carried in request
/// extensions; it is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable subject identifier
    pub subject: String,
    pub email: Option<String>,
    pub role: UserRole,
    /// Present only when the request authenticated via API key
    pub integration: Option<Integration>,
}

impl Principal {
    /// Build a principal from a verified bearer-token claim set.
    ///
    /// The claims are guaranteed by the verifier to carry a subject.
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            subject: claims.subject().unwrap_or_default().to_string(),
            email: claims.email.clone(),
            role: claims.user_role(),
            integration: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// The role gate: pass when the principal's role is a member of the
/// allowed set. Membership is exact; no role hierarchy is consulted.
pub fn require_role(principal: &Principal, allowed: &[UserRole]) -> Result<(), AuthError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        let names: Vec<&str> = allowed.iter().map(|role| role.as_str()).collect();
        Err(AuthError::Forbidden(format!(
            "Access denied. Required roles: {}",
            names.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal_with_role(role: UserRole) -> Principal {
        Principal {
            subject: "user-1".to_string(),
            email: None,
            role,
            integration: None,
        }
    }

    #[test]
    fn test_buyer_rejected_from_developer_operation() {
        let buyer = principal_with_role(UserRole::Buyer);
        let result = require_role(&buyer, &[UserRole::Developer, UserRole::Admin]);
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
    }

    #[test]
    fn test_admin_accepted_for_developer_operation() {
        let admin = principal_with_role(UserRole::Admin);
        assert!(require_role(&admin, &[UserRole::Developer, UserRole::Admin]).is_ok());
    }

    #[test]
    fn test_membership_is_exact_not_hierarchical() {
        // Admin outranks Developer in spirit, but the gate checks set
        // membership only.
        let admin = principal_with_role(UserRole::Admin);
        assert!(require_role(&admin, &[UserRole::Developer]).is_err());

        let developer = principal_with_role(UserRole::Developer);
        assert!(require_role(&developer, &[UserRole::Developer]).is_ok());
    }

    #[test]
    fn test_principal_from_claims() {
        let payload = r#"{
            "sub": "user-7",
            "email": "u@example.com",
            "role": "Developer",
            "exp": 1703980800
        }"#;
        let claims: Claims = serde_json::from_str(payload).unwrap();

        let principal = Principal::from_claims(&claims);
        assert_eq!(principal.subject, "user-7");
        assert_eq!(principal.email.as_deref(), Some("u@example.com"));
        assert_eq!(principal.role, UserRole::Developer);
        assert!(principal.integration.is_none());
    }
}
