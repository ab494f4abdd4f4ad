use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use crate::claims::Claims;
use crate::error::AuthError;

/// Default leeway in seconds for token time validation
const DEFAULT_LEEWAY: u64 = 60;

/// Verifier for bearer tokens issued by the identity authority.
///
/// Verification is symmetric: every token must validate against the one
/// shared secret this verifier was constructed with. The verifier is
/// built once at startup and injected into request handling; it performs
/// no I/O.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_leeway(secret, DEFAULT_LEEWAY)
    }

    /// Create a verifier with a custom leeway for time-based validation.
    pub fn with_leeway(secret: &[u8], leeway: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway;
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify a bearer token and return its claim set.
    ///
    /// The token must be a three-part signed structure whose signature
    /// validates against the shared secret and whose validity window
    /// includes the current time. A token without a usable subject claim
    /// is rejected as malformed.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            },
        )?;

        if data.claims.subject().is_none() {
            return Err(AuthError::MalformedToken);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The decoding key wraps the shared secret
        write!(f, "TokenVerifier([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::UserRole;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-signing";

    fn now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn sign(payload: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let token = sign(json!({
            "sub": "user-123",
            "email": "dev@example.com",
            "role": "Developer",
            "exp": now() + 3600,
            "iat": now(),
        }));

        let verifier = TokenVerifier::new(TEST_SECRET);
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.subject(), Some("user-123"));
        assert_eq!(claims.user_role(), UserRole::Developer);
    }

    #[test]
    fn test_verify_tampered_signature() {
        let token = sign(json!({ "sub": "user-123", "exp": now() + 3600 }));

        // Flip a byte in the signature segment
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let verifier = TokenVerifier::new(TEST_SECRET);
        assert!(matches!(
            verifier.verify(&tampered),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let token = sign(json!({ "sub": "user-123", "exp": now() + 3600 }));

        let verifier = TokenVerifier::new(b"a-different-secret");
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_expired_token() {
        let token = sign(json!({ "sub": "user-123", "exp": now() - 3600 }));

        let verifier = TokenVerifier::with_leeway(TEST_SECRET, 0);
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_verify_garbage_token() {
        let verifier = TokenVerifier::new(TEST_SECRET);
        assert!(matches!(
            verifier.verify("not-a-token"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_verify_token_without_subject() {
        let token = sign(json!({ "email": "dev@example.com", "exp": now() + 3600 }));

        let verifier = TokenVerifier::new(TEST_SECRET);
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_subject_fallback_to_id_claim() {
        let token = sign(json!({ "id": "legacy-9", "exp": now() + 3600 }));

        let verifier = TokenVerifier::new(TEST_SECRET);
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.subject(), Some("legacy-9"));
    }
}
