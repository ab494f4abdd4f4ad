use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use bazaar_auth::{AuthError, Integration, Principal, UserRole};

use crate::api::AppState;
use crate::api_keys::{validate_key, ApiKeyRecord};

/// Header carrying an opaque API key
pub const API_KEY_HEADER: &str = "X-API-Key";

const BEARER_PREFIX: &str = "Bearer ";

/// Translate a validated key record into a request principal.
///
/// The subject is the linked user when the key is user-bound, otherwise
/// a synthetic keyed identity. Key principals carry no first-party role
/// and fall back to the lowest-privilege default.
pub fn principal_from_key(record: &ApiKeyRecord) -> Principal {
    let subject = match &record.user_id {
        Some(user_id) => user_id.clone(),
        None => format!("key:{}", record.id),
    };

    Principal {
        subject,
        email: None,
        role: UserRole::default(),
        integration: Some(Integration {
            project_id: record.project_id.clone(),
            permissions: record.permissions.clone(),
            linked_user: record.user_id.clone(),
        }),
    }
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| value.starts_with(BEARER_PREFIX))
        .map(|value| value[BEARER_PREFIX.len()..].to_string())
}

fn api_key(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// The auth dispatcher. Picks exactly one verification path per request:
/// a Bearer token when present (first-party sessions take precedence),
/// otherwise an API key, otherwise the request is rejected. There is no
/// fallback from a failed token to a key lookup.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        match state.verifier.verify(&token) {
            Ok(claims) => {
                request
                    .extensions_mut()
                    .insert(Principal::from_claims(&claims));
                next.run(request).await
            }
            Err(err) => err.into_response(),
        }
    } else if let Some(presented) = api_key(&request) {
        match validate_key(&state.store, &presented).await {
            Ok(record) => {
                request.extensions_mut().insert(principal_from_key(&record));
                next.run(request).await
            }
            Err(err) => err.into_response(),
        }
    } else {
        AuthError::MissingCredentials.into_response()
    }
}

/// Bearer-only authentication for endpoints that manage credentials: a
/// first-party session is required, an API key cannot manage keys.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        return AuthError::MissingCredentials.into_response();
    };

    match state.verifier.verify(&token) {
        Ok(claims) => {
            request
                .extensions_mut()
                .insert(Principal::from_claims(&claims));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Extractor for the principal established by the auth middleware
pub struct AuthPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthPrincipal)
            .ok_or_else(|| AuthError::MissingCredentials.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_keys::hash_key;

    fn record(user_id: Option<&str>) -> ApiKeyRecord {
        ApiKeyRecord::new(
            user_id.map(str::to_string),
            "proj-1".to_string(),
            "integration".to_string(),
            vec!["read:products".to_string()],
            None,
            hash_key("bzr_sk_dummy"),
        )
    }

    #[test]
    fn test_linked_key_principal_uses_user_subject() {
        let record = record(Some("user-42"));
        let principal = principal_from_key(&record);
        assert_eq!(principal.subject, "user-42");
        assert_eq!(principal.role, UserRole::Buyer);

        let integration = principal.integration.unwrap();
        assert_eq!(integration.project_id, "proj-1");
        assert_eq!(integration.linked_user.as_deref(), Some("user-42"));
    }

    #[test]
    fn test_api_only_key_gets_synthetic_subject() {
        let record = record(None);
        let principal = principal_from_key(&record);
        assert_eq!(principal.subject, format!("key:{}", record.id));
        assert!(principal.integration.unwrap().linked_user.is_none());
    }
}
