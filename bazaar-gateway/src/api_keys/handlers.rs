//! Credential lifecycle endpoints and the integration validator

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::AppState;
use crate::api_keys::{
    generate_key_material, hash_key, ApiKeyMetadata, ApiKeyRecord, KEY_PREFIX,
};
use crate::auth::AuthPrincipal;
use crate::error::ApiError;

/// Request to issue a new API key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: Option<String>,
    pub project_id: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    /// Days until expiration; 0 or absent means the key never expires
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

/// Issuance response. The raw key appears here and nowhere else.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub api_key: String,
    pub key_id: String,
    pub project_id: String,
    pub permissions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyMetadata>,
}

/// Issue a new API key on behalf of the authenticated user.
pub async fn create_api_key(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<Response, ApiError> {
    let (Some(name), Some(project_id)) = (request.name, request.project_id) else {
        return Err(ApiError::Validation(
            "Required fields: name, projectId".to_string(),
        ));
    };

    let expires_in_days = request.expires_in_days.unwrap_or(0);
    if expires_in_days < 0 {
        return Err(ApiError::Validation(
            "expiresInDays must be zero or positive".to_string(),
        ));
    }
    let expires_at = if expires_in_days > 0 {
        Some(Utc::now() + Duration::days(expires_in_days))
    } else {
        None
    };

    let raw_key = generate_key_material();
    let record = ApiKeyRecord::new(
        Some(principal.subject.clone()),
        project_id,
        name,
        request.permissions.unwrap_or_default(),
        expires_at,
        hash_key(&raw_key),
    );

    let stored = state.store.insert_key(record).await?;
    log::info!(
        "issued API key {} for project {} (user {})",
        stored.id,
        stored.project_id,
        principal.subject
    );

    let response = CreateApiKeyResponse {
        api_key: raw_key,
        key_id: stored.id,
        project_id: stored.project_id,
        permissions: stored.permissions,
        expires_at: stored.expires_at,
        message: "Save this API key securely. It will not be shown again.".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// List the authenticated user's keys, newest first. The raw key
/// material is not part of the record and the digest is not serialized.
pub async fn list_my_keys(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Response, ApiError> {
    let records = state.store.list_keys_for_user(&principal.subject).await?;
    let api_keys = records.iter().map(ApiKeyMetadata::from).collect();
    Ok(Json(ListApiKeysResponse { api_keys }).into_response())
}

/// Revoke a key owned by the authenticated user.
///
/// A key that does not exist and a key owned by someone else produce the
/// same not-found answer, so callers cannot probe for other users' keys.
/// Revoking an already-revoked key succeeds.
pub async fn revoke_api_key(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(key_id): Path<String>,
) -> Result<Response, ApiError> {
    let revoked = state
        .store
        .deactivate_key(&key_id, &principal.subject)
        .await?;

    if !revoked {
        return Err(ApiError::NotFound(
            "API key not found or unauthorized".to_string(),
        ));
    }

    log::info!("revoked API key {} (user {})", key_id, principal.subject);
    Ok(Json(json!({ "message": "API key revoked successfully" })).into_response())
}

/// Request body for the out-of-band credential probe
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateIntegrationRequest {
    pub token: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Validate a credential presented in a request body for a declared
/// project. Key-shaped values are matched against the project's active,
/// unexpired keys; anything else is verified as a bearer token.
pub async fn validate_integration(
    State(state): State<AppState>,
    Json(request): Json<ValidateIntegrationRequest>,
) -> Result<Response, ApiError> {
    if request.token.starts_with(KEY_PREFIX) {
        let Some(project_id) = request.project_id else {
            return Err(ApiError::Validation(
                "Required field: projectId".to_string(),
            ));
        };

        let digest = hash_key(&request.token);
        let record = state
            .store
            .find_active_key_for_project(&digest, &project_id)
            .await?;

        let valid = record
            .as_ref()
            .map(|record| record.is_usable_at(Utc::now()))
            .unwrap_or(false);
        let Some(record) = record.filter(|_| valid) else {
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "valid": false, "message": "Invalid API key" })),
            )
                .into_response());
        };

        let integration_type = if record.user_id.is_some() {
            "linked"
        } else {
            "api-only"
        };
        Ok(Json(json!({
            "valid": true,
            "integrationType": integration_type,
            "projectId": record.project_id,
            "permissions": record.permissions,
            "userId": record.user_id,
        }))
        .into_response())
    } else {
        match state.verifier.verify(&request.token) {
            Ok(claims) => Ok(Json(json!({
                "valid": true,
                "integrationType": "full",
                "user": {
                    "id": claims.subject(),
                    "email": claims.email,
                    "role": claims.user_role().as_str(),
                },
            }))
            .into_response()),
            Err(err) => Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "valid": false, "message": err.to_string() })),
            )
                .into_response()),
        }
    }
}
