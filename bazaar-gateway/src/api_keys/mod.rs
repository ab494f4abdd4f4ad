//! API key records, key material, and the store-backed validation path

pub mod handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::store::{Store, StoreError};

/// Prefix carried by all raw key material
pub const KEY_PREFIX: &str = "bzr_sk_";

/// A persisted API key record.
///
/// `key_hash` is a one-way digest of the raw key material; the raw value
/// is returned exactly once at issuance and cannot be recovered from
/// storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    /// Owning user; `None` for API-only integrations
    pub user_id: Option<String>,
    /// The external integration's project namespace
    pub project_id: String,
    pub name: String,
    pub key_hash: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    pub fn new(
        user_id: Option<String>,
        project_id: String,
        name: String,
        permissions: Vec<String>,
        expires_at: Option<DateTime<Utc>>,
        key_hash: String,
    ) -> Self {
        Self {
            id: format!("key_{}", uuid::Uuid::new_v4()),
            user_id,
            project_id,
            name,
            key_hash,
            permissions,
            is_active: true,
            expires_at,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the key may authenticate a request at `now`.
    ///
    /// An inactive key is unusable regardless of expiry; an expired key
    /// is unusable regardless of activation. A key without `expires_at`
    /// never expires.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Wire representation of a key record: everything except the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyMetadata {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKeyRecord> for ApiKeyMetadata {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            project_id: record.project_id.clone(),
            permissions: record.permissions.clone(),
            is_active: record.is_active,
            created_at: record.created_at,
            last_used_at: record.last_used_at,
            expires_at: record.expires_at,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ApiKeyError {
    /// No active record matches the presented key
    #[error("API key not found")]
    NotFound,

    /// The record's validity window has passed
    #[error("API key expired")]
    Expired,

    /// The store failed while deciding; never reported as a key failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiKeyError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound | Self::Expired => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_api_key",
                    "message": "Invalid, inactive or expired API key",
                })),
            )
                .into_response(),
            Self::Store(err) => {
                log::error!("store failure during API key validation: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "store_error",
                        "message": "Error validating API key",
                    })),
                )
                    .into_response()
            }
        }
    }
}

/// Generate fresh raw key material: prefix plus 32 random bytes.
pub fn generate_key_material() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", KEY_PREFIX, hex::encode(bytes))
}

/// One-way digest of a presented key value. Only digests are stored and
/// compared; the raw secret never touches the store or the logs.
pub fn hash_key(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate a presented API key against the store.
///
/// Lookup is digest-exact and filtered to active records; expiry is
/// checked separately against the current time. On success the
/// last-used timestamp is updated on a detached task whose failure is
/// logged and never joined into the request. No write occurs on any
/// failure path.
pub async fn validate_key(
    store: &Arc<dyn Store>,
    presented: &str,
) -> Result<ApiKeyRecord, ApiKeyError> {
    let digest = hash_key(presented);

    let record = store
        .find_active_key_by_hash(&digest)
        .await?
        .ok_or(ApiKeyError::NotFound)?;

    let now = Utc::now();
    if !record.is_usable_at(now) {
        return Err(ApiKeyError::Expired);
    }

    let touch_store = Arc::clone(store);
    let key_id = record.id.clone();
    tokio::spawn(async move {
        if let Err(err) = touch_store.touch_key(&key_id, now).await {
            log::warn!("failed to record usage for API key {}: {}", key_id, err);
        }
    });

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKeyRecord {
        ApiKeyRecord {
            is_active,
            expires_at,
            ..ApiKeyRecord::new(
                Some("user-1".to_string()),
                "proj-1".to_string(),
                "test key".to_string(),
                vec!["read:products".to_string()],
                None,
                hash_key("bzr_sk_dummy"),
            )
        }
    }

    #[test]
    fn test_key_material_shape() {
        let raw = generate_key_material();
        assert!(raw.starts_with(KEY_PREFIX));
        assert_eq!(raw.len(), KEY_PREFIX.len() + 64);
        assert_ne!(raw, generate_key_material());
    }

    #[test]
    fn test_digest_is_not_the_raw_value() {
        let raw = generate_key_material();
        let digest = hash_key(&raw);
        assert_ne!(digest, raw);
        assert_eq!(digest, hash_key(&raw));
        assert_ne!(digest, hash_key("bzr_sk_other"));
    }

    #[test]
    fn test_inactive_key_unusable_regardless_of_expiry() {
        let now = Utc::now();
        let unexpired = record(false, Some(now + Duration::days(30)));
        assert!(!unexpired.is_usable_at(now));

        let no_expiry = record(false, None);
        assert!(!no_expiry.is_usable_at(now));
    }

    #[test]
    fn test_expired_key_unusable_even_if_active() {
        let now = Utc::now();
        let expired = record(true, Some(now - Duration::hours(1)));
        assert!(!expired.is_usable_at(now));
    }

    #[test]
    fn test_key_without_expiry_never_expires() {
        let now = Utc::now();
        let record = record(true, None);
        // Still valid a year out
        assert!(record.is_usable_at(now + Duration::days(365)));
    }

    #[test]
    fn test_metadata_excludes_key_material() {
        let record = record(true, None);
        let metadata = ApiKeyMetadata::from(&record);
        let serialized = serde_json::to_string(&metadata).unwrap();
        assert!(!serialized.contains(&record.key_hash));
        assert!(!serialized.contains("keyHash"));
        assert!(serialized.contains("projectId"));
    }
}
