//! Product catalog model and the ownership gate

pub mod handlers;

use bazaar_auth::{AuthError, Principal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Lifecycle state of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Published,
    Archived,
}

impl Default for ProductStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// A catalog product. Every product has exactly one recorded owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub owner_id: String,
    pub category_id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

/// Payload for product creation.
///
/// Required fields are validated by hand so the request can be rejected
/// with a field-level message before any store access.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category_id: Option<String>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ApiError> {
        let missing = self.name.is_none()
            || self.slug.is_none()
            || self.price.is_none()
            || self.category_id.is_none();
        if missing {
            return Err(ApiError::Validation(
                "Required fields: name, slug, price, categoryId".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload for product updates.
///
/// This is a closed structure: ownership and identity fields
/// (`owner_id`, `id`, `created_at`) have no representation here, so a
/// caller attempting to set them is silently stripped before anything
/// reaches persistence. Ownership transfer is not an update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category_id: Option<String>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

/// Query filter for the public product listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ProductFilter {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(20) as usize
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }
}

/// The ownership gate: a mutation passes only when the acting principal
/// is the resource's recorded owner or holds the elevated role.
///
/// `owner_id` must come from a fresh store read, never from the request
/// payload.
pub fn ensure_owner(principal: &Principal, owner_id: &str) -> Result<(), AuthError> {
    if principal.subject == owner_id || principal.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "You can only modify your own products".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_auth::UserRole;

    fn principal(subject: &str, role: UserRole) -> Principal {
        Principal {
            subject: subject.to_string(),
            email: None,
            role,
            integration: None,
        }
    }

    #[test]
    fn test_owner_passes_gate() {
        let owner = principal("user-a", UserRole::Developer);
        assert!(ensure_owner(&owner, "user-a").is_ok());
    }

    #[test]
    fn test_non_owner_rejected() {
        let intruder = principal("user-b", UserRole::Developer);
        assert!(matches!(
            ensure_owner(&intruder, "user-a"),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_bypasses_ownership() {
        let admin = principal("user-c", UserRole::Admin);
        assert!(ensure_owner(&admin, "user-a").is_ok());
    }

    #[test]
    fn test_new_product_validation() {
        let mut input = NewProduct {
            name: Some("Widget".to_string()),
            slug: Some("widget".to_string()),
            price: Some(9.99),
            category_id: Some("cat-1".to_string()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.category_id = None;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_payload_has_no_ownership_fields() {
        // A payload trying to reassign ownership deserializes with the
        // foreign fields dropped on the floor.
        let raw = r#"{
            "name": "Renamed",
            "ownerId": "attacker",
            "owner_id": "attacker",
            "id": "other-id",
            "createdAt": "2020-01-01T00:00:00Z"
        }"#;

        let update: ProductUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.name.as_deref(), Some("Renamed"));
        // Nothing else survives to reach the store.
        assert!(update.slug.is_none());
        assert!(update.category_id.is_none());
    }
}
