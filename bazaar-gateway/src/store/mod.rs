//! Storage backends for the gateway
//!
//! - Rest: relational row store reached over HTTP, used in production
//! - Memory: in-process store for tests and local development
//!
//! All state lives behind these traits; request handling keeps no shared
//! mutable state of its own.

mod memory;
mod rest;

pub use memory::MemoryStore;
pub use rest::{RestConfig, RestStore};

pub use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api_keys::ApiKeyRecord;
use crate::products::{Category, NewProduct, Product, ProductFilter, ProductUpdate};

/// Storage errors.
///
/// Infrastructure failures (`Timeout`, `Unavailable`, `Internal`) are
/// surfaced to callers as internal errors; they are never converted into
/// a "not found" or an authorization decision.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store call timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// Persistence operations for API key records
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Persist a freshly issued key record
    async fn insert_key(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, StoreError>;

    /// Exact-match lookup by key digest, filtered to active records
    async fn find_active_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Lookup by key digest additionally scoped to a project, filtered to
    /// active records
    async fn find_active_key_for_project(
        &self,
        key_hash: &str,
        project_id: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// All records owned by a user, newest first
    async fn list_keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError>;

    /// Flip `is_active` off on a record owned by `user_id`.
    ///
    /// Returns `false` when no record matches the id/owner pair; callers
    /// must not learn whether the id exists under another owner.
    async fn deactivate_key(&self, key_id: &str, user_id: &str) -> Result<bool, StoreError>;

    /// Record key usage. Single-field update; callers treat failures as
    /// non-fatal.
    async fn touch_key(&self, key_id: &str, when: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Persistence operations for the product catalog
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_published(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError>;

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Product>, StoreError>;

    /// Insert a product; a duplicate slug is a `Conflict`
    async fn insert_product(
        &self,
        owner_id: &str,
        input: NewProduct,
    ) -> Result<Product, StoreError>;

    /// Current recorded owner of a product, fetched at decision time
    async fn get_product_owner(&self, product_id: &str) -> Result<Option<String>, StoreError>;

    async fn update_product(
        &self,
        product_id: &str,
        changes: ProductUpdate,
    ) -> Result<Option<Product>, StoreError>;

    /// Returns `false` when the product does not exist
    async fn delete_product(&self, product_id: &str) -> Result<bool, StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
}

/// Combined storage interface the gateway is generic over
pub trait Store: KeyStore + ProductStore {}

impl<T: KeyStore + ProductStore> Store for T {}
