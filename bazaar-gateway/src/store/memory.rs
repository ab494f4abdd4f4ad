//! In-process store backend for tests and local development

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::api_keys::ApiKeyRecord;
use crate::products::{
    Category, NewProduct, Product, ProductFilter, ProductStatus, ProductUpdate,
};
use crate::store::{KeyStore, ProductStore, StoreError};

/// In-memory store. State lives behind a `tokio` lock; operations mirror
/// the row-level semantics of the relational backend.
#[derive(Default)]
pub struct MemoryStore {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
    products: RwLock<HashMap<String, Product>>,
    categories: RwLock<Vec<Category>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed categories, for tests and demo data
    pub async fn seed_categories(&self, categories: Vec<Category>) {
        *self.categories.write().await = categories;
    }
}

fn digest_matches(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn insert_key(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, StoreError> {
        let mut keys = self.keys.write().await;
        keys.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_active_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let keys = self.keys.read().await;
        Ok(keys
            .values()
            .find(|record| record.is_active && digest_matches(&record.key_hash, key_hash))
            .cloned())
    }

    async fn find_active_key_for_project(
        &self,
        key_hash: &str,
        project_id: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let keys = self.keys.read().await;
        Ok(keys
            .values()
            .find(|record| {
                record.is_active
                    && record.project_id == project_id
                    && digest_matches(&record.key_hash, key_hash)
            })
            .cloned())
    }

    async fn list_keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let keys = self.keys.read().await;
        let mut records: Vec<ApiKeyRecord> = keys
            .values()
            .filter(|record| record.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn deactivate_key(&self, key_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let mut keys = self.keys.write().await;
        match keys.get_mut(key_id) {
            Some(record) if record.user_id.as_deref() == Some(user_id) => {
                // Flipping false to false is a no-op; revocation is
                // idempotent.
                record.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_key(&self, key_id: &str, when: DateTime<Utc>) -> Result<(), StoreError> {
        let mut keys = self.keys.write().await;
        if let Some(record) = keys.get_mut(key_id) {
            record.last_used_at = Some(when);
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_published(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        let mut listed: Vec<Product> = products
            .values()
            .filter(|product| product.status == ProductStatus::Published)
            .filter(|product| match &filter.category {
                Some(category) => &product.category_id == category,
                None => true,
            })
            .filter(|product| match &filter.search {
                Some(term) => product.name.to_lowercase().contains(&term.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit())
            .collect())
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .find(|product| product.slug == slug && product.status == ProductStatus::Published)
            .cloned())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        let mut owned: Vec<Product> = products
            .values()
            .filter(|product| product.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert_product(
        &self,
        owner_id: &str,
        input: NewProduct,
    ) -> Result<Product, StoreError> {
        let mut products = self.products.write().await;

        let slug = input.slug.clone().unwrap_or_default();
        if products.values().any(|product| product.slug == slug) {
            return Err(StoreError::Conflict(
                "Product with this slug already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let product = Product {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            category_id: input.category_id.unwrap_or_default(),
            name: input.name.unwrap_or_default(),
            slug,
            description: input.description,
            price: input.price.unwrap_or_default(),
            stock: input.stock.unwrap_or(0),
            image_url: input.image_url,
            images: input.images.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn get_product_owner(&self, product_id: &str) -> Result<Option<String>, StoreError> {
        let products = self.products.read().await;
        Ok(products
            .get(product_id)
            .map(|product| product.owner_id.clone()))
    }

    async fn update_product(
        &self,
        product_id: &str,
        changes: ProductUpdate,
    ) -> Result<Option<Product>, StoreError> {
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(product_id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(slug) = changes.slug {
            product.slug = slug;
        }
        if let Some(description) = changes.description {
            product.description = Some(description);
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(stock) = changes.stock {
            product.stock = stock;
        }
        if let Some(category_id) = changes.category_id {
            product.category_id = category_id;
        }
        if let Some(image_url) = changes.image_url {
            product.image_url = Some(image_url);
        }
        if let Some(images) = changes.images {
            product.images = images;
        }
        if let Some(status) = changes.status {
            product.status = status;
        }
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, product_id: &str) -> Result<bool, StoreError> {
        let mut products = self.products.write().await;
        Ok(products.remove(product_id).is_some())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories = self.categories.read().await;
        let mut active: Vec<Category> = categories
            .iter()
            .filter(|category| category.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }
}
