//! Relational row store reached over HTTP
//!
//! Speaks a PostgREST-style row API: one path segment per table, filters
//! as `column=op.value` query parameters. Every round-trip is bounded by
//! the client timeout; a timeout surfaces as `StoreError::Timeout`,
//! never as a missing row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::api_keys::ApiKeyRecord;
use crate::products::{Category, NewProduct, Product, ProductFilter, ProductUpdate};
use crate::store::{KeyStore, ProductStore, StoreError};

/// Default bound on a single store round-trip
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the row store
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the row API, e.g. `https://db.example.com/rest/v1`
    pub base_url: String,
    /// Service credential sent with every request
    pub service_key: Option<String>,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: String, service_key: Option<String>) -> Self {
        Self {
            base_url,
            service_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct RestStore {
    client: Client,
    config: RestConfig,
}

impl RestStore {
    pub fn new(config: RestConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }

    fn request(&self, method: Method, table: &str, query: &[(&str, String)]) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), table);
        let mut req = self.client.request(method, url).query(query);
        if let Some(key) = &self.config.service_key {
            req = req
                .header("apikey", key)
                .header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        req
    }

    fn map_transport_error(err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let response = req.send().await.map_err(Self::map_transport_error)?;

        match response.status() {
            status if status.is_success() => response
                .json::<Vec<T>>()
                .await
                .map_err(|err| StoreError::Internal(err.to_string())),
            StatusCode::CONFLICT => {
                Err(StoreError::Conflict("Row violates a unique constraint".to_string()))
            }
            status => Err(StoreError::Internal(format!(
                "row store returned status {}",
                status
            ))),
        }
    }

    async fn execute(&self, req: RequestBuilder) -> Result<(), StoreError> {
        let response = req.send().await.map_err(Self::map_transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Internal(format!(
                "row store returned status {}",
                response.status()
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwnerRow {
    owner_id: String,
}

/// Serialize only the fields present in an update payload, keyed by the
/// store's column names.
fn product_update_row(changes: &ProductUpdate) -> Map<String, Value> {
    let mut row = Map::new();
    if let Some(name) = &changes.name {
        row.insert("name".to_string(), json!(name));
    }
    if let Some(slug) = &changes.slug {
        row.insert("slug".to_string(), json!(slug));
    }
    if let Some(description) = &changes.description {
        row.insert("description".to_string(), json!(description));
    }
    if let Some(price) = changes.price {
        row.insert("price".to_string(), json!(price));
    }
    if let Some(stock) = changes.stock {
        row.insert("stock".to_string(), json!(stock));
    }
    if let Some(category_id) = &changes.category_id {
        row.insert("category_id".to_string(), json!(category_id));
    }
    if let Some(image_url) = &changes.image_url {
        row.insert("image_url".to_string(), json!(image_url));
    }
    if let Some(images) = &changes.images {
        row.insert("images".to_string(), json!(images));
    }
    if let Some(status) = changes.status {
        row.insert("status".to_string(), json!(status));
    }
    row.insert("updated_at".to_string(), json!(Utc::now()));
    row
}

#[async_trait]
impl KeyStore for RestStore {
    async fn insert_key(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, StoreError> {
        let rows: Vec<ApiKeyRecord> = self
            .rows(
                self.request(Method::POST, "api_keys", &[])
                    .header("Prefer", "return=representation")
                    .json(&record),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Internal("insert returned no row".to_string()))
    }

    async fn find_active_key_by_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let rows: Vec<ApiKeyRecord> = self
            .rows(self.request(
                Method::GET,
                "api_keys",
                &[
                    ("key_hash", format!("eq.{}", key_hash)),
                    ("is_active", "eq.true".to_string()),
                    ("limit", "1".to_string()),
                ],
            ))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_active_key_for_project(
        &self,
        key_hash: &str,
        project_id: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let rows: Vec<ApiKeyRecord> = self
            .rows(self.request(
                Method::GET,
                "api_keys",
                &[
                    ("key_hash", format!("eq.{}", key_hash)),
                    ("project_id", format!("eq.{}", project_id)),
                    ("is_active", "eq.true".to_string()),
                    ("limit", "1".to_string()),
                ],
            ))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        self.rows(self.request(
            Method::GET,
            "api_keys",
            &[
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ],
        ))
        .await
    }

    async fn deactivate_key(&self, key_id: &str, user_id: &str) -> Result<bool, StoreError> {
        // The owner filter is part of the update predicate, so a foreign
        // id updates zero rows and is indistinguishable from a missing id.
        let rows: Vec<ApiKeyRecord> = self
            .rows(
                self.request(
                    Method::PATCH,
                    "api_keys",
                    &[
                        ("id", format!("eq.{}", key_id)),
                        ("user_id", format!("eq.{}", user_id)),
                    ],
                )
                .header("Prefer", "return=representation")
                .json(&json!({ "is_active": false })),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn touch_key(&self, key_id: &str, when: DateTime<Utc>) -> Result<(), StoreError> {
        self.execute(
            self.request(Method::PATCH, "api_keys", &[("id", format!("eq.{}", key_id))])
                .json(&json!({ "last_used_at": when })),
        )
        .await
    }
}

#[async_trait]
impl ProductStore for RestStore {
    async fn list_published(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let mut query = vec![
            ("status", "eq.published".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", filter.limit().to_string()),
            ("offset", filter.offset().to_string()),
        ];
        if let Some(category) = &filter.category {
            query.push(("category_id", format!("eq.{}", category)));
        }
        if let Some(term) = &filter.search {
            query.push(("name", format!("ilike.*{}*", term)));
        }
        self.rows(self.request(Method::GET, "products", &query)).await
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        let rows: Vec<Product> = self
            .rows(self.request(
                Method::GET,
                "products",
                &[
                    ("slug", format!("eq.{}", slug)),
                    ("status", "eq.published".to_string()),
                    ("limit", "1".to_string()),
                ],
            ))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Product>, StoreError> {
        self.rows(self.request(
            Method::GET,
            "products",
            &[
                ("owner_id", format!("eq.{}", owner_id)),
                ("order", "created_at.desc".to_string()),
            ],
        ))
        .await
    }

    async fn insert_product(
        &self,
        owner_id: &str,
        input: NewProduct,
    ) -> Result<Product, StoreError> {
        let now = Utc::now();
        let row = Product {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            category_id: input.category_id.unwrap_or_default(),
            name: input.name.unwrap_or_default(),
            slug: input.slug.unwrap_or_default(),
            description: input.description,
            price: input.price.unwrap_or_default(),
            stock: input.stock.unwrap_or(0),
            image_url: input.image_url,
            images: input.images.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let rows: Vec<Product> = self
            .rows(
                self.request(Method::POST, "products", &[])
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => {
                    StoreError::Conflict("Product with this slug already exists".to_string())
                }
                other => other,
            })?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Internal("insert returned no row".to_string()))
    }

    async fn get_product_owner(&self, product_id: &str) -> Result<Option<String>, StoreError> {
        let rows: Vec<OwnerRow> = self
            .rows(self.request(
                Method::GET,
                "products",
                &[
                    ("id", format!("eq.{}", product_id)),
                    ("select", "owner_id".to_string()),
                ],
            ))
            .await?;
        Ok(rows.into_iter().next().map(|row| row.owner_id))
    }

    async fn update_product(
        &self,
        product_id: &str,
        changes: ProductUpdate,
    ) -> Result<Option<Product>, StoreError> {
        let rows: Vec<Product> = self
            .rows(
                self.request(Method::PATCH, "products", &[("id", format!("eq.{}", product_id))])
                    .header("Prefer", "return=representation")
                    .json(&Value::Object(product_update_row(&changes))),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_product(&self, product_id: &str) -> Result<bool, StoreError> {
        let rows: Vec<Product> = self
            .rows(
                self.request(Method::DELETE, "products", &[("id", format!("eq.{}", product_id))])
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.rows(self.request(
            Method::GET,
            "categories",
            &[
                ("is_active", "eq.true".to_string()),
                ("order", "name.asc".to_string()),
            ],
        ))
        .await
    }
}
