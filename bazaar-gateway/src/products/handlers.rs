//! Catalog endpoints: public reads plus owner-scoped developer CRUD

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use bazaar_auth::{require_role, UserRole};

use crate::api::AppState;
use crate::auth::AuthPrincipal;
use crate::error::ApiError;
use crate::products::{ensure_owner, NewProduct, ProductFilter, ProductUpdate};

/// Roles allowed to manage catalog entries
const CATALOG_ROLES: &[UserRole] = &[UserRole::Developer, UserRole::Admin];

/// Public listing of published products with optional filters.
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Response, ApiError> {
    let products = state.store.list_published(&filter).await?;
    Ok(Json(json!({
        "products": products,
        "pagination": {
            "total": products.len(),
            "limit": filter.limit(),
            "offset": filter.offset(),
        },
    }))
    .into_response())
}

/// Public product detail, published entries only.
pub async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let product = state
        .store
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(json!({ "product": product })).into_response())
}

/// Public list of active categories.
pub async fn list_categories(State(state): State<AppState>) -> Result<Response, ApiError> {
    let categories = state.store.list_categories().await?;
    Ok(Json(json!({ "categories": categories })).into_response())
}

/// Products owned by the authenticated developer.
pub async fn my_products(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Response, ApiError> {
    require_role(&principal, CATALOG_ROLES)?;

    let products = state.store.list_for_owner(&principal.subject).await?;
    Ok(Json(json!({ "products": products })).into_response())
}

/// Create a product. The owner is always the authenticated principal;
/// the payload cannot name one.
pub async fn create_product(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(input): Json<NewProduct>,
) -> Result<Response, ApiError> {
    require_role(&principal, CATALOG_ROLES)?;
    input.validate()?;

    let product = state
        .store
        .insert_product(&principal.subject, input)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "product": product }))).into_response())
}

/// Update a product owned by the authenticated principal.
///
/// The current owner is re-fetched from the store before the mutation is
/// allowed; nothing in the payload is trusted for the ownership
/// decision, and the payload itself cannot carry ownership fields.
pub async fn update_product(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(product_id): Path<String>,
    Json(changes): Json<ProductUpdate>,
) -> Result<Response, ApiError> {
    require_role(&principal, CATALOG_ROLES)?;

    let owner_id = state
        .store
        .get_product_owner(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    ensure_owner(&principal, &owner_id)?;

    let product = state
        .store
        .update_product(&product_id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(json!({ "product": product })).into_response())
}

/// Delete a product owned by the authenticated principal.
pub async fn delete_product(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(product_id): Path<String>,
) -> Result<Response, ApiError> {
    require_role(&principal, CATALOG_ROLES)?;

    let owner_id = state
        .store
        .get_product_owner(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    ensure_owner(&principal, &owner_id)?;

    if !state.store.delete_product(&product_id).await? {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }
    Ok(Json(json!({ "message": "Product deleted successfully" })).into_response())
}
