//! Router assembly and shared request state

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use bazaar_auth::TokenVerifier;

use crate::api_keys::handlers::{
    create_api_key, list_my_keys, revoke_api_key, validate_integration,
};
use crate::auth::{auth_middleware, token_auth_middleware};
use crate::products::handlers::{
    create_product, delete_product, get_product_by_slug, list_categories, list_products,
    my_products, update_product,
};
use crate::store::Store;

/// Shared state handed to every request handler. Built once in `main`
/// and injected; there is no global service instance.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }
}

async fn pong() -> &'static str {
    "pong"
}

/// Build the gateway router.
///
/// Route groups and their auth layers:
/// - public catalog reads and the integration validator: no auth
/// - developer catalog routes: auth dispatcher (token or API key), with
///   role and ownership gates applied in the handlers
/// - credential lifecycle routes: bearer token only
pub fn app(state: AppState) -> Router {
    let lifecycle = Router::new()
        .route("/generate-api-key", post(create_api_key))
        .route("/my-keys", get(list_my_keys))
        .route("/revoke-key/:key_id", delete(revoke_api_key))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            token_auth_middleware,
        ));

    let integration = Router::new()
        .route("/validate-integration", post(validate_integration))
        .merge(lifecycle);

    let developer = Router::new()
        .route("/my-products", get(my_products))
        .route("/products", post(create_product))
        .route(
            "/products/:id",
            put(update_product).delete(delete_product),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/ping", get(pong))
        .route("/api/products", get(list_products))
        .route("/api/products/categories/list", get(list_categories))
        .route("/api/products/:slug", get(get_product_by_slug))
        .nest("/api/products/developer", developer)
        .nest("/api/integration", integration)
        .with_state(state)
}
