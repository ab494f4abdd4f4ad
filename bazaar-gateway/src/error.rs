use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api_keys::ApiKeyError;
use crate::store::StoreError;
use bazaar_auth::AuthError;

/// Request-level errors for the gateway's handlers.
///
/// Authentication, key and store errors keep their own response
/// mappings; this type exists so handlers can bubble any of them with
/// `?` and add the plain validation/not-found cases.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Key(#[from] ApiKeyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "validation_error", "message": message })),
            )
                .into_response(),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "message": message })),
            )
                .into_response(),
            Self::Auth(err) => err.into_response(),
            Self::Key(err) => err.into_response(),
            Self::Store(StoreError::Conflict(message)) => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "conflict", "message": message })),
            )
                .into_response(),
            Self::Store(err) => {
                // Infrastructure failure: surfaced as an internal error,
                // never folded into an authorization decision.
                log::error!("store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "store_error",
                        "message": "The data store is unavailable",
                    })),
                )
                    .into_response()
            }
        }
    }
}
