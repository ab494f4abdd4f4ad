use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur during authentication and authorization
#[derive(Error, Debug)]
pub enum AuthError {
    /// No usable credential was presented
    #[error("Missing credentials")]
    MissingCredentials,

    /// Token could not be parsed as a signed three-part structure
    #[error("Malformed token")]
    MalformedToken,

    /// Token signature did not verify against the shared secret
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token validity window has passed
    #[error("Token expired")]
    TokenExpired,

    /// Credential was valid but the role or ownership check failed
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl AuthError {
    /// Stable machine-readable kind for the JSON error body
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            // Token failures are deliberately reported under one kind so
            // callers cannot distinguish why a credential was rejected.
            Self::MalformedToken | Self::InvalidSignature | Self::TokenExpired => "invalid_token",
            Self::Forbidden(_) => "forbidden",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };

        let message = match &self {
            Self::MissingCredentials => {
                "Authentication required. Use a Bearer token or the X-API-Key header".to_string()
            }
            Self::MalformedToken | Self::InvalidSignature | Self::TokenExpired => {
                "The provided authentication token is invalid".to_string()
            }
            Self::Forbidden(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}
