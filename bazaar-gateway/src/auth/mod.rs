//! Request authentication for the gateway
//!
//! The dispatcher in [`middleware`] turns each request's credential
//! headers into a normalized [`bazaar_auth::Principal`] before any
//! business logic runs.

pub mod middleware;

pub use middleware::{
    auth_middleware, principal_from_key, token_auth_middleware, AuthPrincipal, API_KEY_HEADER,
};
