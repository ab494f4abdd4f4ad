//! # bazaar-auth
//!
//! Bearer-token authentication for Bazaar services.
//!
//! This crate verifies signed bearer tokens against a shared secret,
//! normalizes the resulting claims into a per-request [`Principal`], and
//! provides the role check used by protected endpoints.

pub mod claims;
pub mod error;
pub mod principal;
pub mod token;

// Re-export the most commonly used types
pub use claims::{Claims, UserRole};
pub use error::AuthError;
pub use principal::{require_role, Integration, Principal};
pub use token::TokenVerifier;
