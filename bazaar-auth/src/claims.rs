use serde::{Deserialize, Serialize};

/// Represents the possible user roles in the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    /// Administrator with full system access
    Admin,
    /// Developer able to manage their own catalog entries
    Developer,
    /// Standard storefront user
    Buyer,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Buyer
    }
}

impl UserRole {
    /// Parse a role claim into a UserRole. Matching is exact: anything
    /// that is not a known role string is treated as no role at all.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "Admin" => Some(Self::Admin),
            "Developer" => Some(Self::Developer),
            "Buyer" => Some(Self::Buyer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Developer => "Developer",
            Self::Buyer => "Buyer",
        }
    }
}

/// Nested metadata claim carried by first-party identity tokens.
///
/// Only the fields this service consumes are modeled; everything else in
/// the metadata object is ignored during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// Claim set consumed from bearer tokens.
///
/// This is a closed structure: unrecognized claims are dropped rather
/// than propagated into the request principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Standard subject claim - the stable user identifier
    #[serde(default)]
    pub sub: Option<String>,

    /// Legacy identifier claim, used when `sub` is absent
    #[serde(default)]
    pub id: Option<String>,

    /// User's email address
    #[serde(default)]
    pub email: Option<String>,

    /// Top-level role claim
    #[serde(default)]
    pub role: Option<String>,

    /// Nested metadata, consulted for the role when the top-level claim
    /// is absent
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,

    /// Expiration timestamp (seconds since epoch)
    pub exp: u64,

    /// Issued-at timestamp
    #[serde(default)]
    pub iat: Option<u64>,
}

impl Claims {
    /// The subject identifier: `sub`, falling back to `id`.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.id.as_deref())
    }

    /// Resolve the role: top-level claim first, then the nested metadata
    /// claim, defaulting to the lowest-privilege role.
    pub fn user_role(&self) -> UserRole {
        self.role
            .as_deref()
            .or_else(|| {
                self.user_metadata
                    .as_ref()
                    .and_then(|meta| meta.role.as_deref())
            })
            .and_then(UserRole::parse)
            .unwrap_or_default()
    }
}
