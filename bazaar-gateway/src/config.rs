use std::env;
use std::time::Duration;

/// Environment variable key for the token signing secret
const ENV_JWT_SECRET: &str = "BAZAAR_JWT_SECRET";

/// Environment variable key for token time-validation leeway in seconds
const ENV_JWT_LEEWAY: &str = "BAZAAR_JWT_LEEWAY";

/// Environment variable key for the row store base URL
const ENV_STORE_URL: &str = "BAZAAR_STORE_URL";

/// Environment variable key for the row store service credential
const ENV_STORE_SERVICE_KEY: &str = "BAZAAR_STORE_SERVICE_KEY";

/// Environment variable key for the store round-trip timeout in seconds
const ENV_STORE_TIMEOUT: &str = "BAZAAR_STORE_TIMEOUT_SECS";

/// Default leeway in seconds for token validation
const DEFAULT_LEEWAY: u64 = 60;

/// Default bound on a single store round-trip
const DEFAULT_STORE_TIMEOUT: u64 = 10;

/// Gateway configuration loaded from environment variables.
///
/// Constructed explicitly in `main` and injected into the services that
/// need it; nothing reads it through a global.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Shared secret bearer tokens are verified against
    pub jwt_secret: String,

    /// Leeway in seconds for token time validation
    pub jwt_leeway: u64,

    /// Base URL of the relational row store
    pub store_url: Option<String>,

    /// Service credential for the row store
    pub store_service_key: Option<String>,

    /// Bound on a single store round-trip
    pub store_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var(ENV_JWT_SECRET).unwrap_or_default();
        let jwt_leeway = env::var(ENV_JWT_LEEWAY)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LEEWAY);
        let store_url = env::var(ENV_STORE_URL).ok();
        let store_service_key = env::var(ENV_STORE_SERVICE_KEY).ok();
        let store_timeout = env::var(ENV_STORE_TIMEOUT)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_STORE_TIMEOUT);

        Self {
            jwt_secret,
            jwt_leeway,
            store_url,
            store_service_key,
            store_timeout: Duration::from_secs(store_timeout),
        }
    }

    /// Validate the configuration before serving requests.
    pub fn validate(&self, require_store: bool) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err(format!(
                "{} environment variable must be set to the token signing secret",
                ENV_JWT_SECRET
            ));
        }

        if require_store {
            match &self.store_url {
                Some(url) if url.starts_with("http") => {}
                Some(url) => return Err(format!("Invalid store URL: {}", url)),
                None => {
                    return Err(format!(
                        "{} environment variable must be set (or run with --memory)",
                        ENV_STORE_URL
                    ))
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear() {
        env::remove_var(ENV_JWT_SECRET);
        env::remove_var(ENV_JWT_LEEWAY);
        env::remove_var(ENV_STORE_URL);
        env::remove_var(ENV_STORE_SERVICE_KEY);
        env::remove_var(ENV_STORE_TIMEOUT);
    }

    #[test]
    fn test_config_from_env() {
        clear();
        env::set_var(ENV_JWT_SECRET, "secret");
        env::set_var(ENV_JWT_LEEWAY, "120");
        env::set_var(ENV_STORE_URL, "https://db.example.com/rest/v1");
        env::set_var(ENV_STORE_TIMEOUT, "5");

        let config = GatewayConfig::from_env();
        assert_eq!(config.jwt_secret, "secret");
        assert_eq!(config.jwt_leeway, 120);
        assert_eq!(
            config.store_url.as_deref(),
            Some("https://db.example.com/rest/v1")
        );
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert!(config.validate(true).is_ok());

        clear();
    }

    #[test]
    fn test_validation_requires_secret() {
        let config = GatewayConfig {
            jwt_secret: String::new(),
            jwt_leeway: DEFAULT_LEEWAY,
            store_url: None,
            store_service_key: None,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT),
        };
        assert!(config.validate(false).is_err());
    }

    #[test]
    fn test_validation_requires_store_url_unless_memory() {
        let config = GatewayConfig {
            jwt_secret: "secret".to_string(),
            jwt_leeway: DEFAULT_LEEWAY,
            store_url: None,
            store_service_key: None,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT),
        };
        assert!(config.validate(false).is_ok());
        assert!(config.validate(true).is_err());
    }
}
