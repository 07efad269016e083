//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_API_URL` - Base URL of the store backend (http or https)
//!
//! ## Optional
//! - `STOREFRONT_SEARCH_DEBOUNCE_MS` - Search debounce interval (default: 500)
//! - `STOREFRONT_CATALOG_TTL_SECS` - Product listing cache TTL (default: 300)
//! - `STOREFRONT_SESSION_FILE` - Session store path (default: .kartwheel-session.json)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_SEARCH_DEBOUNCE_MS: &str = "500";
const DEFAULT_CATALOG_TTL_SECS: &str = "300";
const DEFAULT_SESSION_FILE: &str = ".kartwheel-session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the Sentry DSN.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend base URL, always ending in `/`
    pub api_url: Url,
    /// How long search waits for typing to settle
    pub search_debounce: Duration,
    /// How long the product listing stays cached
    pub catalog_ttl: Duration,
    /// Where the CLI keeps the session between runs
    pub session_file: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<SecretString>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url.as_str())
            .field("search_debounce", &self.search_debounce)
            .field("catalog_ttl", &self.catalog_ttl)
            .field("session_file", &self.session_file)
            .field(
                "sentry_dsn",
                &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url("STOREFRONT_API_URL", &get_required_env("STOREFRONT_API_URL")?)?;
        let search_debounce = Duration::from_millis(parse_u64(
            "STOREFRONT_SEARCH_DEBOUNCE_MS",
            &get_env_or_default("STOREFRONT_SEARCH_DEBOUNCE_MS", DEFAULT_SEARCH_DEBOUNCE_MS),
        )?);
        let catalog_ttl = Duration::from_secs(parse_u64(
            "STOREFRONT_CATALOG_TTL_SECS",
            &get_env_or_default("STOREFRONT_CATALOG_TTL_SECS", DEFAULT_CATALOG_TTL_SECS),
        )?);
        let session_file =
            PathBuf::from(get_env_or_default("STOREFRONT_SESSION_FILE", DEFAULT_SESSION_FILE));

        Ok(Self {
            api_url,
            search_debounce,
            catalog_ttl,
            session_file,
            sentry_dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration with defaults for everything but the backend URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an http(s) URL.
    pub fn with_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url("STOREFRONT_API_URL", api_url)?,
            search_debounce: Duration::from_millis(500),
            catalog_ttl: Duration::from_secs(300),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the backend base URL.
///
/// A trailing slash is added so relative endpoint paths join under it.
fn parse_api_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
