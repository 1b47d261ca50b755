//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIREBASE_PROJECT_ID` - Firebase project holding the product collection
//!
//! ## Optional
//! - `FIREBASE_STORAGE_BUCKET` - Storage bucket for product images
//!   (default: `<project>.appspot.com`)
//! - `FIREBASE_API_KEY` - Web API key sent with REST requests
//! - `FIREBASE_FIRESTORE_URL` - Firestore REST base URL
//!   (default: `https://firestore.googleapis.com`)
//! - `FIREBASE_STORAGE_URL` - Cloud Storage REST base URL
//!   (default: `https://firebasestorage.googleapis.com`)
//! - `CATALOG_COLLECTION` - Product collection name (default: products)
//! - `CATALOG_IMAGE_NAMESPACE` - Folder holding per-product image folders (default: images)
//! - `CATALOG_IMAGE_CONCURRENCY` - Image listings and URL resolutions run at once (default: 4)
//! - `CATALOG_IMAGE_CACHE_CAPACITY` - Product keys kept in the image cache (default: 1000)
//! - `CATALOG_POLL_INTERVAL_SECS` - Live-mode polling interval (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
const DEFAULT_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Firebase backend configuration
    pub firebase: FirebaseConfig,
    /// Synchronization tuning
    pub sync: SyncConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Firebase backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Firebase project id
    pub project_id: String,
    /// Storage bucket name
    pub storage_bucket: String,
    /// Web API key (optional for public rules)
    pub api_key: Option<SecretString>,
    /// Firestore REST base URL
    pub firestore_url: String,
    /// Cloud Storage REST base URL
    pub storage_url: String,
    /// Product collection name
    pub collection: String,
    /// Folder holding per-product image folders
    pub image_namespace: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("firestore_url", &self.firestore_url)
            .field("storage_url", &self.storage_url)
            .field("collection", &self.collection)
            .field("image_namespace", &self.image_namespace)
            .finish()
    }
}

/// Synchronization tuning.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum remote image calls in flight at once (at least 1)
    pub image_concurrency: usize,
    /// Maximum number of product keys kept in the image cache
    pub image_cache_capacity: u64,
    /// Interval between collection reads in live mode
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            image_concurrency: 4,
            image_cache_capacity: 1000,
            poll_interval: Duration::from_secs(15),
        }
    }
}

impl CatalogConfig {
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

        let firebase = FirebaseConfig::from_env()?;
        let sync = SyncConfig::from_env()?;

        Ok(Self {
            firebase,
            sync,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl FirebaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let project_id = get_required_env("FIREBASE_PROJECT_ID")?;
        let storage_bucket = get_optional_env("FIREBASE_STORAGE_BUCKET")
            .unwrap_or_else(|| format!("{project_id}.appspot.com"));

        Ok(Self {
            project_id,
            storage_bucket,
            api_key: get_optional_env("FIREBASE_API_KEY").map(SecretString::from),
            firestore_url: get_base_url("FIREBASE_FIRESTORE_URL", DEFAULT_FIRESTORE_URL)?,
            storage_url: get_base_url("FIREBASE_STORAGE_URL", DEFAULT_STORAGE_URL)?,
            collection: get_env_or_default("CATALOG_COLLECTION", "products"),
            image_namespace: get_env_or_default("CATALOG_IMAGE_NAMESPACE", "images"),
        })
    }
}

impl SyncConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let image_concurrency = parse_at_least_one("CATALOG_IMAGE_CONCURRENCY", "4")?;
        let image_cache_capacity = get_env_or_default("CATALOG_IMAGE_CACHE_CAPACITY", "1000")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CATALOG_IMAGE_CACHE_CAPACITY".to_string(), e.to_string())
            })?;
        let poll_secs = parse_at_least_one("CATALOG_POLL_INTERVAL_SECS", "15")?;

        Ok(Self {
            image_concurrency,
            image_cache_capacity,
            poll_interval: Duration::from_secs(u64::try_from(poll_secs).unwrap_or(u64::MAX)),
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a base URL, validated and without a trailing slash.
fn get_base_url(key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = get_env_or_default(key, default);
    validate_base_url(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn validate_base_url(raw: &str) -> Result<String, String> {
    let url = url::Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_at_least_one(key: &str, default: &str) -> Result<usize, ConfigError> {
    let raw = get_env_or_default(key, default);
    parse_positive(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(e) => Err(e.to_string()),
    }
}
