//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MEDICART_API_BASE_URL` - Base URL of the Medicart REST backend
//!
//! ## Optional
//! - `MEDICART_CART_DEBOUNCE_MS` - Quantity update debounce window (default: 600)
//! - `MEDICART_GUEST_CART_KEY` - Storage key for the guest cart (default: guest-cart)
//! - `MEDICART_PRODUCT_TYPE` - `type` literal sent with cart mutations (default: Medicine)
//! - `MEDICART_MIGRATION_CONCURRENCY` - Guest items replayed per batch on login (default: 1)
//! - `MEDICART_GUEST_CART_RETENTION` - `discard_all` or `keep_failed` (default: `discard_all`)
//! - `MEDICART_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 30)

use std::time::Duration;

use medicart_core::ProductType;
use thiserror::Error;
use url::Url;

use crate::storage::validate_key;

/// Default debounce window for quantity updates.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);
/// Default storage key for the guest cart.
pub const DEFAULT_GUEST_CART_KEY: &str = "guest-cart";
/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What happens to the guest cart after a login migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuestCartRetention {
    /// Delete the guest cart once every item has been attempted, even if
    /// some of them failed to reach the server.
    #[default]
    DiscardAll,
    /// Keep the items that failed to migrate in the guest cart.
    KeepFailed,
}

impl std::str::FromStr for GuestCartRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discard_all" => Ok(Self::DiscardAll),
            "keep_failed" => Ok(Self::KeepFailed),
            other => Err(format!(
                "expected `discard_all` or `keep_failed`, got `{other}`"
            )),
        }
    }
}

/// Cart synchronization configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Base URL every cart endpoint path is joined onto
    pub api_base_url: Url,
    /// Delay after the last quantity change before it is persisted
    pub debounce: Duration,
    /// Storage key holding the guest cart blob
    pub guest_cart_key: String,
    /// Product category sent with every cart mutation
    pub product_type: ProductType,
    /// Number of guest items replayed concurrently during migration
    pub migration_concurrency: usize,
    /// Guest cart handling after a partially failed migration
    pub guest_cart_retention: GuestCartRetention,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl CartConfig {
    /// Configuration with default tuning for the given backend.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            debounce: DEFAULT_DEBOUNCE,
            guest_cart_key: DEFAULT_GUEST_CART_KEY.to_string(),
            product_type: ProductType::default(),
            migration_concurrency: 1,
            guest_cart_retention: GuestCartRetention::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

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

        let api_base_url = parse_env::<Url>(
            "MEDICART_API_BASE_URL",
            &get_required_env("MEDICART_API_BASE_URL")?,
        )?;
        let debounce_ms = parse_env::<u64>(
            "MEDICART_CART_DEBOUNCE_MS",
            &get_env_or_default("MEDICART_CART_DEBOUNCE_MS", "600"),
        )?;
        let product_type = parse_env::<ProductType>(
            "MEDICART_PRODUCT_TYPE",
            &get_env_or_default("MEDICART_PRODUCT_TYPE", "Medicine"),
        )?;
        let migration_concurrency = parse_env::<usize>(
            "MEDICART_MIGRATION_CONCURRENCY",
            &get_env_or_default("MEDICART_MIGRATION_CONCURRENCY", "1"),
        )?;
        if migration_concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MEDICART_MIGRATION_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let guest_cart_retention = parse_env::<GuestCartRetention>(
            "MEDICART_GUEST_CART_RETENTION",
            &get_env_or_default("MEDICART_GUEST_CART_RETENTION", "discard_all"),
        )?;
        let guest_cart_key = storage_key(
            "MEDICART_GUEST_CART_KEY",
            get_env_or_default("MEDICART_GUEST_CART_KEY", DEFAULT_GUEST_CART_KEY),
        )?;
        let timeout_secs = parse_env::<u64>(
            "MEDICART_REQUEST_TIMEOUT_SECS",
            &get_env_or_default("MEDICART_REQUEST_TIMEOUT_SECS", "30"),
        )?;

        Ok(Self {
            api_base_url,
            debounce: Duration::from_millis(debounce_ms),
            guest_cart_key,
            product_type,
            migration_concurrency,
            guest_cart_retention,
            request_timeout: Duration::from_secs(timeout_secs),
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

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw variable value, naming the variable in the error.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Check a raw value is usable as a storage key.
fn storage_key(key: &str, raw: String) -> Result<String, ConfigError> {
    validate_key(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(raw)
}
