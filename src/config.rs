//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Which remote store implementation to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store, for development and tests
    Memory,
    /// Firebase Realtime Database over REST
    Firebase,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "firebase" => Some(Self::Firebase),
            _ => None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Store implementation
    pub backend: StoreBackend,

    /// Realtime Database URL (required for the firebase backend)
    pub firebase_database_url: Option<String>,

    /// Opaque credential passed through to the database
    pub firebase_auth_token: Option<String>,

    /// Collection path holding the product records
    pub products_path: String,

    /// Stock strictly below this counts as low
    pub low_stock_threshold: u32,

    /// Events buffered per subscription before the backend waits
    pub subscription_buffer: usize,

    /// Per-request timeout for point operations
    pub request_timeout: Duration,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("STORE_BACKEND") {
            Some(value) => StoreBackend::parse(&value)
                .ok_or(ConfigError::InvalidValue("STORE_BACKEND"))?,
            None => StoreBackend::Memory,
        };

        let firebase_database_url = lookup("FIREBASE_DATABASE_URL").filter(|v| !v.trim().is_empty());
        if backend == StoreBackend::Firebase && firebase_database_url.is_none() {
            return Err(ConfigError::MissingEnv("FIREBASE_DATABASE_URL"));
        }

        let firebase_auth_token = lookup("FIREBASE_AUTH_TOKEN").filter(|v| !v.is_empty());

        let products_path = lookup("PRODUCTS_PATH").unwrap_or_else(|| "products".to_string());
        if products_path.split('/').all(str::is_empty) {
            return Err(ConfigError::InvalidValue("PRODUCTS_PATH"));
        }

        let low_stock_threshold = lookup("LOW_STOCK_THRESHOLD")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOW_STOCK_THRESHOLD"))?;

        let subscription_buffer: usize = lookup("SUBSCRIPTION_BUFFER")
            .unwrap_or_else(|| "64".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SUBSCRIPTION_BUFFER"))?;
        if subscription_buffer == 0 {
            return Err(ConfigError::InvalidValue("SUBSCRIPTION_BUFFER"));
        }

        let request_timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        Ok(Self {
            backend,
            firebase_database_url,
            firebase_auth_token,
            products_path,
            low_stock_threshold,
            subscription_buffer,
            request_timeout: Duration::from_secs(request_timeout_secs),
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            firebase_database_url: None,
            firebase_auth_token: None,
            products_path: "products".to_string(),
            low_stock_threshold: 10,
            subscription_buffer: 64,
            request_timeout: Duration::from_secs(10),
            environment: "development".to_string(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
