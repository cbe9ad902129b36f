//! # Configuration Management for codegate
//!
//! This crate provides centralized configuration structures for all codegate components,
//! including the response cache, rate limiting and logging.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{CacheConfig, RateLimitConfig};
//!
//! // Cache configuration
//! let cache_config = CacheConfig::new(
//!     "redis://localhost:6379".to_string(),
//!     3600,
//!     "code_assistant".to_string(),
//! )
//! .with_timeout(500);
//!
//! // Rate limit configuration
//! let rate_limit = RateLimitConfig::new(true, 10);
//! assert_eq!(cache_config.default_ttl, 3600);
//! assert_eq!(rate_limit.per_minute, 10);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [server]
//! project_name = "AI Code Assistant"
//! version = "1.0.0"
//!
//! [cache]
//! enabled = true
//! redis_url = "redis://localhost:6379"
//! default_ttl = 3600
//! key_prefix = "code_assistant"
//! timeout_ms = 500
//! connection_timeout_ms = 3000
//! scan_page_size = 100
//!
//! [rate_limit]
//! enabled = true
//! per_minute = 10
//!
//! [logging]
//! level = "INFO"
//! format = "json"
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! fn main() -> Result<(), config::ConfigError> {
//!     // Load from codegate.toml (or CODEGATE_CONFIG), then apply env overrides
//!     let config = AppConfig::load()?;
//!
//!     // Or load from custom path
//!     let config = AppConfig::from_file("config/production.toml")?;
//!     # let _ = config;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./codegate.toml";
const CONFIG_PATH_VAR: &str = "CODEGATE_CONFIG";
const LOG_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid value for {name}: {value}")]
    InvalidOverride { name: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service identity reported by health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub project_name: String,
    pub version: String,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Static switch; a failed connect turns caching off regardless
    pub enabled: bool,
    /// Redis connection string (redis://localhost:6379)
    pub redis_url: String,
    /// Default TTL for cache entries (in seconds)
    pub default_ttl: u64,
    /// Key prefix for all cache entries
    pub key_prefix: String,
    /// Upper bound for a single store call
    pub timeout_ms: u64,
    /// Upper bound for connect + ping
    pub connection_timeout_ms: u64,
    /// Keys requested per SCAN page
    pub scan_page_size: usize,
}

/// Per-client request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the TOML file named in .env / environment, or defaults,
    /// then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let mut config = if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::read_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::read_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply the flat environment-style overrides on top of file values
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("REDIS_ENABLED") {
            self.cache.enabled = parse_bool("REDIS_ENABLED", &value)?;
        }
        if let Some(value) = lookup("REDIS_URL") {
            self.cache.redis_url = value;
        }
        if let Some(value) = lookup("CACHE_TTL") {
            self.cache.default_ttl = parse_number("CACHE_TTL", &value)?;
        }
        if let Some(value) = lookup("CACHE_PREFIX") {
            self.cache.key_prefix = value;
        }
        if let Some(value) = lookup("RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = parse_bool("RATE_LIMIT_ENABLED", &value)?;
        }
        if let Some(value) = lookup("RATE_LIMIT_PER_MINUTE") {
            self.rate_limit.per_minute = parse_number("RATE_LIMIT_PER_MINUTE", &value)?;
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("LOG_FORMAT") {
            self.logging.format = match value.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "console" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        name: "LOG_FORMAT".to_string(),
                        value,
                    });
                }
            };
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Cache validations
        if self.cache.redis_url.is_empty() {
            return Err(ConfigError::Invalid(
                "Redis URL cannot be empty".to_string(),
            ));
        }
        if self.cache.key_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "Cache key_prefix cannot be empty".to_string(),
            ));
        }
        if self.cache.key_prefix.contains(['*', '?', '[', ']', '\\']) {
            return Err(ConfigError::Invalid(
                "Cache key_prefix cannot contain glob characters".to_string(),
            ));
        }
        if self.cache.default_ttl == 0 {
            return Err(ConfigError::Invalid(
                "Cache default_ttl must be greater than 0".to_string(),
            ));
        }
        if self.cache.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Cache connection_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache.scan_page_size == 0 {
            return Err(ConfigError::Invalid(
                "Cache scan_page_size must be greater than 0".to_string(),
            ));
        }

        // Rate limit validations
        if self.rate_limit.enabled && self.rate_limit.per_minute == 0 {
            return Err(ConfigError::Invalid(
                "Rate limit per_minute must be greater than 0 when enabled".to_string(),
            ));
        }

        // Logging validations
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_uppercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Unknown log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
        })
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new(redis_url: String, default_ttl: u64, key_prefix: String) -> Self {
        Self {
            redis_url,
            default_ttl,
            key_prefix,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_connection_timeout(mut self, timeout_ms: u64) -> Self {
        self.connection_timeout_ms = timeout_ms;
        self
    }

    pub fn with_scan_page_size(mut self, page_size: usize) -> Self {
        self.scan_page_size = page_size;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 3600, // 1 hour
            key_prefix: "code_assistant".to_string(),
            timeout_ms: 500,
            connection_timeout_ms: 3000,
            scan_page_size: 100,
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit configuration
    pub fn new(enabled: bool, per_minute: u32) -> Self {
        Self {
            enabled,
            per_minute,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(true, 10)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            project_name: "AI Code Assistant".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}
