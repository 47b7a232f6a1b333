//! Configuration management for Vigil.
//!
//! Supports YAML configuration files, environment variable overrides,
//! reasonable defaults, and configuration validation. The encryption key has
//! no default: a configuration without one fails validation, so nothing that
//! needs the key can be constructed.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure for the storage core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VigilConfig {
    #[serde(default)]
    pub encryption: EncryptionConfig,

    #[serde(default)]
    pub repair: RepairConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub summary_retry: RetryConfig,
}

impl VigilConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by VIGIL_CONFIG env var
    /// 3. ./config/vigil.yaml
    /// 4. /etc/vigil/vigil.yaml
    /// 5. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("VIGIL_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/vigil").required(false))
            .add_source(File::with_name("/etc/vigil/vigil").required(false));

        // Override with environment variables
        // Example: VIGIL__ENCRYPTION__KEY=<base64 key>
        builder = builder.add_source(
            Environment::with_prefix("VIGIL")
                .separator("__")
                .try_parsing(true),
        );

        let config: VigilConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Set default values for all configuration options.
    ///
    /// The encryption key deliberately has no default.
    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            // Encryption
            .set_default("encryption.key", "")?
            // Repair worker
            .set_default("repair.queue_depth", 64)?
            .set_default("repair.max_concurrency", 4)?
            // Query
            .set_default("query.page_size", 1000)?
            // Summary counter CAS retry
            .set_default("summary_retry.max_attempts", 20)?
            .set_default("summary_retry.initial_backoff_ms", 50)?
            .set_default("summary_retry.max_backoff_ms", 2000)?
            .set_default("summary_retry.backoff_multiplier", 2.0)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encryption.key.is_empty() {
            return Err(ConfigError::Message(
                "encryption.key must be set (base64-encoded 256-bit key)".to_string(),
            ));
        }

        if self.repair.queue_depth == 0 {
            return Err(ConfigError::Message(
                "repair.queue_depth must be > 0".to_string(),
            ));
        }

        if self.repair.max_concurrency == 0 {
            return Err(ConfigError::Message(
                "repair.max_concurrency must be > 0".to_string(),
            ));
        }

        if self.query.page_size == 0 {
            return Err(ConfigError::Message(
                "query.page_size must be > 0".to_string(),
            ));
        }

        if self.summary_retry.max_attempts == 0 {
            return Err(ConfigError::Message(
                "summary_retry.max_attempts must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: VigilConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

/// Symmetric encryption key material.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EncryptionConfig {
    /// Base64-encoded 256-bit key. Required; there is no degraded mode.
    #[serde(default)]
    pub key: String,
}

/// Bounded background repair queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepairConfig {
    /// Maximum queued repair jobs; enqueue drops (with a warning) when full.
    pub queue_depth: usize,

    /// Maximum repairs running at once.
    pub max_concurrency: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            max_concurrency: 4,
        }
    }
}

/// Range-query configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Per-partition result cap for range queries.
    pub page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { page_size: 1000 }
    }
}

/// Retry configuration for optimistic-concurrency loops.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            initial_backoff_ms: 50,
            max_backoff_ms: 2000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate backoff delay for a given retry attempt.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(attempt as i32))
        .min(self.max_backoff_ms as f64);
        Duration::from_millis(delay_ms as u64)
    }
}
