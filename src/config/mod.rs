//! Configuration management for Campex.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Campex uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CAMPEX_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load, including production-only rules
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use campex::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("campex.toml")?;
//!
//! println!("Consuming {:?}", config.topics.consumed());
//! println!("Workers: {}", config.consumer.workers);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`ConsumerConfig`] - Worker pool, visibility and message timeouts
//! - [`TopicsConfig`] - Input, retry and dead-letter topic names
//! - [`RetryConfig`] - Attempt cap and linear backoff unit
//! - [`BrokerConfig`] - Where topics live
//! - [`PostgreSQLConfig`] - Organization directory and process ledger
//! - [`ArtifactsConfig`] - Work directory and dedupe policy
//! - [`StorageConfig`] - Object store backend
//! - [`NotificationConfig`] - Default webhook
//! - [`LoggingConfig`] - Log files and the audit trail
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [consumer]
//! workers = 8
//!
//! [postgresql]
//! connection_string = "${CAMPEX_DATABASE_URL}"
//!
//! [storage]
//! backend = "gcs"
//!
//! [storage.gcs]
//! bucket = "campaign-exports"
//! access_token = "${CAMPEX_GCS_TOKEN}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ArtifactsConfig, BrokerBackend, BrokerConfig, CampexConfig,
    ConsumerConfig, DedupePolicy, Environment, GcsConfig, LocalStorageConfig, LoggingConfig,
    NotificationConfig, PostgreSQLConfig, RetryConfig, S3Config, StorageBackend, StorageConfig,
    TopicsConfig,
};
pub use secret::{bearer, secret_string, SecretString, SecretValue};
