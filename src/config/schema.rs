//! Configuration schema types
//!
//! This module defines the configuration structure for Campex. Every section
//! maps to a TOML table; most have defaults so a minimal file only needs
//! `[postgresql]` and `[storage]`.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Message broker selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerBackend {
    /// Topics stored in the `topic_messages` PostgreSQL table
    #[default]
    PostgreSQL,
    /// Process-local topics, lost on exit (development only)
    Memory,
}

/// Object store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Primary object store (Google Cloud Storage JSON API)
    Gcs,
    /// Secondary object store (S3-compatible HTTP endpoint)
    S3,
    /// Local directory (development only)
    Local,
}

/// What to do with an earlier upload when a request is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupePolicy {
    /// Always regenerate and re-upload
    #[default]
    Disabled,
    /// On a retry, reuse a recorded export process with the same request key
    ReuseOnRetry,
}

/// Main Campex configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampexConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Worker pool settings
    #[serde(default)]
    pub consumer: ConsumerConfig,

    /// Topic names
    #[serde(default)]
    pub topics: TopicsConfig,

    /// Retry classification settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Message broker selection
    #[serde(default)]
    pub broker: BrokerConfig,

    /// PostgreSQL (organization directory, process ledger, topics)
    pub postgresql: PostgreSQLConfig,

    /// Local artifact settings
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Object storage settings
    pub storage: StorageConfig,

    /// Notification settings
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CampexConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.consumer.validate()?;
        self.topics.validate()?;
        self.retry.validate()?;
        self.postgresql.validate()?;
        self.artifacts.validate()?;
        self.storage.validate(&self.environment)?;
        self.notification.validate(&self.environment)?;
        self.logging.validate()?;

        if self.environment == Environment::Production && self.broker.backend == BrokerBackend::Memory
        {
            return Err("broker.backend = 'memory' is not allowed in production".to_string());
        }
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Consumer worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer group name, stamped on republished messages
    #[serde(default = "default_group")]
    pub group: String,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Idle wait between empty polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a received message stays invisible to other workers
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Deadline for one orchestrator run
    #[serde(default = "default_message_timeout_secs")]
    pub message_timeout_secs: u64,

    /// Time allowed for in-flight messages to finish after a shutdown signal
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: default_group(),
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            message_timeout_secs: default_message_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl ConsumerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.group.trim().is_empty() {
            return Err("consumer.group cannot be empty".to_string());
        }
        if self.workers == 0 || self.workers > 64 {
            return Err("consumer.workers must be between 1 and 64".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("consumer.poll_interval_ms must be greater than 0".to_string());
        }
        if self.message_timeout_secs == 0 {
            return Err("consumer.message_timeout_secs must be greater than 0".to_string());
        }
        // a message must not become visible again while its run may still be going
        if self.visibility_timeout_secs <= self.message_timeout_secs {
            return Err(format!(
                "consumer.visibility_timeout_secs ({}) must exceed consumer.message_timeout_secs ({})",
                self.visibility_timeout_secs, self.message_timeout_secs
            ));
        }
        Ok(())
    }
}

/// Topic names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    #[serde(default = "default_input_topic")]
    pub input: String,

    #[serde(default = "default_retry_topic")]
    pub retry: String,

    #[serde(default = "default_dead_letter_topic")]
    pub dead_letter: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            input: default_input_topic(),
            retry: default_retry_topic(),
            dead_letter: default_dead_letter_topic(),
        }
    }
}

impl TopicsConfig {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("topics.input", &self.input),
            ("topics.retry", &self.retry),
            ("topics.dead_letter", &self.dead_letter),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} cannot be empty"));
            }
        }
        if self.dead_letter == self.input || self.dead_letter == self.retry {
            return Err("topics.dead_letter must differ from the consumed topics".to_string());
        }
        Ok(())
    }

    /// Topics the consumer reads from
    pub fn consumed(&self) -> Vec<String> {
        if self.input == self.retry {
            vec![self.input.clone()]
        } else {
            vec![self.input.clone(), self.retry.clone()]
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts after which a transient failure is dead-lettered
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit: attempt `n` waits `base_delay_secs * (n + 1)`
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts > 10 {
            return Err("retry.max_attempts cannot exceed 10".to_string());
        }
        if self.base_delay_secs == 0 {
            return Err("retry.base_delay_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Message broker configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrokerConfig {
    #[serde(default)]
    pub backend: BrokerBackend,
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgreSQLConfig {
    /// PostgreSQL connection string
    /// Stored securely in memory and automatically zeroized on drop
    pub connection_string: SecretString,

    /// Maximum number of connections in the pool
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_pg_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,

    /// Statement timeout in seconds
    #[serde(default = "default_pg_statement_timeout_seconds")]
    pub statement_timeout_seconds: u64,
}

impl PostgreSQLConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        let conn = self.connection_string.expose_secret();
        if conn.is_empty() {
            return Err("postgresql.connection_string cannot be empty".to_string());
        }
        if !conn.starts_with("postgresql://") && !conn.starts_with("postgres://") {
            return Err(
                "postgresql.connection_string must start with 'postgresql://' or 'postgres://'"
                    .to_string(),
            );
        }
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err("postgresql.max_connections must be between 1 and 100".to_string());
        }
        if self.connection_timeout_seconds == 0 {
            return Err("postgresql.connection_timeout_seconds must be greater than 0".to_string());
        }
        if self.statement_timeout_seconds == 0 {
            return Err("postgresql.statement_timeout_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Local artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory where artifacts are written before upload
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Write a header row
    #[serde(default = "default_true")]
    pub include_header: bool,

    /// Upload reuse policy for retried requests
    #[serde(default)]
    pub dedupe: DedupePolicy,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            include_header: true,
            dedupe: DedupePolicy::default(),
        }
    }
}

impl ArtifactsConfig {
    fn validate(&self) -> Result<(), String> {
        if self.work_dir.trim().is_empty() {
            return Err("artifacts.work_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend uploads go to
    pub backend: StorageBackend,

    /// Key prefix prepended to every artifact name
    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Request timeout for HTTP backends
    #[serde(default = "default_storage_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcs: Option<GcsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalStorageConfig>,
}

impl StorageConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if !self.upload_path.is_empty() && !self.upload_path.ends_with('/') {
            return Err("storage.upload_path must be empty or end with '/'".to_string());
        }
        if self.upload_path.starts_with('/') {
            return Err("storage.upload_path must be relative".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("storage.timeout_secs must be greater than 0".to_string());
        }

        match self.backend {
            StorageBackend::Gcs => match &self.gcs {
                Some(gcs) => gcs.validate(environment),
                None => Err("storage.gcs is required when storage.backend = 'gcs'".to_string()),
            },
            StorageBackend::S3 => match &self.s3 {
                Some(s3) => s3.validate(environment),
                None => Err("storage.s3 is required when storage.backend = 's3'".to_string()),
            },
            StorageBackend::Local => {
                if *environment == Environment::Production {
                    return Err(
                        "storage.backend = 'local' is not allowed in production".to_string()
                    );
                }
                match &self.local {
                    Some(local) if !local.root_dir.trim().is_empty() => Ok(()),
                    Some(_) => Err("storage.local.root_dir cannot be empty".to_string()),
                    None => Err(
                        "storage.local is required when storage.backend = 'local'".to_string()
                    ),
                }
            }
        }
    }
}

/// Primary object store (Google Cloud Storage)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsConfig {
    /// Bucket name
    pub bucket: String,

    /// Pre-issued OAuth bearer token
    /// Stored securely in memory and automatically zeroized on drop
    pub access_token: SecretString,

    /// JSON API base URL
    #[serde(default = "default_gcs_api_base_url")]
    pub api_base_url: String,

    /// Base of the URLs handed to downstream parties (defaults to `https://{bucket}`)
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl GcsConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("storage.gcs.bucket cannot be empty".to_string());
        }
        validate_endpoint("storage.gcs.api_base_url", &self.api_base_url, environment)?;
        if let Some(ref base) = self.public_base_url {
            validate_endpoint("storage.gcs.public_base_url", base, environment)?;
        }
        Ok(())
    }

    /// Public base URL for uploaded objects
    pub fn public_base(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.bucket))
    }
}

/// Secondary object store (S3-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Endpoint URL, e.g. `https://s3.eu-west-1.amazonaws.com`
    pub endpoint: String,

    /// Bucket name
    pub bucket: String,

    /// Region name, sent as `x-amz-bucket-region`
    #[serde(default = "default_s3_region")]
    pub region: String,

    /// Optional pre-issued bearer token for gateways that require one
    #[serde(default)]
    pub access_token: Option<SecretString>,

    /// Base of the URLs handed to downstream parties (defaults to `{endpoint}/{bucket}`)
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl S3Config {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("storage.s3.bucket cannot be empty".to_string());
        }
        validate_endpoint("storage.s3.endpoint", &self.endpoint, environment)?;
        if let Some(ref base) = self.public_base_url {
            validate_endpoint("storage.s3.public_base_url", base, environment)?;
        }
        Ok(())
    }

    /// Public base URL for uploaded objects
    pub fn public_base(&self) -> String {
        self.public_base_url.clone().unwrap_or_else(|| {
            format!("{}/{}", self.endpoint.trim_end_matches('/'), self.bucket)
        })
    }
}

/// Local directory store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Directory objects are copied into
    pub root_dir: String,

    /// Base of the returned URLs (defaults to `file://{root_dir}`)
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook used when neither the request nor the organization names one
    #[serde(default)]
    pub default_webhook_url: Option<String>,

    /// Bearer token sent with every webhook call
    #[serde(default)]
    pub auth_token: Option<SecretString>,

    /// Request timeout
    #[serde(default = "default_notification_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_webhook_url: None,
            auth_token: None,
            timeout_secs: default_notification_timeout_secs(),
        }
    }
}

impl NotificationConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        if let Some(ref url) = self.default_webhook_url {
            validate_endpoint("notification.default_webhook_url", url, environment)?;
        }
        if self.timeout_secs == 0 {
            return Err("notification.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// JSON-lines file the export audit entries are appended to
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if let Some(ref path) = self.audit_log_path {
            if path.trim().is_empty() {
                return Err("logging.audit_log_path cannot be empty when set".to_string());
            }
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            audit_log_path: None,
        }
    }
}

fn validate_endpoint(field: &str, value: &str, environment: &Environment) -> Result<(), String> {
    let parsed = url::Url::parse(value).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if *environment != Environment::Production => Ok(()),
        "http" => Err(format!("{field} must use https in production")),
        other => Err(format!("{field} has unsupported scheme '{other}'")),
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_group() -> String {
    "campex".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_visibility_timeout_secs() -> u64 {
    900
}

fn default_message_timeout_secs() -> u64 {
    600
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_input_topic() -> String {
    "campaign-export-requested".to_string()
}

fn default_retry_topic() -> String {
    "campaign-export-retry".to_string()
}

fn default_dead_letter_topic() -> String {
    "campaign-export-dead".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> u64 {
    5
}

fn default_pg_max_connections() -> usize {
    10
}

fn default_pg_connection_timeout_seconds() -> u64 {
    30
}

fn default_pg_statement_timeout_seconds() -> u64 {
    60
}

fn default_work_dir() -> String {
    std::env::temp_dir()
        .join("campex")
        .to_string_lossy()
        .to_string()
}

fn default_upload_path() -> String {
    "upload/".to_string()
}

fn default_storage_timeout_secs() -> u64 {
    120
}

fn default_gcs_api_base_url() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_s3_region() -> String {
    "eu-west-1".to_string()
}

fn default_notification_timeout_secs() -> u64 {
    30
}

fn default_local_path() -> String {
    "/var/log/campex".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
