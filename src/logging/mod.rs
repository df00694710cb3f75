//! Logging and observability
//!
//! - Console and rotating JSON file output ([`init_logging`])
//! - The per-run export audit trail ([`ExportAuditLogger`])
//!
//! # Example
//!
//! ```no_run
//! use campex::logging::init_logging;
//! use campex::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(organization_id = 42, "Consumer started");
//! ```

pub mod audit;
pub mod structured;

pub use audit::ExportAuditLogger;
pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log how a delivery was routed
///
/// # Example
///
/// ```no_run
/// use campex::log_routing;
///
/// log_routing!("campaign-export-requested", 17, "retry", 1);
/// ```
#[macro_export]
macro_rules! log_routing {
    ($topic:expr, $message_id:expr, $route:expr, $attempt:expr) => {
        tracing::info!(
            topic = %$topic,
            message_id = $message_id,
            route = $route,
            attempt = $attempt,
            "Delivery routed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use campex::log_error_with_context;
/// use campex::domain::CampexError;
///
/// let error = CampexError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
