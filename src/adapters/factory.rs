//! Wiring of concrete adapters
//!
//! Every handle (pool, HTTP clients, broker, collaborators) is built here
//! once and passed down explicitly.

use crate::adapters::broker::{InMemoryBroker, MessageBroker};
use crate::adapters::notify::WebhookNotifier;
use crate::adapters::postgresql::{
    PostgreSQLClient, PostgresBroker, PostgresDirectory, PostgresLedger,
};
use crate::adapters::report::{CsvArtifactGenerator, ReportSourceRegistry};
use crate::adapters::storage::build_uploader;
use crate::config::{BrokerBackend, CampexConfig};
use crate::core::export::{Collaborators, ExportOrchestrator, OrchestratorSettings};
use crate::domain::{CampexError, Result};
use crate::logging::ExportAuditLogger;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the consumer and the CLI need
pub struct Pipeline {
    pub client: Arc<PostgreSQLClient>,
    pub ledger: Arc<PostgresLedger>,
    pub broker: Arc<dyn MessageBroker>,
    pub collaborators: Collaborators,
}

impl Pipeline {
    pub fn orchestrator(&self, config: &CampexConfig) -> ExportOrchestrator {
        ExportOrchestrator::new(
            self.collaborators.clone(),
            OrchestratorSettings::from(config),
        )
    }
}

/// Connects to PostgreSQL and fails fast when it is unreachable
pub async fn connect(config: &CampexConfig) -> Result<Arc<PostgreSQLClient>> {
    let client = Arc::new(PostgreSQLClient::new(config.postgresql.clone())?);
    client.test_connection().await?;
    Ok(client)
}

/// Builds the configured broker over an existing pool
pub fn build_broker(config: &CampexConfig, client: Arc<PostgreSQLClient>) -> Arc<dyn MessageBroker> {
    match config.broker.backend {
        BrokerBackend::PostgreSQL => Arc::new(PostgresBroker::new(client)),
        BrokerBackend::Memory => {
            tracing::warn!("Using the in-memory broker; messages are lost on exit");
            Arc::new(InMemoryBroker::new())
        }
    }
}

/// Builds the full pipeline from configuration
///
/// # Errors
///
/// Returns [`CampexError::Database`] when PostgreSQL cannot be reached and
/// [`CampexError::Configuration`] when a backend section is missing.
pub async fn build_pipeline(config: &CampexConfig) -> Result<Pipeline> {
    let client = connect(config).await?;
    client.ensure_schema().await?;

    let directory = Arc::new(PostgresDirectory::new(client.clone()));
    let ledger = Arc::new(PostgresLedger::new(client.clone()));
    let registry = ReportSourceRegistry::new().with_all(directory.clone());

    let audit = ExportAuditLogger::new(config.logging.audit_log_path.as_ref().map(PathBuf::from))
        .map_err(|e| CampexError::Configuration(format!("{e:#}")))?;

    let collaborators = Collaborators {
        contexts: directory.clone(),
        configs: directory.clone(),
        campaigns: directory,
        generator: Arc::new(CsvArtifactGenerator::new(
            registry,
            config.artifacts.include_header,
        )),
        uploader: build_uploader(&config.storage)?,
        ledger: ledger.clone(),
        notifier: Arc::new(WebhookNotifier::new(&config.notification)?),
        audit: Arc::new(audit),
    };

    tracing::info!(
        database = %client.connection_string_safe(),
        broker = ?config.broker.backend,
        storage = collaborators.uploader.backend(),
        "Pipeline assembled"
    );

    Ok(Pipeline {
        broker: build_broker(config, client.clone()),
        client,
        ledger,
        collaborators,
    })
}
