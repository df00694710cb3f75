//! Collaborator traits
//!
//! The export orchestrator only talks to the outside world through these
//! traits. Concrete implementations live in the sibling modules and are
//! wired together once by [`crate::adapters::factory`].

use crate::domain::{
    Campaign, CampaignId, EventRow, ExportProcess, ExportRequest, NewExportProcess,
    OrganizationConfig, OrganizationContext, OrganizationId, PerformanceRow, Result, RunId,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolves where an organization's data lives
#[async_trait]
pub trait ContextResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CampexError::NotFound`](crate::domain::CampexError::NotFound)
    /// when the organization is unknown, and any other variant when the
    /// directory could not be reached.
    async fn resolve(&self, organization_id: OrganizationId) -> Result<OrganizationContext>;
}

/// Per-organization export settings
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_config(&self, context: &OrganizationContext) -> Result<OrganizationConfig>;
}

/// Read-only campaign lookups
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Loads one campaign of the organization
    ///
    /// # Errors
    ///
    /// Returns [`CampexError::NotFound`](crate::domain::CampexError::NotFound)
    /// when the campaign does not exist.
    async fn load_campaign(
        &self,
        context: &OrganizationContext,
        campaign_id: CampaignId,
    ) -> Result<Campaign>;
}

/// Platform-specific report data
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Daily performance figures, oldest first
    async fn performance(
        &self,
        context: &OrganizationContext,
        campaign: &Campaign,
    ) -> Result<Vec<PerformanceRow>>;

    /// Recipient events, oldest first
    async fn events(
        &self,
        context: &OrganizationContext,
        campaign: &Campaign,
    ) -> Result<Vec<EventRow>>;
}

/// Everything a generator needs to write one artifact
#[derive(Debug, Clone, Copy)]
pub struct ArtifactJob<'a> {
    pub request: &'a ExportRequest,
    pub context: &'a OrganizationContext,
    pub config: &'a OrganizationConfig,
    pub campaign: &'a Campaign,
    /// Destination file; its parent directory exists
    pub path: &'a Path,
}

/// A written artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    /// Data rows written, header excluded
    pub row_count: u64,
}

/// Produces the CSV artifact for a request
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, job: ArtifactJob<'_>) -> Result<GeneratedArtifact>;
}

/// Moves a local artifact to durable storage
#[async_trait]
pub trait UploadGateway: Send + Sync {
    /// Uploads the file and returns its durable URL
    async fn upload(&self, local_path: &Path) -> Result<String>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Durable record of completed uploads
#[async_trait]
pub trait ProcessLedger: Send + Sync {
    /// Persists a new export process and returns it with its id
    async fn record(&self, process: NewExportProcess) -> Result<ExportProcess>;

    /// Most recent process recorded for `request_key`, if any
    async fn find_by_request_key(
        &self,
        organization_id: OrganizationId,
        request_key: &str,
    ) -> Result<Option<ExportProcess>>;
}

/// What a downstream party is told about a finished export
#[derive(Debug, Clone, Copy)]
pub struct ExportNotification<'a> {
    pub request: &'a ExportRequest,
    pub config: &'a OrganizationConfig,
    pub process: &'a ExportProcess,
    pub run_id: RunId,
}

impl ExportNotification<'_> {
    /// Durable URL of the artifact
    pub fn file_url(&self) -> &str {
        &self.process.file_url
    }
}

/// Tells a downstream party that an export is available
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, notification: ExportNotification<'_>) -> Result<()>;
}
