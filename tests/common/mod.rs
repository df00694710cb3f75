//! Recording fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use campex::adapters::report::{CsvArtifactGenerator, ReportSourceRegistry};
use campex::adapters::traits::{
    CampaignStore, ConfigStore, ContextResolver, ExportNotification, NotificationGateway,
    ProcessLedger, ReportSource, UploadGateway,
};
use campex::config::DedupePolicy;
use campex::core::export::{
    AuditEntry, AuditSink, Collaborators, ExportOrchestrator, OrchestratorSettings,
};
use campex::domain::{
    Campaign, CampaignId, CampexError, EventRow, ExportProcess, NewExportProcess,
    OrganizationConfig, OrganizationContext, OrganizationId, PerformanceRow, Platform, ProcessId,
    Result, RunId,
};
use chrono::{Duration, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const ORG: i64 = 42;
pub const CAMPAIGN: i64 = 7;

/// A campaign that ended yesterday and reached 1200 recipients
pub fn ended_campaign(organization_id: i64, campaign_id: i64) -> Campaign {
    Campaign {
        id: CampaignId::from(campaign_id),
        organization_id: OrganizationId::from(organization_id),
        name: "Spring Sale".to_string(),
        platform: Platform::Meta,
        status: "finished".to_string(),
        started_at: Some(Utc::now() - Duration::days(14)),
        ended_at: Some(Utc::now() - Duration::days(1)),
        recipient_count: 1200,
    }
}

/// In-memory organization directory and report source
pub struct FakeDirectory {
    pub campaigns: Mutex<Vec<Campaign>>,
    pub config: Mutex<OrganizationConfig>,
    /// Resolve fails with a database error while > 0
    pub outages: AtomicUsize,
    pub resolve_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self {
            campaigns: Mutex::new(campaigns),
            config: Mutex::new(OrganizationConfig::default()),
            outages: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContextResolver for FakeDirectory {
    async fn resolve(&self, organization_id: OrganizationId) -> Result<OrganizationContext> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .outages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CampexError::Database("connection refused".to_string()));
        }
        let known = self
            .campaigns
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.organization_id == organization_id);
        if !known {
            return Err(CampexError::NotFound(format!("organization {organization_id}")));
        }
        Ok(OrganizationContext {
            organization_id,
            schema: format!("org_{organization_id}"),
        })
    }
}

#[async_trait]
impl ConfigStore for FakeDirectory {
    async fn load_config(&self, _context: &OrganizationContext) -> Result<OrganizationConfig> {
        Ok(self.config.lock().unwrap().clone())
    }
}

#[async_trait]
impl CampaignStore for FakeDirectory {
    async fn load_campaign(
        &self,
        _context: &OrganizationContext,
        campaign_id: CampaignId,
    ) -> Result<Campaign> {
        self.campaigns
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == campaign_id)
            .cloned()
            .ok_or_else(|| CampexError::NotFound(format!("campaign {campaign_id}")))
    }
}

#[async_trait]
impl ReportSource for FakeDirectory {
    async fn performance(
        &self,
        _context: &OrganizationContext,
        _campaign: &Campaign,
    ) -> Result<Vec<PerformanceRow>> {
        Ok((1..=3)
            .map(|day| PerformanceRow {
                date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap_or_default(),
                impressions: 1000 * i64::from(day),
                clicks: 20 * i64::from(day),
                conversions: i64::from(day),
                spend_cents: 4999,
                currency: "EUR".to_string(),
            })
            .collect())
    }

    async fn events(
        &self,
        _context: &OrganizationContext,
        _campaign: &Campaign,
    ) -> Result<Vec<EventRow>> {
        Ok(vec![EventRow {
            occurred_at: Utc::now() - Duration::days(2),
            recipient: "ada@example.com".to_string(),
            event_type: "open".to_string(),
            detail: None,
        }])
    }
}

/// One upload attempt seen by [`RecordingUploader`]
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    pub path: PathBuf,
    pub existed: bool,
    pub content: String,
}

/// Upload gateway that records attempts and can be told to fail
#[derive(Default)]
pub struct RecordingUploader {
    pub attempts: Mutex<Vec<UploadAttempt>>,
    /// Number of upcoming uploads that fail with a storage error
    pub failures: AtomicUsize,
    /// Replace the artifact with a directory so removing it fails
    pub block_cleanup: Mutex<bool>,
}

impl RecordingUploader {
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<UploadAttempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadGateway for RecordingUploader {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(local_path).unwrap_or_default();
        self.attempts.lock().unwrap().push(UploadAttempt {
            path: local_path.to_path_buf(),
            existed: local_path.exists(),
            content,
        });

        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CampexError::Storage("503 Service Unavailable".to_string()));
        }

        if *self.block_cleanup.lock().unwrap() {
            std::fs::remove_file(local_path)?;
            std::fs::create_dir(local_path)?;
            std::fs::write(local_path.join("keep"), b"x")?;
        }

        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Ok(format!("https://campaign-exports/upload/{name}"))
    }

    fn backend(&self) -> &'static str {
        "recording"
    }
}

/// Ledger keeping processes in memory
#[derive(Default)]
pub struct RecordingLedger {
    pub processes: Mutex<Vec<ExportProcess>>,
    /// Number of upcoming `record` calls that fail
    pub failures: AtomicUsize,
}

impl RecordingLedger {
    pub fn processes(&self) -> Vec<ExportProcess> {
        self.processes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLedger for RecordingLedger {
    async fn record(&self, process: NewExportProcess) -> Result<ExportProcess> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CampexError::Database("deadlock detected".to_string()));
        }
        let mut processes = self.processes.lock().unwrap();
        let id = ProcessId::from(processes.len() as i64 + 1);
        let process = process.into_process(id, Utc::now());
        processes.push(process.clone());
        Ok(process)
    }

    async fn find_by_request_key(
        &self,
        organization_id: OrganizationId,
        request_key: &str,
    ) -> Result<Option<ExportProcess>> {
        Ok(self
            .processes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| p.organization_id == organization_id && p.request_key == request_key)
            .cloned())
    }
}

/// One notification seen by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub file_url: String,
    pub process_id: ProcessId,
    pub run_id: RunId,
}

/// Notification gateway that records what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentNotification>>,
    pub failures: AtomicUsize,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotifier {
    async fn notify(&self, notification: ExportNotification<'_>) -> Result<()> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CampexError::Notification("webhook returned 502".to_string()));
        }
        self.sent.lock().unwrap().push(SentNotification {
            file_url: notification.file_url().to_string(),
            process_id: notification.process.id,
            run_id: notification.run_id,
        });
        Ok(())
    }
}

/// Audit sink collecting entries
#[derive(Default)]
pub struct RecordingAudit {
    pub entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, entry: &AuditEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Fakes wired into a real orchestrator with a temporary work directory
pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub uploader: Arc<RecordingUploader>,
    pub ledger: Arc<RecordingLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<RecordingAudit>,
    pub work_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_campaigns(vec![ended_campaign(ORG, CAMPAIGN)])
    }

    pub fn with_campaigns(campaigns: Vec<Campaign>) -> Self {
        Self {
            directory: Arc::new(FakeDirectory::new(campaigns)),
            uploader: Arc::new(RecordingUploader::default()),
            ledger: Arc::new(RecordingLedger::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            audit: Arc::new(RecordingAudit::default()),
            work_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        let registry = ReportSourceRegistry::new().with_all(self.directory.clone());
        Collaborators {
            contexts: self.directory.clone(),
            configs: self.directory.clone(),
            campaigns: self.directory.clone(),
            generator: Arc::new(CsvArtifactGenerator::new(registry, true)),
            uploader: self.uploader.clone(),
            ledger: self.ledger.clone(),
            notifier: self.notifier.clone(),
            audit: self.audit.clone(),
        }
    }

    pub fn orchestrator(&self, dedupe: DedupePolicy) -> ExportOrchestrator {
        ExportOrchestrator::new(
            self.collaborators(),
            OrchestratorSettings {
                work_dir: self.work_dir.path().to_path_buf(),
                dedupe,
            },
        )
    }

    /// Files left in the work directory
    pub fn leftover_artifacts(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
