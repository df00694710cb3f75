//! Export orchestrator
//!
//! Drives one export request through
//! `Received → ContextResolved → Generated → Uploaded → Recorded → Notified → Cleaned`.
//! Any step may fail; the failure is wrapped with the step name and returned
//! to the caller, which alone decides whether to retry. The orchestrator
//! never retries internally.

use crate::adapters::traits::{
    ArtifactGenerator, ArtifactJob, CampaignStore, ConfigStore, ContextResolver,
    ExportNotification, NotificationGateway, ProcessLedger, UploadGateway,
};
use crate::config::{CampexConfig, DedupePolicy};
use crate::core::checksum::checksum_file;
use crate::core::codec::request_key;
use crate::core::export::artifact::{artifact_path, remove_artifact};
use crate::core::export::audit::{AuditGuard, AuditSink};
use crate::core::validator::validate_campaign;
use crate::domain::{
    CampexError, ExportError, ExportProcess, ExportRequest, ExportStep, NewExportProcess,
    OrganizationConfig, RetryMetadata, RunId,
};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::Instrument;

/// States of one export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Received,
    ContextResolved,
    Generated,
    Uploaded,
    Recorded,
    Notified,
    /// Terminal success
    Cleaned,
}

/// External collaborators of the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub contexts: Arc<dyn ContextResolver>,
    pub configs: Arc<dyn ConfigStore>,
    pub campaigns: Arc<dyn CampaignStore>,
    pub generator: Arc<dyn ArtifactGenerator>,
    pub uploader: Arc<dyn UploadGateway>,
    pub ledger: Arc<dyn ProcessLedger>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub audit: Arc<dyn AuditSink>,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Directory artifacts are written to
    pub work_dir: PathBuf,
    pub dedupe: DedupePolicy,
}

impl From<&CampexConfig> for OrchestratorSettings {
    fn from(config: &CampexConfig) -> Self {
        Self {
            work_dir: PathBuf::from(&config.artifacts.work_dir),
            dedupe: config.artifacts.dedupe,
        }
    }
}

/// Cancellation signal and deadline for one run
///
/// Both are checked at every step boundary; the deadline also bounds each
/// collaborator call. Cleanup is exempt from both.
#[derive(Debug, Clone)]
pub struct RunControl {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<tokio::time::Instant>,
}

impl RunControl {
    /// No cancellation and no deadline
    pub fn unbounded() -> Self {
        Self {
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(tokio::time::Instant::now() + timeout);
        self
    }

    fn check(&self, step: ExportStep) -> Result<(), ExportError> {
        let cancelled = self.cancel.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self
            .deadline
            .is_some_and(|deadline| tokio::time::Instant::now() >= deadline);
        if cancelled || expired {
            return Err(ExportError::Cancelled { step });
        }
        Ok(())
    }

    async fn run<T, F>(&self, step: ExportStep, fut: F) -> Result<T, ExportError>
    where
        F: Future<Output = crate::domain::Result<T>>,
    {
        self.check(step)?;
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| ExportError::Cancelled { step })?,
            None => fut.await,
        };
        result.map_err(|e| ExportError::step(step, e))
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub state: ExportState,
    pub process: ExportProcess,
    /// The upload of an earlier attempt was reused
    pub reused: bool,
    /// Artifact written by this run, already removed
    pub artifact_path: Option<PathBuf>,
    /// Why removing the artifact failed, if it did
    pub cleanup_error: Option<String>,
    pub duration: Duration,
}

/// Runs export requests against a set of collaborators
#[derive(Clone)]
pub struct ExportOrchestrator {
    collaborators: Collaborators,
    settings: OrchestratorSettings,
}

impl ExportOrchestrator {
    pub fn new(collaborators: Collaborators, settings: OrchestratorSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    /// Runs one request to completion
    ///
    /// Exactly one audit entry is emitted per call, however the run ends.
    ///
    /// # Errors
    ///
    /// Returns the first failing step wrapped in an [`ExportError`]. A failure
    /// to remove the artifact after notification is not an error; it is
    /// reported through [`RunReport::cleanup_error`].
    pub async fn run(
        &self,
        request: &ExportRequest,
        retry: RetryMetadata,
        control: &RunControl,
    ) -> Result<RunReport, ExportError> {
        let run_id = RunId::new();
        let span = tracing::info_span!(
            "export_run",
            run_id = %run_id,
            organization_id = %request.organization_id,
            campaign_id = %request.campaign_id,
            attempt = retry.attempt_count,
            request_id = ?retry.request_id,
        );
        self.run_with_id(request, retry, control, run_id)
            .instrument(span)
            .await
    }

    async fn run_with_id(
        &self,
        request: &ExportRequest,
        retry: RetryMetadata,
        control: &RunControl,
        run_id: RunId,
    ) -> Result<RunReport, ExportError> {
        let started = Instant::now();
        let mut audit = AuditGuard::new(
            self.collaborators.audit.clone(),
            run_id,
            request,
            retry.attempt_count,
        );

        let mut artifact: Option<PathBuf> = None;
        let result = self
            .execute(request, retry, control, run_id, &mut audit, &mut artifact)
            .await;

        match result {
            Ok((process, reused)) => {
                let cleanup_error = match artifact.as_deref() {
                    Some(path) => Self::cleanup(path).await,
                    None => None,
                };
                audit.reached(ExportState::Cleaned);
                audit.succeed();

                tracing::info!(
                    process_id = %process.id,
                    file_url = %process.file_url,
                    reused,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Export completed"
                );

                Ok(RunReport {
                    run_id,
                    state: ExportState::Cleaned,
                    process,
                    reused,
                    artifact_path: artifact,
                    cleanup_error,
                    duration: started.elapsed(),
                })
            }
            Err(error) => {
                if let Some(path) = artifact.as_deref() {
                    Self::cleanup(path).await;
                }
                audit.fail(&error);

                tracing::warn!(
                    step = %error.failed_step(),
                    kind = ?error.kind(),
                    error = %error,
                    "Export failed"
                );
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        request: &ExportRequest,
        retry: RetryMetadata,
        control: &RunControl,
        run_id: RunId,
        audit: &mut AuditGuard,
        artifact: &mut Option<PathBuf>,
    ) -> Result<(ExportProcess, bool), ExportError> {
        let c = &self.collaborators;

        // Received → ContextResolved
        let context = control
            .run(ExportStep::ResolveContext, c.contexts.resolve(request.organization_id))
            .await?;
        let config = control
            .run(ExportStep::LoadConfig, c.configs.load_config(&context))
            .await?;
        let campaign = control
            .run(
                ExportStep::LoadCampaign,
                c.campaigns.load_campaign(&context, request.campaign_id),
            )
            .await?;
        audit.reached(ExportState::ContextResolved);
        tracing::debug!(schema = %context.schema, platform = %campaign.platform, "Context resolved");

        control.check(ExportStep::Validate)?;
        validate_campaign(request, &campaign, Utc::now())?;

        // Without a request id an identical earlier request would share the key
        if self.settings.dedupe == DedupePolicy::ReuseOnRetry
            && retry.is_retry()
            && retry.request_id.is_some()
        {
            let key = request_key(request, retry.request_id)
                .map_err(|e| ExportError::step(ExportStep::LookupProcess, e))?;
            let existing = control
                .run(
                    ExportStep::LookupProcess,
                    c.ledger.find_by_request_key(request.organization_id, &key),
                )
                .await?;
            if let Some(process) = existing {
                tracing::info!(
                    process_id = %process.id,
                    "Reusing upload recorded by an earlier attempt"
                );
                audit.uploaded(&process.file_url);
                audit.recorded(process.id, true);
                audit.reached(ExportState::Recorded);
                self.notify(request, &config, &process, run_id, control)
                    .await?;
                audit.reached(ExportState::Notified);
                return Ok((process, true));
            }
        }

        // ContextResolved → Generated
        let path = artifact_path(&self.settings.work_dir, request, &run_id);
        control
            .run(ExportStep::Generate, ensure_dir(&self.settings.work_dir))
            .await?;
        *artifact = Some(path.clone());
        let generated = control
            .run(
                ExportStep::Generate,
                c.generator.generate(ArtifactJob {
                    request,
                    context: &context,
                    config: &config,
                    campaign: &campaign,
                    path: &path,
                }),
            )
            .await?;
        let checksum = control
            .run(ExportStep::Generate, checksum_file(&generated.path))
            .await?;
        audit.reached(ExportState::Generated);
        tracing::debug!(
            path = %generated.path.display(),
            rows = generated.row_count,
            "Artifact generated"
        );

        // Generated → Uploaded
        let file_url = control
            .run(ExportStep::Upload, c.uploader.upload(&generated.path))
            .await?;
        audit.uploaded(&file_url);
        audit.reached(ExportState::Uploaded);
        tracing::debug!(backend = c.uploader.backend(), file_url = %file_url, "Artifact uploaded");

        // Uploaded → Recorded
        let key = request_key(request, retry.request_id)
            .map_err(|e| ExportError::step(ExportStep::Record, e))?;
        let process = control
            .run(
                ExportStep::Record,
                c.ledger.record(NewExportProcess {
                    organization_id: request.organization_id,
                    campaign_id: request.campaign_id,
                    file_url,
                    request_key: key,
                    checksum,
                    row_count: generated.row_count,
                }),
            )
            .await?;
        audit.recorded(process.id, false);
        audit.reached(ExportState::Recorded);

        // Recorded → Notified
        self.notify(request, &config, &process, run_id, control)
            .await?;
        audit.reached(ExportState::Notified);

        Ok((process, false))
    }

    async fn notify(
        &self,
        request: &ExportRequest,
        config: &OrganizationConfig,
        process: &ExportProcess,
        run_id: RunId,
        control: &RunControl,
    ) -> Result<(), ExportError> {
        control
            .run(
                ExportStep::Notify,
                self.collaborators.notifier.notify(ExportNotification {
                    request,
                    config,
                    process,
                    run_id,
                }),
            )
            .await
    }

    /// Removes the artifact, returning the failure message instead of propagating it
    async fn cleanup(path: &Path) -> Option<String> {
        match remove_artifact(path).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                Some(e.to_string())
            }
        }
    }
}

async fn ensure_dir(dir: &Path) -> crate::domain::Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        CampexError::Io(format!(
            "Failed to create work directory {}: {e}",
            dir.display()
        ))
    })
}
