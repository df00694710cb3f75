//! Export audit logger
//!
//! Every run's [`AuditEntry`] goes to the `campex::audit` tracing target and,
//! when `logging.audit_log_path` is set, is appended to that file as one JSON
//! line. `record` runs inside `AuditGuard::drop` on an async worker, so file
//! writes are handed to a `tracing-appender` background thread. Entries are
//! flushed when the logger is dropped. Write failures are logged and
//! swallowed.

use crate::core::export::audit::{AuditEntry, AuditSink, RunOutcome};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

struct AuditFile {
    writer: NonBlocking,
    _guard: WorkerGuard,
}

/// Audit sink backed by tracing and an optional JSON-lines file
pub struct ExportAuditLogger {
    file: Option<AuditFile>,
}

impl ExportAuditLogger {
    /// Create a new audit logger
    ///
    /// The audit file (and its parent directory) is opened up front so a bad
    /// path fails at startup instead of on the first run.
    pub fn new(log_path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = log_path else {
            return Ok(Self::tracing_only());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log: {}", path.display()))?;

        // audit entries must not be dropped when the channel is full
        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .thread_name("campex-audit")
            .finish(file);

        Ok(Self {
            file: Some(AuditFile {
                writer,
                _guard: guard,
            }),
        })
    }

    /// Logger that only emits tracing events
    pub fn tracing_only() -> Self {
        Self { file: None }
    }

    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let Some(file) = self.file.as_ref() else {
            return Ok(());
        };

        let mut line = serde_json::to_string(entry).context("Failed to serialize audit entry")?;
        line.push('\n');
        // one write per entry keeps lines whole on the worker thread
        file.writer
            .clone()
            .write_all(line.as_bytes())
            .context("Failed to queue audit entry")?;
        Ok(())
    }
}

impl AuditSink for ExportAuditLogger {
    fn record(&self, entry: &AuditEntry) {
        match entry.outcome {
            RunOutcome::Succeeded => tracing::info!(
                target: "campex::audit",
                run_id = %entry.run_id,
                organization_id = entry.organization_id,
                campaign_id = entry.campaign_id,
                export_kind = %entry.export_kind,
                attempt = entry.attempt,
                final_state = ?entry.final_state,
                file_url = entry.file_url.as_deref().unwrap_or(""),
                reused_upload = entry.reused_upload,
                processing_time_ms = entry.processing_time_ms,
                "Export run succeeded"
            ),
            RunOutcome::Failed | RunOutcome::Aborted => tracing::warn!(
                target: "campex::audit",
                run_id = %entry.run_id,
                organization_id = entry.organization_id,
                campaign_id = entry.campaign_id,
                export_kind = %entry.export_kind,
                attempt = entry.attempt,
                outcome = ?entry.outcome,
                final_state = ?entry.final_state,
                failed_step = entry.failed_step.as_deref().unwrap_or(""),
                error = entry.error.as_deref().unwrap_or(""),
                processing_time_ms = entry.processing_time_ms,
                "Export run did not complete"
            ),
        }

        if let Err(e) = self.append(entry) {
            tracing::warn!(error = %e, "Failed to append audit entry");
        }
    }
}
