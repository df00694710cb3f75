//! Per-run audit entry
//!
//! Every orchestrator run emits exactly one [`AuditEntry`]. The entry is
//! built up by an [`AuditGuard`] while the run progresses and handed to the
//! [`AuditSink`] when the guard drops, so it is written on every exit path:
//! success, error, the run future being dropped on cancellation, or a panic.

use crate::core::export::orchestrator::ExportState;
use crate::domain::{ExportError, ExportRequest, ProcessId, RunId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Failed,
    /// The run future was dropped or panicked before reporting
    Aborted,
}

/// One structured audit record
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub run_id: RunId,
    pub organization_id: i64,
    pub campaign_id: i64,
    pub export_kind: String,
    pub attempt: u32,
    pub outcome: RunOutcome,
    /// Last state the run reached
    pub final_state: ExportState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<ProcessId>,
    pub reused_upload: bool,
    pub processing_time_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Destination of audit entries
///
/// Called from `Drop`, so implementations must not block for long and must
/// not panic.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Accumulates the audit entry of one run and emits it on drop
pub struct AuditGuard {
    sink: Arc<dyn AuditSink>,
    started: Instant,
    entry: AuditEntry,
}

impl AuditGuard {
    pub fn new(
        sink: Arc<dyn AuditSink>,
        run_id: RunId,
        request: &ExportRequest,
        attempt: u32,
    ) -> Self {
        Self {
            sink,
            started: Instant::now(),
            entry: AuditEntry {
                run_id,
                organization_id: request.organization_id.get(),
                campaign_id: request.campaign_id.get(),
                export_kind: request.export_kind.to_string(),
                attempt,
                outcome: RunOutcome::Aborted,
                final_state: ExportState::Received,
                failed_step: None,
                error: None,
                file_url: None,
                process_id: None,
                reused_upload: false,
                processing_time_ms: 0,
                finished_at: Utc::now(),
            },
        }
    }

    pub fn reached(&mut self, state: ExportState) {
        self.entry.final_state = state;
    }

    pub fn uploaded(&mut self, file_url: &str) {
        self.entry.file_url = Some(file_url.to_string());
    }

    pub fn recorded(&mut self, process_id: ProcessId, reused: bool) {
        self.entry.process_id = Some(process_id);
        self.entry.reused_upload = reused;
    }

    pub fn succeed(&mut self) {
        self.entry.outcome = RunOutcome::Succeeded;
    }

    pub fn fail(&mut self, error: &ExportError) {
        self.entry.outcome = RunOutcome::Failed;
        self.entry.failed_step = Some(error.failed_step().to_string());
        self.entry.error = Some(error.to_string());
    }
}

impl Drop for AuditGuard {
    fn drop(&mut self) {
        self.entry.processing_time_ms = self.started.elapsed().as_millis() as u64;
        self.entry.finished_at = Utc::now();
        if self.entry.outcome == RunOutcome::Aborted && self.entry.error.is_none() {
            self.entry.error = Some("run ended without reporting an outcome".to_string());
        }
        self.sink.record(&self.entry);
    }
}
