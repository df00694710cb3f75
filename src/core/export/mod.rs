//! Export orchestration
//!
//! - [`orchestrator`] - the per-request state machine
//! - [`audit`] - one audit entry per run, emitted by a drop guard
//! - [`artifact`] - local artifact naming and removal

pub mod artifact;
pub mod audit;
pub mod orchestrator;

pub use audit::{AuditEntry, AuditGuard, AuditSink, RunOutcome};
pub use orchestrator::{
    Collaborators, ExportOrchestrator, ExportState, OrchestratorSettings, RunControl, RunReport,
};
