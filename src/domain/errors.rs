//! Domain error types
//!
//! Two layers of errors live here:
//!
//! - [`CampexError`] is the crate-wide error returned by collaborators
//!   (stores, uploaders, brokers). It never exposes third-party types.
//! - [`ExportError`] is what one orchestrator run fails with. It wraps a
//!   collaborator error with the [`ExportStep`] that produced it, so the
//!   consumer runtime can classify it without knowing any collaborator.

use crate::domain::ids::{CampaignId, OrganizationId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main Campex error type
#[derive(Debug, Error)]
pub enum CampexError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database errors (pool, query, statement)
    #[error("Database error: {0}")]
    Database(String),

    /// A looked-up entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Downstream notification errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Message broker errors
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Artifact generation errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl CampexError {
    /// Whether the error reports an absent entity rather than an unavailable one
    pub fn is_not_found(&self) -> bool {
        matches!(self, CampexError::NotFound(_))
    }

    /// Prefixes the message with `context` while keeping the variant
    pub fn with_prefix(self, context: impl fmt::Display) -> Self {
        match self {
            CampexError::Configuration(m) => CampexError::Configuration(format!("{context}: {m}")),
            CampexError::Database(m) => CampexError::Database(format!("{context}: {m}")),
            CampexError::NotFound(m) => CampexError::NotFound(format!("{context}: {m}")),
            CampexError::Storage(m) => CampexError::Storage(format!("{context}: {m}")),
            CampexError::Notification(m) => CampexError::Notification(format!("{context}: {m}")),
            CampexError::Messaging(m) => CampexError::Messaging(format!("{context}: {m}")),
            CampexError::Generation(m) => CampexError::Generation(format!("{context}: {m}")),
            CampexError::Validation(m) => CampexError::Validation(format!("{context}: {m}")),
            CampexError::Serialization(m) => {
                CampexError::Serialization(format!("{context}: {m}"))
            }
            CampexError::Io(m) => CampexError::Io(format!("{context}: {m}")),
            CampexError::Other(m) => CampexError::Other(format!("{context}: {m}")),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CampexError {
    fn from(err: std::io::Error) -> Self {
        CampexError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CampexError {
    fn from(err: serde_json::Error) -> Self {
        CampexError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CampexError {
    fn from(err: toml::de::Error) -> Self {
        CampexError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from csv writer errors
impl From<csv::Error> for CampexError {
    fn from(err: csv::Error) -> Self {
        CampexError::Generation(format!("CSV error: {err}"))
    }
}

/// Why a wire message could not be turned into an export request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload had no bytes at all
    #[error("payload is empty")]
    Empty,

    /// The payload is not well-formed JSON for an export request
    #[error("payload is not a valid export request: {0}")]
    Malformed(String),

    /// A required identifier is absent, zero or negative
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Reasons a resolved campaign cannot be exported
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCampaignState {
    /// Campaign has no end date yet
    #[error("campaign {0} has not ended")]
    NotEnded(CampaignId),

    /// Campaign end date lies in the future
    #[error("campaign {campaign_id} is still running until {ended_at}")]
    StillRunning {
        campaign_id: CampaignId,
        ended_at: DateTime<Utc>,
    },

    /// Campaign was sent to nobody
    #[error("campaign {0} has no recipients")]
    NoRecipients(CampaignId),

    /// Campaign belongs to a different organization than the request
    #[error("campaign {campaign_id} belongs to organization {actual}, not {expected}")]
    OrganizationMismatch {
        campaign_id: CampaignId,
        expected: OrganizationId,
        actual: OrganizationId,
    },
}

/// Steps of one export run, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStep {
    Decode,
    ResolveContext,
    LoadConfig,
    LoadCampaign,
    Validate,
    LookupProcess,
    Generate,
    Upload,
    Record,
    Notify,
    Cleanup,
}

impl ExportStep {
    /// Stable name used in logs and dead-letter headers
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStep::Decode => "decode",
            ExportStep::ResolveContext => "resolve_context",
            ExportStep::LoadConfig => "load_config",
            ExportStep::LoadCampaign => "load_campaign",
            ExportStep::Validate => "validate",
            ExportStep::LookupProcess => "lookup_process",
            ExportStep::Generate => "generate",
            ExportStep::Upload => "upload",
            ExportStep::Record => "record",
            ExportStep::Notify => "notify",
            ExportStep::Cleanup => "cleanup",
        }
    }

    /// Failure category a collaborator error in this step belongs to
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ExportStep::Decode => FailureKind::Decode,
            ExportStep::Validate => FailureKind::Validation,
            ExportStep::ResolveContext
            | ExportStep::LoadConfig
            | ExportStep::LoadCampaign
            | ExportStep::LookupProcess => FailureKind::Lookup,
            ExportStep::Generate => FailureKind::Generation,
            ExportStep::Upload => FailureKind::Upload,
            ExportStep::Record => FailureKind::Record,
            ExportStep::Notify => FailureKind::Notify,
            ExportStep::Cleanup => FailureKind::Cleanup,
        }
    }
}

impl fmt::Display for ExportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    Validation,
    Lookup,
    Generation,
    Upload,
    Record,
    Notify,
    Cleanup,
    Cancelled,
}

/// Failure of one export run
#[derive(Debug, Error)]
pub enum ExportError {
    /// The message could not be decoded
    #[error("decode message: {0}")]
    Decode(#[from] DecodeError),

    /// The resolved campaign is not reportable
    #[error("validate campaign: {0}")]
    InvalidCampaignState(#[from] InvalidCampaignState),

    /// A collaborator failed during `step`
    #[error("{step}: {source}")]
    Step {
        step: ExportStep,
        #[source]
        source: CampexError,
    },

    /// Cancellation or the message deadline tripped before `step`
    #[error("{step}: run cancelled")]
    Cancelled { step: ExportStep },
}

impl ExportError {
    /// Wraps a collaborator error with the step that produced it
    pub fn step(step: ExportStep, source: CampexError) -> Self {
        ExportError::Step { step, source }
    }

    /// Step the run failed in
    pub fn failed_step(&self) -> ExportStep {
        match self {
            ExportError::Decode(_) => ExportStep::Decode,
            ExportError::InvalidCampaignState(_) => ExportStep::Validate,
            ExportError::Step { step, .. } | ExportError::Cancelled { step } => *step,
        }
    }

    /// Failure category
    pub fn kind(&self) -> FailureKind {
        match self {
            ExportError::Decode(_) => FailureKind::Decode,
            ExportError::InvalidCampaignState(_) => FailureKind::Validation,
            ExportError::Step { step, .. } => step.failure_kind(),
            ExportError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// Whether retrying can never succeed
    ///
    /// Decode and validation failures are terminal, and so is a lookup that
    /// found nothing: absence will not change by re-reading.
    pub fn is_terminal(&self) -> bool {
        match self {
            ExportError::Decode(_) | ExportError::InvalidCampaignState(_) => true,
            ExportError::Step { step, source } => {
                step.failure_kind() == FailureKind::Lookup && source.is_not_found()
            }
            ExportError::Cancelled { .. } => false,
        }
    }
}
