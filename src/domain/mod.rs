//! Domain models and types for Campex.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`OrganizationId`], [`CampaignId`], [`ProcessId`], [`RunId`])
//! - **The export request** ([`ExportRequest`]) and its wire-only [`RetryMetadata`]
//! - **Read-only external data** ([`Campaign`], [`OrganizationContext`], [`OrganizationConfig`])
//! - **The audit record** ([`ExportProcess`])
//! - **Report rows** ([`PerformanceRow`], [`EventRow`]) fetched per platform
//! - **Error types** ([`CampexError`], [`ExportError`]) and the [`Result`] alias
//!
//! # Type Safety
//!
//! ```rust
//! use campex::domain::{CampaignId, ExportRequest, OrganizationId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ExportRequest::new(OrganizationId::new(42)?, CampaignId::new(7)?);
//! assert_eq!(request.artifact_stem(), "campaign_export_42_7_campaign");
//! # Ok(())
//! # }
//! ```

pub mod campaign;
pub mod context;
pub mod errors;
pub mod ids;
pub mod process;
pub mod report;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use campaign::{Campaign, OrganizationConfig, OrganizationContext, Platform};
pub use errors::{
    CampexError, DecodeError, ExportError, ExportStep, FailureKind, InvalidCampaignState,
};
pub use ids::{CampaignId, OrganizationId, ProcessId, RunId};
pub use process::{ExportProcess, NewExportProcess};
pub use report::{EventRow, PerformanceRow};
pub use request::{ExportKind, ExportRequest, MessageHeaders, RetryMetadata};
pub use result::Result;
