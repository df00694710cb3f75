//! Export request and its wire-level retry metadata

use crate::domain::ids::{CampaignId, OrganizationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which report an export produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Campaign performance summary
    #[default]
    Campaign,
    /// Per-recipient event log
    Events,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Campaign => "campaign",
            ExportKind::Events => "events",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "campaign" => Ok(ExportKind::Campaign),
            "events" => Ok(ExportKind::Events),
            other => Err(format!(
                "Invalid export type '{other}'. Must be one of: campaign, events"
            )),
        }
    }
}

/// One "export requested" event, decoded
///
/// Immutable once decoded. Identifies the business context of an export, not
/// a delivery attempt: retries of the same message carry an equal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub organization_id: OrganizationId,
    pub campaign_id: CampaignId,
    #[serde(rename = "exportType")]
    pub export_kind: ExportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
}

impl ExportRequest {
    /// Creates a campaign export request with no optional fields
    pub fn new(organization_id: OrganizationId, campaign_id: CampaignId) -> Self {
        Self {
            organization_id,
            campaign_id,
            export_kind: ExportKind::Campaign,
            requested_by: None,
            webhook_url: None,
            requested_at: None,
        }
    }

    pub fn with_kind(mut self, kind: ExportKind) -> Self {
        self.export_kind = kind;
        self
    }

    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_requested_at(mut self, at: DateTime<Utc>) -> Self {
        self.requested_at = Some(at);
        self
    }

    /// File stem shared by every artifact of this request
    pub fn artifact_stem(&self) -> String {
        format!(
            "campaign_export_{}_{}_{}",
            self.organization_id, self.campaign_id, self.export_kind
        )
    }

    /// Message key used to partition the stream by campaign
    pub fn partition_key(&self) -> String {
        format!("{}:{}", self.organization_id, self.campaign_id)
    }
}

/// Message headers as carried by the broker
pub type MessageHeaders = BTreeMap<String, String>;

/// Retry bookkeeping carried next to the request, never persisted
///
/// `request_id` identifies one published message across its retries. Two
/// messages with identical payloads still get different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryMetadata {
    pub attempt_count: u32,
    pub request_id: Option<Uuid>,
}

impl RetryMetadata {
    /// Header holding the attempt count
    pub const HEADER: &'static str = "attempt_count";

    /// Header name used by older producers
    pub const LEGACY_HEADER: &'static str = "discard_retry_count";

    /// Header holding the message identity
    pub const REQUEST_ID_HEADER: &'static str = "request_id";

    pub fn new(attempt_count: u32) -> Self {
        Self {
            attempt_count,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Keeps an existing request id, or assigns a fresh one
    pub fn stamped(self) -> Self {
        match self.request_id {
            Some(_) => self,
            None => self.with_request_id(Uuid::new_v4()),
        }
    }

    /// Reads the metadata from headers; absent or garbled values mean attempt 0
    /// and no request id
    pub fn from_headers(headers: &MessageHeaders) -> Self {
        let raw = headers
            .get(Self::HEADER)
            .or_else(|| headers.get(Self::LEGACY_HEADER));
        let attempt_count = raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0);
        let request_id = headers
            .get(Self::REQUEST_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v.trim()).ok());
        Self {
            attempt_count,
            request_id,
        }
    }

    /// Metadata for the next resubmission
    pub fn next(&self) -> Self {
        Self {
            attempt_count: self.attempt_count.saturating_add(1),
            request_id: self.request_id,
        }
    }

    /// Writes the attempt count and request id into `headers`
    pub fn write_to(&self, headers: &mut MessageHeaders) {
        headers.insert(Self::HEADER.to_string(), self.attempt_count.to_string());
        headers.remove(Self::LEGACY_HEADER);
        if let Some(id) = self.request_id {
            headers.insert(Self::REQUEST_ID_HEADER.to_string(), id.to_string());
        }
    }

    /// Whether this delivery came through the retry path
    pub fn is_retry(&self) -> bool {
        self.attempt_count > 0
    }
}
