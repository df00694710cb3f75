//! Campaign, organization context and per-organization export settings
//!
//! All three are owned by external stores and read-only to the pipeline.

use crate::domain::ids::{CampaignId, OrganizationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ad platform a campaign ran on
///
/// Report data is fetched per platform; see
/// [`ReportSourceRegistry`](crate::adapters::report::ReportSourceRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Meta,
    Google,
    LinkedIn,
    TikTok,
    Email,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Meta,
        Platform::Google,
        Platform::LinkedIn,
        Platform::TikTok,
        Platform::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::Google => "google",
            Platform::LinkedIn => "linkedin",
            Platform::TikTok => "tiktok",
            Platform::Email => "email",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unsupported platform '{s}'"))
    }
}

/// A campaign as stored by the organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub platform: Platform,
    /// Status as stored by the organization (informational)
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub recipient_count: i64,
}

/// Where an organization's data lives
///
/// Resolved once per run, before any config or campaign lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationContext {
    pub organization_id: OrganizationId,
    /// Database schema holding the organization's campaigns and stats
    pub schema: String,
}

/// Per-organization export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationConfig {
    pub timezone: String,
    pub csv_delimiter: u8,
    pub webhook_url: Option<String>,
    pub notify_email: Option<String>,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            csv_delimiter: b',',
            webhook_url: None,
            notify_email: None,
        }
    }
}
