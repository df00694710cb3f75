//! Export process audit record

use crate::domain::ids::{CampaignId, OrganizationId, ProcessId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable proof that an artifact was generated and uploaded
///
/// Created exactly once per successful upload, before notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProcess {
    pub id: ProcessId,
    pub organization_id: OrganizationId,
    pub campaign_id: CampaignId,
    pub file_url: String,
    pub request_key: String,
    pub checksum: String,
    pub row_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Fields of an export process before the ledger assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExportProcess {
    pub organization_id: OrganizationId,
    pub campaign_id: CampaignId,
    pub file_url: String,
    pub request_key: String,
    pub checksum: String,
    pub row_count: u64,
}

impl NewExportProcess {
    /// Materializes the record once the ledger has stored it
    pub fn into_process(self, id: ProcessId, created_at: DateTime<Utc>) -> ExportProcess {
        ExportProcess {
            id,
            organization_id: self.organization_id,
            campaign_id: self.campaign_id,
            file_url: self.file_url,
            request_key: self.request_key,
            checksum: self.checksum,
            row_count: self.row_count,
            created_at,
        }
    }
}
