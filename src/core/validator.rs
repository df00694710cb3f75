//! Campaign reportability checks
//!
//! Run against the resolved campaign, after lookup and before anything is
//! generated or uploaded. Every failure here is terminal.

use crate::domain::{Campaign, ExportRequest, InvalidCampaignState};
use chrono::{DateTime, Utc};

/// Checks that `campaign` can be exported for `request` at time `now`
///
/// A campaign is reportable when it belongs to the requesting organization,
/// has an end date that is not in the future, and was sent to at least one
/// recipient.
pub fn validate_campaign(
    request: &ExportRequest,
    campaign: &Campaign,
    now: DateTime<Utc>,
) -> Result<(), InvalidCampaignState> {
    if campaign.organization_id != request.organization_id {
        return Err(InvalidCampaignState::OrganizationMismatch {
            campaign_id: campaign.id,
            expected: request.organization_id,
            actual: campaign.organization_id,
        });
    }

    match campaign.ended_at {
        None => return Err(InvalidCampaignState::NotEnded(campaign.id)),
        Some(ended_at) if ended_at > now => {
            return Err(InvalidCampaignState::StillRunning {
                campaign_id: campaign.id,
                ended_at,
            })
        }
        Some(_) => {}
    }

    if campaign.recipient_count <= 0 {
        return Err(InvalidCampaignState::NoRecipients(campaign.id));
    }

    Ok(())
}
