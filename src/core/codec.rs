//! Message codec for "export requested" events
//!
//! The wire format is a JSON object with camelCase keys:
//!
//! ```json
//! {"organizationId": 42, "campaignId": 7, "exportType": "events"}
//! ```
//!
//! Decoding never panics and never performs I/O. Every failure is a
//! [`DecodeError`], which the consumer always discards.

use crate::core::checksum::calculate_checksum;
use crate::domain::{
    CampaignId, DecodeError, ExportKind, ExportRequest, OrganizationId, Result,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    organization_id: Option<i64>,
    campaign_id: Option<i64>,
    #[serde(default)]
    export_type: Option<String>,
    #[serde(default)]
    requested_by: Option<String>,
    #[serde(default)]
    webhook_url: Option<String>,
    #[serde(default)]
    requested_at: Option<DateTime<Utc>>,
}

/// Decodes one message payload into an [`ExportRequest`]
///
/// # Errors
///
/// - [`DecodeError::Empty`] for an empty or all-whitespace payload
/// - [`DecodeError::Malformed`] when the bytes are not a JSON object of the
///   expected shape, or `exportType` is unknown
/// - [`DecodeError::MissingField`] when `organizationId` or `campaignId` is
///   absent, zero or negative
pub fn decode(payload: &[u8]) -> std::result::Result<ExportRequest, DecodeError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::Malformed("expected a JSON object".to_string()));
    }
    let wire: WireRequest =
        serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let organization_id = wire
        .organization_id
        .and_then(|id| OrganizationId::new(id).ok())
        .ok_or(DecodeError::MissingField("organizationId"))?;
    let campaign_id = wire
        .campaign_id
        .and_then(|id| CampaignId::new(id).ok())
        .ok_or(DecodeError::MissingField("campaignId"))?;

    let export_kind = match wire.export_type.as_deref() {
        None | Some("") => ExportKind::default(),
        Some(raw) => raw.parse().map_err(DecodeError::Malformed)?,
    };

    Ok(ExportRequest {
        organization_id,
        campaign_id,
        export_kind,
        requested_by: wire.requested_by.filter(|s| !s.trim().is_empty()),
        webhook_url: wire.webhook_url.filter(|s| !s.trim().is_empty()),
        requested_at: wire.requested_at,
    })
}

/// Encodes a request into its wire payload
pub fn encode(request: &ExportRequest) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(request)?)
}

/// Deterministic key identifying one published request across its retries
///
/// SHA-256 over the canonical JSON form of the request plus the message's
/// request id, so an identical payload published again gets another key.
pub fn request_key(request: &ExportRequest, request_id: Option<Uuid>) -> Result<String> {
    let mut value = serde_json::to_value(request)?;
    if let (Some(id), Some(fields)) = (request_id, value.as_object_mut()) {
        fields.insert(
            "requestId".to_string(),
            serde_json::Value::String(id.to_string()),
        );
    }
    calculate_checksum(&value)
}
