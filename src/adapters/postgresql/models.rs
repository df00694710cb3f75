//! Row mapping for the PostgreSQL adapters
//!
//! Column types follow `migrations/001_initial_schema.sql`.

use crate::domain::{
    Campaign, CampaignId, CampexError, EventRow, ExportProcess, OrganizationConfig,
    OrganizationId, PerformanceRow, Platform, ProcessId, Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

/// Reads one column, naming it in the error
pub(crate) fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| CampexError::Database(format!("Failed to read column '{name}': {e}")))
}

/// `organizations` row → [`OrganizationConfig`]
pub fn organization_config_from_row(row: &Row) -> Result<OrganizationConfig> {
    let delimiter: String = column(row, "csv_delimiter")?;
    Ok(OrganizationConfig {
        timezone: column(row, "timezone")?,
        csv_delimiter: parse_delimiter(&delimiter),
        webhook_url: column(row, "webhook_url")?,
        notify_email: column(row, "notify_email")?,
    })
}

/// Single ASCII character, `,` otherwise
fn parse_delimiter(raw: &str) -> u8 {
    match raw.as_bytes() {
        [b] if b.is_ascii() && *b != b'\n' && *b != b'"' => *b,
        _ => b',',
    }
}

/// `campaigns` row → [`Campaign`]
pub fn campaign_from_row(row: &Row) -> Result<Campaign> {
    let platform: String = column(row, "platform")?;
    let platform: Platform = platform.parse().map_err(CampexError::Database)?;
    Ok(Campaign {
        id: CampaignId::from(column::<i64>(row, "id")?),
        organization_id: OrganizationId::from(column::<i64>(row, "organization_id")?),
        name: column(row, "name")?,
        platform,
        status: column(row, "status")?,
        started_at: column::<Option<DateTime<Utc>>>(row, "started_at")?,
        ended_at: column::<Option<DateTime<Utc>>>(row, "ended_at")?,
        recipient_count: column(row, "recipient_count")?,
    })
}

/// `campaign_daily_stats` row → [`PerformanceRow`]
pub fn performance_from_row(row: &Row) -> Result<PerformanceRow> {
    Ok(PerformanceRow {
        date: column::<NaiveDate>(row, "day")?,
        impressions: column(row, "impressions")?,
        clicks: column(row, "clicks")?,
        conversions: column(row, "conversions")?,
        spend_cents: column(row, "spend_cents")?,
        currency: column(row, "currency")?,
    })
}

/// `campaign_events` row → [`EventRow`]
pub fn event_from_row(row: &Row) -> Result<EventRow> {
    Ok(EventRow {
        occurred_at: column(row, "occurred_at")?,
        recipient: column(row, "recipient")?,
        event_type: column(row, "event_type")?,
        detail: column(row, "detail")?,
    })
}

/// `export_processes` row → [`ExportProcess`]
pub fn process_from_row(row: &Row) -> Result<ExportProcess> {
    let row_count: i64 = column(row, "row_count")?;
    Ok(ExportProcess {
        id: ProcessId::from(column::<i64>(row, "id")?),
        organization_id: OrganizationId::from(column::<i64>(row, "organization_id")?),
        campaign_id: CampaignId::from(column::<i64>(row, "campaign_id")?),
        file_url: column(row, "file_url")?,
        request_key: column(row, "request_key")?,
        checksum: column(row, "checksum")?,
        row_count: u64::try_from(row_count).unwrap_or(0),
        created_at: column(row, "created_at")?,
    })
}
