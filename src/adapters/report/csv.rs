//! CSV artifact generator
//!
//! `campaign` exports hold one row per day of performance; `events` exports
//! one row per recipient event with timestamps in the organization's
//! timezone. Only fixed offsets (`UTC`, `+02:00`, `-0530`) are understood;
//! anything else falls back to UTC.

use crate::adapters::report::ReportSourceRegistry;
use crate::adapters::traits::{ArtifactGenerator, ArtifactJob, GeneratedArtifact};
use crate::domain::context::ResultExt;
use crate::domain::{CampexError, EventRow, ExportKind, PerformanceRow, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, Offset, SecondsFormat, Utc};

const CAMPAIGN_HEADER: [&str; 11] = [
    "organization_id",
    "campaign_id",
    "campaign_name",
    "platform",
    "date",
    "impressions",
    "clicks",
    "conversions",
    "ctr",
    "spend",
    "currency",
];

const EVENTS_HEADER: [&str; 5] = [
    "campaign_id",
    "occurred_at",
    "recipient",
    "event_type",
    "detail",
];

pub struct CsvArtifactGenerator {
    registry: ReportSourceRegistry,
    include_header: bool,
}

impl CsvArtifactGenerator {
    pub fn new(registry: ReportSourceRegistry, include_header: bool) -> Self {
        Self {
            registry,
            include_header,
        }
    }

    fn writer(&self, delimiter: u8) -> ::csv::Writer<Vec<u8>> {
        ::csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(Vec::new())
    }

    fn write_performance(
        &self,
        job: &ArtifactJob<'_>,
        rows: &[PerformanceRow],
    ) -> Result<Vec<u8>> {
        let mut writer = self.writer(job.config.csv_delimiter);
        if self.include_header {
            writer.write_record(CAMPAIGN_HEADER)?;
        }
        let organization_id = job.request.organization_id.to_string();
        let campaign_id = job.campaign.id.to_string();
        for row in rows {
            writer.write_record([
                organization_id.clone(),
                campaign_id.clone(),
                job.campaign.name.clone(),
                job.campaign.platform.to_string(),
                row.date.format("%Y-%m-%d").to_string(),
                row.impressions.to_string(),
                row.clicks.to_string(),
                row.conversions.to_string(),
                click_through_rate(row.clicks, row.impressions),
                format_minor_units(row.spend_cents),
                row.currency.clone(),
            ])?;
        }
        finish(writer)
    }

    fn write_events(&self, job: &ArtifactJob<'_>, rows: &[EventRow]) -> Result<Vec<u8>> {
        let offset = parse_offset(&job.config.timezone).unwrap_or_else(|| {
            tracing::warn!(
                timezone = %job.config.timezone,
                "Unsupported organization timezone, writing UTC timestamps"
            );
            Utc.fix()
        });

        let mut writer = self.writer(job.config.csv_delimiter);
        if self.include_header {
            writer.write_record(EVENTS_HEADER)?;
        }
        let campaign_id = job.campaign.id.to_string();
        for row in rows {
            writer.write_record([
                campaign_id.clone(),
                row.occurred_at
                    .with_timezone(&offset)
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                row.recipient.clone(),
                row.event_type.clone(),
                row.detail.clone().unwrap_or_default(),
            ])?;
        }
        finish(writer)
    }
}

fn finish(writer: ::csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| CampexError::Generation(format!("Failed to flush CSV: {e}")))
}

#[async_trait]
impl ArtifactGenerator for CsvArtifactGenerator {
    async fn generate(&self, job: ArtifactJob<'_>) -> Result<GeneratedArtifact> {
        let source = self.registry.get(job.campaign.platform)?;

        let (bytes, row_count) = match job.request.export_kind {
            ExportKind::Campaign => {
                let rows = source
                    .performance(job.context, job.campaign)
                    .await
                    .with_context(|| format!("performance rows of campaign {}", job.campaign.id))?;
                (self.write_performance(&job, &rows)?, rows.len())
            }
            ExportKind::Events => {
                let rows = source
                    .events(job.context, job.campaign)
                    .await
                    .with_context(|| format!("events of campaign {}", job.campaign.id))?;
                (self.write_events(&job, &rows)?, rows.len())
            }
        };

        tokio::fs::write(job.path, &bytes).await.map_err(|e| {
            CampexError::Generation(format!("Failed to write {}: {e}", job.path.display()))
        })?;

        Ok(GeneratedArtifact {
            path: job.path.to_path_buf(),
            row_count: row_count as u64,
        })
    }
}

/// Parses `UTC`, `Z`, `+HH:MM`, `-HHMM` or `+HH`
pub fn parse_offset(timezone: &str) -> Option<FixedOffset> {
    let tz = timezone.trim();
    if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") || tz == "Etc/UTC" {
        return Some(Utc.fix());
    }

    let (sign, rest) = match tz.as_bytes().first()? {
        b'+' => (1, &tz[1..]),
        b'-' => (-1, &tz[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// `clicks / impressions` with four decimals; zero impressions give `0.0000`
fn click_through_rate(clicks: i64, impressions: i64) -> String {
    if impressions <= 0 {
        return "0.0000".to_string();
    }
    format!("{:.4}", clicks as f64 / impressions as f64)
}

/// Formats minor currency units as `units.cc`
fn format_minor_units(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
