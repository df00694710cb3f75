//! Report rows fetched from platform data sources

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One day of campaign performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    /// Spend in minor currency units
    pub spend_cents: i64,
    pub currency: String,
}

/// One recipient-level event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub occurred_at: DateTime<Utc>,
    pub recipient: String,
    pub event_type: String,
    pub detail: Option<String>,
}
