//! Organization directory backed by PostgreSQL
//!
//! Organizations are listed in the shared `organizations` table; each one
//! names the schema holding its campaign tables.

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    campaign_from_row, column, event_from_row, organization_config_from_row,
    performance_from_row,
};
use crate::adapters::traits::{CampaignStore, ConfigStore, ContextResolver, ReportSource};
use crate::domain::context::ResultExt;
use crate::domain::{
    Campaign, CampaignId, CampexError, EventRow, OrganizationConfig, OrganizationContext,
    OrganizationId, PerformanceRow, Result,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Checks that a schema name is safe to splice into SQL as an identifier
///
/// Lowercase ASCII letters, digits and underscores, not starting with a
/// digit, at most 63 bytes.
pub fn validate_schema_name(schema: &str) -> Result<()> {
    let valid = !schema.is_empty()
        && schema.len() <= 63
        && !schema.starts_with(|c: char| c.is_ascii_digit())
        && schema
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CampexError::Database(format!(
            "Organization schema '{schema}' is not a valid identifier"
        )))
    }
}

/// Context resolver, config store, campaign store and report source over one pool
pub struct PostgresDirectory {
    client: Arc<PostgreSQLClient>,
}

impl PostgresDirectory {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    fn table(context: &OrganizationContext, table: &str) -> Result<String> {
        validate_schema_name(&context.schema)?;
        Ok(format!("\"{}\".{}", context.schema, table))
    }
}

#[async_trait]
impl ContextResolver for PostgresDirectory {
    async fn resolve(&self, organization_id: OrganizationId) -> Result<OrganizationContext> {
        let row = self
            .client
            .query_opt(
                "SELECT schema_name FROM organizations WHERE id = $1",
                &[&organization_id.get()],
            )
            .await?
            .ok_or_else(|| CampexError::NotFound(format!("organization {organization_id}")))?;

        let schema: String = column(&row, "schema_name")?;
        validate_schema_name(&schema)?;
        Ok(OrganizationContext {
            organization_id,
            schema,
        })
    }
}

#[async_trait]
impl ConfigStore for PostgresDirectory {
    async fn load_config(&self, context: &OrganizationContext) -> Result<OrganizationConfig> {
        let row = self
            .client
            .query_opt(
                "SELECT timezone, csv_delimiter, webhook_url, notify_email \
                 FROM organizations WHERE id = $1",
                &[&context.organization_id.get()],
            )
            .await?
            .ok_or_else(|| {
                CampexError::NotFound(format!(
                    "export config for organization {}",
                    context.organization_id
                ))
            })?;
        organization_config_from_row(&row)
            .with_context(|| format!("export config for organization {}", context.organization_id))
    }
}

#[async_trait]
impl CampaignStore for PostgresDirectory {
    async fn load_campaign(
        &self,
        context: &OrganizationContext,
        campaign_id: CampaignId,
    ) -> Result<Campaign> {
        let sql = format!(
            "SELECT id, organization_id, name, platform, status, started_at, ended_at, \
             recipient_count FROM {} WHERE id = $1",
            Self::table(context, "campaigns")?
        );
        let row = self
            .client
            .query_opt(&sql, &[&campaign_id.get()])
            .await?
            .ok_or_else(|| {
                CampexError::NotFound(format!(
                    "campaign {campaign_id} of organization {}",
                    context.organization_id
                ))
            })?;
        campaign_from_row(&row).with_context(|| format!("campaign {campaign_id}"))
    }
}

#[async_trait]
impl ReportSource for PostgresDirectory {
    async fn performance(
        &self,
        context: &OrganizationContext,
        campaign: &Campaign,
    ) -> Result<Vec<PerformanceRow>> {
        let sql = format!(
            "SELECT day, impressions, clicks, conversions, spend_cents, currency \
             FROM {} WHERE campaign_id = $1 ORDER BY day",
            Self::table(context, "campaign_daily_stats")?
        );
        self.client
            .query(&sql, &[&campaign.id.get()])
            .await
            .context(format!("performance of campaign {}", campaign.id))?
            .iter()
            .map(performance_from_row)
            .collect()
    }

    async fn events(
        &self,
        context: &OrganizationContext,
        campaign: &Campaign,
    ) -> Result<Vec<EventRow>> {
        let sql = format!(
            "SELECT occurred_at, recipient, event_type, detail \
             FROM {} WHERE campaign_id = $1 ORDER BY occurred_at, id",
            Self::table(context, "campaign_events")?
        );
        self.client
            .query(&sql, &[&campaign.id.get()])
            .await
            .context(format!("events of campaign {}", campaign.id))?
            .iter()
            .map(event_from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("public" ; "default schema")]
    #[test_case("org_42" ; "tenant schema")]
    #[test_case("_staging" ; "leading underscore")]
    fn test_valid_schema_names(schema: &str) {
        assert!(validate_schema_name(schema).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("42org" ; "leading digit")]
    #[test_case("org\"; DROP TABLE campaigns; --" ; "injection")]
    #[test_case("Org42" ; "uppercase")]
    fn test_invalid_schema_names(schema: &str) {
        assert!(matches!(
            validate_schema_name(schema),
            Err(CampexError::Database(_))
        ));
    }

    #[test]
    fn test_table_is_quoted() {
        let context = OrganizationContext {
            organization_id: OrganizationId::from(42),
            schema: "org_42".to_string(),
        };
        assert_eq!(
            PostgresDirectory::table(&context, "campaigns").unwrap(),
            "\"org_42\".campaigns"
        );
    }
}
