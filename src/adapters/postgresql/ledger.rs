//! Export process ledger backed by PostgreSQL

use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::process_from_row;
use crate::adapters::traits::ProcessLedger;
use crate::domain::{CampexError, ExportProcess, NewExportProcess, OrganizationId, Result};
use async_trait::async_trait;
use std::sync::Arc;

const PROCESS_COLUMNS: &str =
    "id, organization_id, campaign_id, file_url, request_key, checksum, row_count, created_at";

/// Ledger over the `export_processes` table
pub struct PostgresLedger {
    client: Arc<PostgreSQLClient>,
}

impl PostgresLedger {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    /// Most recent processes, newest first
    pub async fn recent(&self, limit: i64) -> Result<Vec<ExportProcess>> {
        let sql = format!(
            "SELECT {PROCESS_COLUMNS} FROM export_processes ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        self.client
            .query(&sql, &[&limit])
            .await?
            .iter()
            .map(process_from_row)
            .collect()
    }
}

#[async_trait]
impl ProcessLedger for PostgresLedger {
    async fn record(&self, process: NewExportProcess) -> Result<ExportProcess> {
        let row_count = i64::try_from(process.row_count).map_err(|_| {
            CampexError::Database(format!("row count {} out of range", process.row_count))
        })?;
        let sql = format!(
            "INSERT INTO export_processes \
             (organization_id, campaign_id, file_url, request_key, checksum, row_count) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROCESS_COLUMNS}"
        );
        let rows = self
            .client
            .query(
                &sql,
                &[
                    &process.organization_id.get(),
                    &process.campaign_id.get(),
                    &process.file_url,
                    &process.request_key,
                    &process.checksum,
                    &row_count,
                ],
            )
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| CampexError::Database("INSERT returned no row".to_string()))?;
        let recorded = process_from_row(row)?;

        tracing::info!(
            process_id = %recorded.id,
            campaign_id = %recorded.campaign_id,
            "Export process recorded"
        );
        Ok(recorded)
    }

    async fn find_by_request_key(
        &self,
        organization_id: OrganizationId,
        request_key: &str,
    ) -> Result<Option<ExportProcess>> {
        let sql = format!(
            "SELECT {PROCESS_COLUMNS} FROM export_processes \
             WHERE organization_id = $1 AND request_key = $2 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        self.client
            .query_opt(&sql, &[&organization_id.get(), &request_key])
            .await?
            .as_ref()
            .map(process_from_row)
            .transpose()
    }
}
