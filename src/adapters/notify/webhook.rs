//! Webhook notifier
//!
//! POSTs a JSON document describing the finished export. The target is, in
//! order: the request's `webhookUrl`, the organization's configured webhook,
//! the global `notification.default_webhook_url`. When none is set the export
//! is still considered delivered and only a log line is written.

use crate::adapters::traits::{ExportNotification, NotificationGateway};
use crate::config::{bearer, NotificationConfig, SecretString};
use crate::domain::{CampexError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde_json::json;
use std::time::Duration;

/// Event name carried in every payload
pub const EXPORT_COMPLETED_EVENT: &str = "campaign_export.completed";

pub struct WebhookNotifier {
    http: reqwest::Client,
    default_url: Option<String>,
    auth_token: Option<SecretString>,
}

impl WebhookNotifier {
    /// Builds a notifier with its own HTTP client
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CampexError::Notification(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            default_url: config.default_webhook_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn target<'a>(&'a self, notification: &'a ExportNotification<'_>) -> Option<&'a str> {
        let non_blank = |s: &&str| !s.trim().is_empty();
        notification
            .request
            .webhook_url
            .as_deref()
            .filter(non_blank)
            .or_else(|| notification.config.webhook_url.as_deref().filter(non_blank))
            .or_else(|| self.default_url.as_deref().filter(non_blank))
    }
}

fn payload(notification: &ExportNotification<'_>) -> serde_json::Value {
    let process = notification.process;
    json!({
        "event": EXPORT_COMPLETED_EVENT,
        "organizationId": notification.request.organization_id,
        "campaignId": notification.request.campaign_id,
        "exportType": notification.request.export_kind,
        "processId": process.id,
        "fileUrl": notification.file_url(),
        "checksum": process.checksum,
        "rowCount": process.row_count,
        "requestedBy": notification.request.requested_by,
        "runId": notification.run_id.to_string(),
        "completedAt": Utc::now(),
    })
}

#[async_trait]
impl NotificationGateway for WebhookNotifier {
    async fn notify(&self, notification: ExportNotification<'_>) -> Result<()> {
        let Some(url) = self.target(&notification) else {
            tracing::info!(
                process_id = %notification.process.id,
                file_url = %notification.file_url(),
                "No webhook configured, skipping notification"
            );
            return Ok(());
        };

        let mut request = self.http.post(url).json(&payload(&notification));
        if let Some(ref token) = self.auth_token {
            request = request.header(AUTHORIZATION, bearer(token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| CampexError::Notification(format!("Webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(CampexError::Notification(format!(
                "Webhook returned {status}: {body}"
            )));
        }

        tracing::info!(
            process_id = %notification.process.id,
            status = status.as_u16(),
            "Webhook notified"
        );
        Ok(())
    }
}
