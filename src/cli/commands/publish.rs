//! Publish command implementation
//!
//! Enqueues one export request on the input topic.

use crate::adapters::broker::OutboundMessage;
use crate::adapters::factory::{build_broker, connect};
use crate::config::{load_config, BrokerBackend};
use crate::core::codec::encode;
use crate::domain::{
    CampaignId, ExportKind, ExportRequest, MessageHeaders, OrganizationId, RetryMetadata,
};
use clap::Args;

/// Arguments for the publish command
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Organization that owns the campaign
    #[arg(long)]
    pub organization_id: i64,

    /// Campaign to export
    #[arg(long)]
    pub campaign_id: i64,

    /// Report to produce (campaign or events)
    #[arg(long, default_value = "campaign")]
    pub export_type: String,

    /// Webhook overriding the organization's notification target
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Requester identity passed to the notification
    #[arg(long)]
    pub requested_by: Option<String>,
}

impl PublishArgs {
    /// Builds the request from the arguments
    pub fn request(&self) -> Result<ExportRequest, String> {
        let organization_id = OrganizationId::new(self.organization_id)?;
        let campaign_id = CampaignId::new(self.campaign_id)?;
        let kind: ExportKind = self.export_type.parse()?;

        let mut request = ExportRequest::new(organization_id, campaign_id)
            .with_kind(kind)
            .with_requested_at(chrono::Utc::now());
        if let Some(ref url) = self.webhook_url {
            request = request.with_webhook_url(url.clone());
        }
        if let Some(ref who) = self.requested_by {
            request = request.with_requested_by(who.clone());
        }
        Ok(request)
    }

    /// Execute the publish command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let request = match self.request() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Invalid export request: {e}");
                return Ok(2);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };
        if config.broker.backend == BrokerBackend::Memory {
            eprintln!("broker.backend = 'memory' cannot be published to from another process");
            return Ok(2);
        }

        let client = match connect(&config).await {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to connect to PostgreSQL: {e}");
                return Ok(4);
            }
        };
        client.ensure_schema().await?;
        let broker = build_broker(&config, client);

        let mut headers = MessageHeaders::new();
        RetryMetadata::default().stamped().write_to(&mut headers);
        let message = OutboundMessage::new(encode(&request)?)
            .with_key(request.partition_key())
            .with_headers(headers);
        let id = broker.publish(&config.topics.input, message).await?;

        tracing::info!(
            message_id = id,
            organization_id = %request.organization_id,
            campaign_id = %request.campaign_id,
            "Export request published"
        );
        println!(
            "Published export request {} to {} (message {id})",
            request.partition_key(),
            config.topics.input
        );
        Ok(0)
    }
}
