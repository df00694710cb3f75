//! Status command implementation
//!
//! Shows topic depths, the newest dead letters and recent export processes.

use crate::adapters::factory::{build_broker, connect};
use crate::adapters::postgresql::PostgresLedger;
use crate::config::{load_config, BrokerBackend};
use crate::core::consumer::runtime::{ERROR_HEADER, FAILED_STEP_HEADER};
use crate::domain::RetryMetadata;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of dead letters and export processes to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking pipeline status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let client = match connect(&config).await {
            Ok(c) => c,
            Err(e) => {
                println!("Failed to connect to database");
                println!("   Error: {e}");
                return Ok(4);
            }
        };
        if let Err(e) = client.ensure_schema().await {
            println!("Failed to prepare schema: {e}");
            return Ok(5);
        }

        if config.broker.backend == BrokerBackend::Memory {
            println!("Broker: memory (topics live inside the consumer process only)");
        } else {
            let broker = build_broker(&config, client.clone());
            println!("Topics:");
            for topic in [
                &config.topics.input,
                &config.topics.retry,
                &config.topics.dead_letter,
            ] {
                let depth = broker.depth(topic).await?;
                println!("  {topic}: {depth} message(s)");
            }

            let dead = broker.peek(&config.topics.dead_letter, self.limit).await?;
            if !dead.is_empty() {
                println!();
                println!("Dead letters (oldest first):");
                for delivery in dead {
                    let header = |name: &str| {
                        delivery.headers.get(name).cloned().unwrap_or_else(|| "-".to_string())
                    };
                    println!(
                        "  #{} key={} attempts={} step={} error={}",
                        delivery.id,
                        delivery.key.as_deref().unwrap_or("-"),
                        header(RetryMetadata::HEADER),
                        header(FAILED_STEP_HEADER),
                        header(ERROR_HEADER),
                    );
                }
            }
        }

        let limit = i64::try_from(self.limit).unwrap_or(i64::MAX);
        let processes = PostgresLedger::new(client).recent(limit).await?;
        println!();
        if processes.is_empty() {
            println!("No export processes recorded yet.");
            println!("Run 'campex publish' and 'campex consume' to export a campaign.");
        } else {
            println!("Recent export processes:");
            for p in processes {
                println!(
                    "  #{} org={} campaign={} rows={} at={} {}",
                    p.id,
                    p.organization_id,
                    p.campaign_id,
                    p.row_count,
                    p.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    p.file_url
                );
            }
        }
        Ok(0)
    }
}
