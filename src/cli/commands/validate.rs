//! Validate config command implementation

use crate::config::{load_config, StorageBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        // load_config also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Consumer Group: {}", config.consumer.group);
        println!("  Workers: {}", config.consumer.workers);
        println!(
            "  Topics: {} / {} / {}",
            config.topics.input, config.topics.retry, config.topics.dead_letter
        );
        println!(
            "  Retry: {} attempt(s), base delay {}s",
            config.retry.max_attempts, config.retry.base_delay_secs
        );
        println!("  Broker: {:?}", config.broker.backend);
        println!("  Dedupe: {:?}", config.artifacts.dedupe);
        match config.storage.backend {
            StorageBackend::Gcs => {
                if let Some(ref gcs) = config.storage.gcs {
                    println!("  Storage: GCS bucket {}", gcs.bucket);
                }
            }
            StorageBackend::S3 => {
                if let Some(ref s3) = config.storage.s3 {
                    println!("  Storage: S3 {} / {}", s3.endpoint, s3.bucket);
                }
            }
            StorageBackend::Local => {
                if let Some(ref local) = config.storage.local {
                    println!("  Storage: local {}", local.root_dir);
                }
            }
        }
        println!("  Upload Path: {}", config.storage.upload_path);
        println!(
            "  Default Webhook: {}",
            config
                .notification
                .default_webhook_url
                .as_deref()
                .unwrap_or("(none)")
        );
        println!();
        Ok(0)
    }
}
