//! Consume command implementation
//!
//! Runs the consumer runtime until SIGINT/SIGTERM.

use crate::adapters::factory::build_pipeline;
use crate::config::load_config;
use crate::core::consumer::{ConsumerRuntime, ConsumerSettings};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the consume command
#[derive(Args, Debug)]
pub struct ConsumeArgs {
    /// Override the number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl ConsumeArgs {
    /// Execute the consume command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(workers) = self.workers {
            tracing::info!(workers, "Overriding worker count from CLI");
            config.consumer.workers = workers;
            if let Err(e) = config.validate() {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2);
            }
        }

        let pipeline = match build_pipeline(&config).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to assemble pipeline");
                eprintln!("Failed to initialize consumer: {e}");
                return Ok(4);
            }
        };

        let runtime = ConsumerRuntime::new(
            pipeline.broker.clone(),
            pipeline.orchestrator(&config),
            ConsumerSettings::from(&config),
        );

        println!(
            "Consuming {} as group '{}' with {} worker(s)",
            runtime.settings().consumed_topics().join(", "),
            config.consumer.group,
            config.consumer.workers
        );

        let stats = match runtime.run(shutdown_signal).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Consumer failed");
                eprintln!("Consumer failed: {e}");
                return Ok(5);
            }
        };

        println!();
        println!("Consumer Summary:");
        println!("  Received: {}", stats.received);
        println!("  Completed: {}", stats.completed);
        println!("  Discarded: {}", stats.discarded);
        println!("  Retried: {}", stats.retried);
        println!("  Dead-lettered: {}", stats.dead_lettered);
        println!("  Routing failures: {}", stats.routing_failures);
        Ok(0)
    }
}
