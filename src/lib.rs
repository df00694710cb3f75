// Campex - Campaign Export Event Pipeline
// Copyright (c) 2025 Campex Contributors
// Licensed under the MIT License

//! # Campex - Campaign Export Event Pipeline
//!
//! Campex consumes "export requested" events for advertising campaigns,
//! writes a CSV artifact per request, uploads it to object storage, records
//! an export process, notifies a downstream party and cleans up.
//!
//! ## Overview
//!
//! - **Consuming** requests from a topic broker with a bounded worker pool
//! - **Validating** that the campaign is reportable (ended, has recipients)
//! - **Generating** CSV reports from platform-specific data sources
//! - **Uploading** to GCS, an S3-compatible endpoint or a local directory
//! - **Classifying** failures as discard, retry with backoff, or dead letter
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Codec, validation, orchestration, retry and the consumer runtime
//! - [`adapters`] - PostgreSQL, brokers, storage, webhook and report generation
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and the export audit trail
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use campex::adapters::factory::build_pipeline;
//! use campex::config::load_config;
//! use campex::core::consumer::{ConsumerRuntime, ConsumerSettings};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("campex.toml")?;
//!     let pipeline = build_pipeline(&config).await?;
//!
//!     let runtime = ConsumerRuntime::new(
//!         pipeline.broker.clone(),
//!         pipeline.orchestrator(&config),
//!         ConsumerSettings::from(&config),
//!     );
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let stats = runtime.run(shutdown_rx).await?;
//!     println!("Completed {} exports", stats.completed);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Collaborators return [`domain::CampexError`]. The orchestrator wraps a
//! failure with the step that produced it in a [`domain::ExportError`], and
//! [`core::retry::RetryPolicy`] turns that into a routing decision.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
