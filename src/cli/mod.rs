//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// Campex - Campaign Export Event Pipeline
#[derive(Parser, Debug)]
#[command(name = "campex")]
#[command(version, about, long_about = None)]
#[command(author = "Campex Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "campex.toml", env = "CAMPEX_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CAMPEX_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume export requests until interrupted
    Consume(commands::consume::ConsumeArgs),

    /// Publish one export request to the input topic
    Publish(commands::publish::PublishArgs),

    /// Show topic depths, dead letters and recent exports
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
