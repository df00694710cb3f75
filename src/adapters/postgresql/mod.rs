//! PostgreSQL adapters
//!
//! One pooled [`PostgreSQLClient`] backs three collaborators:
//!
//! - [`PostgresDirectory`] - organization contexts, export configs, campaigns and report rows
//! - [`PostgresLedger`] - the `export_processes` audit table
//! - [`PostgresBroker`] - topics stored in `topic_messages`

pub mod client;
pub mod directory;
pub mod ledger;
pub mod models;
pub mod queue;

pub use client::PostgreSQLClient;
pub use directory::PostgresDirectory;
pub use ledger::PostgresLedger;
pub use queue::PostgresBroker;
