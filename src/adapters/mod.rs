//! External system integrations for Campex.
//!
//! - [`traits`] - the collaborator seams of the export orchestrator
//! - [`postgresql`] - organization directory, process ledger and topic broker
//! - [`broker`] - broker abstraction and the in-memory broker
//! - [`storage`] - GCS, S3-compatible and local upload gateways
//! - [`notify`] - webhook notification gateway
//! - [`report`] - platform report sources and the CSV artifact generator
//! - [`factory`] - builds all of the above from configuration
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern**: the orchestrator only sees the
//! traits in [`traits`], so tests swap any collaborator for a fake.

pub mod broker;
pub mod factory;
pub mod notify;
pub mod postgresql;
pub mod report;
pub mod storage;
pub mod traits;
