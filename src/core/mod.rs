//! Core business logic for Campex.
//!
//! # Modules
//!
//! - [`codec`] - wire format of export requests
//! - [`validator`] - campaign reportability rules
//! - [`export`] - the per-request orchestrator and its audit trail
//! - [`retry`] - failure classification and backoff
//! - [`consumer`] - the worker pool that drives the orchestrator from the broker
//! - [`checksum`] - SHA-256 helpers for request keys and artifacts
//!
//! # Workflow
//!
//! 1. **Receive**: a worker claims a delivery from the input or retry topic
//! 2. **Decode**: the payload becomes an [`ExportRequest`](crate::domain::ExportRequest)
//! 3. **Run**: the orchestrator resolves, validates, generates, uploads, records and notifies
//! 4. **Classify**: a failure is discarded, scheduled for retry, or dead-lettered
//! 5. **Acknowledge**: the delivery is removed once its outcome is durable

pub mod checksum;
pub mod codec;
pub mod consumer;
pub mod export;
pub mod retry;
pub mod validator;
