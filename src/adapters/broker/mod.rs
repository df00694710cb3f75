//! Message broker abstraction
//!
//! Topics carry raw payload bytes plus string headers. A received message
//! stays invisible to other receivers for the visibility timeout; if it is
//! not acknowledged in time it becomes deliverable again. Messages published
//! with `not_before` are not delivered before that instant.
//!
//! - [`memory::InMemoryBroker`] - process-local topics for tests and development
//! - [`crate::adapters::postgresql::PostgresBroker`] - `topic_messages` table

pub mod memory;

use crate::domain::{MessageHeaders, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub use memory::InMemoryBroker;

/// A message to publish
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundMessage {
    /// Partition key, informational for the shipped brokers
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: MessageHeaders,
    /// Earliest delivery time
    pub not_before: Option<DateTime<Utc>>,
}

impl OutboundMessage {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: MessageHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }
}

/// A received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned id, used to acknowledge
    pub id: i64,
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: MessageHeaders,
    pub enqueued_at: DateTime<Utc>,
    /// Times this message has been handed out, this delivery included
    pub receive_count: u32,
}

/// Topic broker used by the consumer runtime and the CLI
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Appends a message to `topic` and returns its id
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<i64>;

    /// Claims up to `max` deliverable messages from any of `topics`
    async fn receive(
        &self,
        topics: &[String],
        max: usize,
        visibility: Duration,
    ) -> Result<Vec<Delivery>>;

    /// Removes a delivered message for good
    async fn ack(&self, delivery: &Delivery) -> Result<()>;

    /// Messages currently stored in `topic`, delayed and in-flight included
    async fn depth(&self, topic: &str) -> Result<u64>;

    /// Oldest messages of `topic`, without claiming them
    async fn peek(&self, topic: &str, limit: usize) -> Result<Vec<Delivery>>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
