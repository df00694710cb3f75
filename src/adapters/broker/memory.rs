//! In-memory message broker
//!
//! Topics live in a process-local map guarded by one `RwLock`. Visibility and
//! `not_before` are both expressed as a `visible_at` instant per message.

use crate::adapters::broker::{Delivery, MessageBroker, OutboundMessage};
use crate::domain::{CampexError, MessageHeaders, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: i64,
    key: Option<String>,
    payload: Vec<u8>,
    headers: MessageHeaders,
    enqueued_at: DateTime<Utc>,
    visible_at: DateTime<Utc>,
    receive_count: u32,
}

impl StoredMessage {
    fn to_delivery(&self, topic: &str) -> Delivery {
        Delivery {
            id: self.id,
            topic: topic.to_string(),
            key: self.key.clone(),
            payload: self.payload.clone(),
            headers: self.headers.clone(),
            enqueued_at: self.enqueued_at,
            receive_count: self.receive_count,
        }
    }
}

#[derive(Debug, Default)]
struct Topics {
    next_id: i64,
    topics: HashMap<String, VecDeque<StoredMessage>>,
}

/// Process-local broker
///
/// # Example
///
/// ```rust
/// use campex::adapters::broker::{InMemoryBroker, MessageBroker, OutboundMessage};
/// use std::time::Duration;
///
/// # async fn example() -> campex::domain::Result<()> {
/// let broker = InMemoryBroker::new();
/// broker.publish("campaign-export-requested", OutboundMessage::new(b"{}".to_vec())).await?;
///
/// let topics = vec!["campaign-export-requested".to_string()];
/// let deliveries = broker.receive(&topics, 1, Duration::from_secs(30)).await?;
/// broker.ack(&deliveries[0]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    inner: RwLock<Topics>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message of `topic`, oldest first, including invisible ones
    pub async fn messages(&self, topic: &str) -> Vec<Delivery> {
        let inner = self.inner.read().await;
        inner
            .topics
            .get(topic)
            .map(|q| q.iter().map(|m| m.to_delivery(topic)).collect())
            .unwrap_or_default()
    }

    /// When a stored message becomes deliverable
    pub async fn visible_at(&self, topic: &str, id: i64) -> Option<DateTime<Utc>> {
        let inner = self.inner.read().await;
        inner
            .topics
            .get(topic)
            .and_then(|q| q.iter().find(|m| m.id == id))
            .map(|m| m.visible_at)
    }

    async fn receive_at(
        &self,
        topics: &[String],
        max: usize,
        visibility: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Delivery>> {
        let visibility = chrono::Duration::from_std(visibility)
            .map_err(|e| CampexError::Messaging(format!("Invalid visibility timeout: {e}")))?;
        let visible_until = now + visibility;

        let mut inner = self.inner.write().await;
        let mut received = Vec::new();

        for topic in topics {
            let Some(queue) = inner.topics.get_mut(topic) else {
                continue;
            };
            for msg in queue.iter_mut() {
                if received.len() >= max {
                    return Ok(received);
                }
                if msg.visible_at <= now {
                    msg.visible_at = visible_until;
                    msg.receive_count += 1;
                    received.push(msg.to_delivery(topic));
                }
            }
        }

        Ok(received)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();

        inner
            .topics
            .entry(topic.to_string())
            .or_default()
            .push_back(StoredMessage {
                id,
                key: message.key,
                payload: message.payload,
                headers: message.headers,
                enqueued_at: now,
                visible_at: message.not_before.unwrap_or(now),
                receive_count: 0,
            });

        Ok(id)
    }

    async fn receive(
        &self,
        topics: &[String],
        max: usize,
        visibility: Duration,
    ) -> Result<Vec<Delivery>> {
        self.receive_at(topics, max, visibility, Utc::now()).await
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let mut inner = self.inner.write().await;
        let queue = inner.topics.get_mut(&delivery.topic).ok_or_else(|| {
            CampexError::Messaging(format!("Topic not found: {}", delivery.topic))
        })?;

        match queue.iter().position(|m| m.id == delivery.id) {
            Some(pos) => {
                queue.remove(pos);
                Ok(())
            }
            None => Err(CampexError::Messaging(format!(
                "Message {} not found in {}",
                delivery.id, delivery.topic
            ))),
        }
    }

    async fn depth(&self, topic: &str) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.topics.get(topic).map(|q| q.len() as u64).unwrap_or(0))
    }

    async fn peek(&self, topic: &str, limit: usize) -> Result<Vec<Delivery>> {
        let mut messages = self.messages(topic).await;
        messages.truncate(limit);
        Ok(messages)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
