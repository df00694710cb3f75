//! Topic broker over the `topic_messages` table
//!
//! Receivers claim rows with `FOR UPDATE SKIP LOCKED` and push their
//! `visible_at` forward by the visibility timeout, so concurrent workers
//! (in one process or many) never hand out the same message twice within
//! that window. Acknowledging deletes the row.

use crate::adapters::broker::{Delivery, MessageBroker, OutboundMessage};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::column;
use crate::domain::{CampexError, MessageHeaders, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Row;

const DELIVERY_COLUMNS: &str =
    "id, topic, message_key, payload, headers, enqueued_at, receive_count";

/// PostgreSQL-backed broker
pub struct PostgresBroker {
    client: Arc<PostgreSQLClient>,
}

impl PostgresBroker {
    pub fn new(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }
}

fn delivery_from_row(row: &Row) -> Result<Delivery> {
    let headers: serde_json::Value = column(row, "headers")?;
    let headers: MessageHeaders = serde_json::from_value(headers)
        .map_err(|e| CampexError::Messaging(format!("Invalid message headers: {e}")))?;
    let receive_count: i32 = column(row, "receive_count")?;

    Ok(Delivery {
        id: column(row, "id")?,
        topic: column(row, "topic")?,
        key: column(row, "message_key")?,
        payload: column(row, "payload")?,
        headers,
        enqueued_at: column::<DateTime<Utc>>(row, "enqueued_at")?,
        receive_count: u32::try_from(receive_count).unwrap_or(0),
    })
}

#[async_trait]
impl MessageBroker for PostgresBroker {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<i64> {
        let headers = serde_json::to_value(&message.headers)?;
        let row = self
            .client
            .query_opt(
                "INSERT INTO topic_messages (topic, message_key, payload, headers, visible_at) \
                 VALUES ($1, $2, $3, $4, COALESCE($5, now())) RETURNING id",
                &[
                    &topic,
                    &message.key,
                    &message.payload,
                    &headers,
                    &message.not_before,
                ],
            )
            .await?
            .ok_or_else(|| CampexError::Messaging("INSERT returned no row".to_string()))?;
        column(&row, "id")
    }

    async fn receive(
        &self,
        topics: &[String],
        max: usize,
        visibility: Duration,
    ) -> Result<Vec<Delivery>> {
        let limit = i64::try_from(max).unwrap_or(i64::MAX);
        let visibility_secs = visibility.as_secs_f64();
        let sql = format!(
            "UPDATE topic_messages \
             SET visible_at = now() + make_interval(secs => $3), \
                 receive_count = receive_count + 1 \
             WHERE id IN ( \
                 SELECT id FROM topic_messages \
                 WHERE topic = ANY($1) AND visible_at <= now() \
                 ORDER BY id LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {DELIVERY_COLUMNS}"
        );

        let rows = self
            .client
            .query(&sql, &[&topics, &limit, &visibility_secs])
            .await
            .map_err(|e| CampexError::Messaging(format!("Failed to receive messages: {e}")))?;

        let mut deliveries = rows
            .iter()
            .map(delivery_from_row)
            .collect::<Result<Vec<_>>>()?;
        deliveries.sort_by_key(|d| d.id);
        Ok(deliveries)
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        let deleted = self
            .client
            .execute(
                "DELETE FROM topic_messages WHERE id = $1 AND topic = $2",
                &[&delivery.id, &delivery.topic],
            )
            .await?;
        if deleted == 0 {
            return Err(CampexError::Messaging(format!(
                "Message {} not found in {}",
                delivery.id, delivery.topic
            )));
        }
        Ok(())
    }

    async fn depth(&self, topic: &str) -> Result<u64> {
        let row = self
            .client
            .query_opt(
                "SELECT COUNT(*) AS depth FROM topic_messages WHERE topic = $1",
                &[&topic],
            )
            .await?
            .ok_or_else(|| CampexError::Messaging("COUNT returned no row".to_string()))?;
        let depth: i64 = column(&row, "depth")?;
        Ok(u64::try_from(depth).unwrap_or(0))
    }

    async fn peek(&self, topic: &str, limit: usize) -> Result<Vec<Delivery>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM topic_messages WHERE topic = $1 ORDER BY id LIMIT $2"
        );
        self.client
            .query(&sql, &[&topic, &limit])
            .await?
            .iter()
            .map(delivery_from_row)
            .collect()
    }

    fn backend(&self) -> &'static str {
        "postgresql"
    }
}
