//! Integration tests for the consumer runtime over the in-memory broker

mod common;

use async_trait::async_trait;
use campex::adapters::broker::{Delivery, InMemoryBroker, MessageBroker, OutboundMessage};
use campex::config::DedupePolicy;
use campex::core::codec::encode;
use campex::core::consumer::runtime::{ERROR_HEADER, FAILED_STEP_HEADER, ORIGIN_GROUP_HEADER};
use campex::core::consumer::{ConsumerRuntime, ConsumerSettings, Route};
use campex::core::retry::RetryPolicy;
use campex::domain::{
    CampaignId, CampexError, ExportRequest, OrganizationId, Result, RetryMetadata,
};
use chrono::Utc;
use common::{Harness, CAMPAIGN, ORG};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

const INPUT: &str = "campaign-export-requested";
const RETRY: &str = "campaign-export-retry";
const DEAD: &str = "campaign-export-dead";

fn settings() -> ConsumerSettings {
    ConsumerSettings {
        group: "campex-test".to_string(),
        input_topic: INPUT.to_string(),
        retry_topic: RETRY.to_string(),
        dead_letter_topic: DEAD.to_string(),
        workers: 2,
        poll_interval: Duration::from_millis(10),
        visibility_timeout: Duration::from_secs(60),
        message_timeout: Duration::from_secs(30),
        shutdown_timeout: Duration::from_secs(5),
        retry: RetryPolicy::default(),
    }
}

/// Delegates to an in-memory broker but refuses to publish to the follow-up topics
struct RefusingFollowUps {
    inner: Arc<InMemoryBroker>,
}

#[async_trait]
impl MessageBroker for RefusingFollowUps {
    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<i64> {
        if topic == RETRY || topic == DEAD {
            return Err(CampexError::Messaging("broker unavailable".to_string()));
        }
        self.inner.publish(topic, message).await
    }

    async fn receive(
        &self,
        topics: &[String],
        max: usize,
        visibility: Duration,
    ) -> Result<Vec<Delivery>> {
        self.inner.receive(topics, max, visibility).await
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        self.inner.ack(delivery).await
    }

    async fn depth(&self, topic: &str) -> Result<u64> {
        self.inner.depth(topic).await
    }

    async fn peek(&self, topic: &str, limit: usize) -> Result<Vec<Delivery>> {
        self.inner.peek(topic, limit).await
    }

    fn backend(&self) -> &'static str {
        "refusing"
    }
}

fn runtime(harness: &Harness, broker: Arc<InMemoryBroker>) -> ConsumerRuntime {
    ConsumerRuntime::new(
        broker,
        harness.orchestrator(DedupePolicy::Disabled),
        settings(),
    )
}

fn request_message() -> OutboundMessage {
    let request = ExportRequest::new(OrganizationId::from(ORG), CampaignId::from(CAMPAIGN));
    OutboundMessage::new(encode(&request).unwrap()).with_key(request.partition_key())
}

#[tokio::test]
async fn test_successful_export_is_acknowledged() {
    let harness = Harness::new();
    let broker = Arc::new(InMemoryBroker::new());
    broker.publish(INPUT, request_message()).await.unwrap();

    let runtime = runtime(&harness, broker.clone());
    let routes = runtime.poll_once(10).await.unwrap();

    assert_eq!(routes, vec![Route::Completed]);
    assert_eq!(broker.depth(INPUT).await.unwrap(), 0);
    assert_eq!(broker.depth(RETRY).await.unwrap(), 0);
    assert_eq!(harness.notifier.sent().len(), 1);
    assert_eq!(runtime.stats().completed, 1);
}

#[tokio::test]
async fn test_malformed_payloads_are_discarded() {
    let harness = Harness::new();
    let broker = Arc::new(InMemoryBroker::new());
    for payload in [
        b"".to_vec(),
        b"not json".to_vec(),
        br#"{"campaignId": 7}"#.to_vec(),
        br#"[42, 7]"#.to_vec(),
    ] {
        broker
            .publish(INPUT, OutboundMessage::new(payload))
            .await
            .unwrap();
    }

    let runtime = runtime(&harness, broker.clone());
    let routes = runtime.poll_once(10).await.unwrap();

    assert_eq!(routes, vec![Route::Discarded; 4]);
    assert_eq!(broker.depth(INPUT).await.unwrap(), 0);
    assert_eq!(broker.depth(RETRY).await.unwrap(), 0);
    assert_eq!(broker.depth(DEAD).await.unwrap(), 0);
    // Decoding failures never reach the orchestrator
    assert!(harness.audit.entries().is_empty());
    assert_eq!(runtime.stats().discarded, 4);
}

#[tokio::test]
async fn test_transient_failure_is_scheduled_on_retry_topic() {
    let harness = Harness::new();
    harness.uploader.fail_next(1);
    let broker = Arc::new(InMemoryBroker::new());
    broker.publish(INPUT, request_message()).await.unwrap();

    let runtime = runtime(&harness, broker.clone());
    let before = Utc::now();
    let routes = runtime.poll_once(10).await.unwrap();

    assert_eq!(
        routes,
        vec![Route::Retried {
            delay: Duration::from_secs(5)
        }]
    );
    assert_eq!(broker.depth(INPUT).await.unwrap(), 0);

    let retried = broker.messages(RETRY).await;
    assert_eq!(retried.len(), 1);
    assert_eq!(
        retried[0].headers.get(RetryMetadata::HEADER).map(String::as_str),
        Some("1")
    );
    assert_eq!(retried[0].key.as_deref(), Some("42:7"));
    // A request id is stamped on the first retry so later attempts can be matched
    let request_id = retried[0]
        .headers
        .get(RetryMetadata::REQUEST_ID_HEADER)
        .and_then(|v| Uuid::parse_str(v).ok());
    assert!(request_id.is_some());
    let visible_at = broker.visible_at(RETRY, retried[0].id).await.unwrap();
    assert!(visible_at >= before + chrono::Duration::seconds(5));

    // Not deliverable before its backoff has elapsed
    assert!(runtime.poll_once(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exhausted_retries_are_dead_lettered() {
    let harness = Harness::new();
    let request_id = Uuid::new_v4();
    harness.uploader.fail_next(1);
    let broker = Arc::new(InMemoryBroker::new());
    broker
        .publish(
            RETRY,
            request_message()
                .with_header(RetryMetadata::HEADER, "3")
                .with_header(RetryMetadata::REQUEST_ID_HEADER, request_id.to_string()),
        )
        .await
        .unwrap();

    let runtime = runtime(&harness, broker.clone());
    let routes = runtime.poll_once(10).await.unwrap();

    assert_eq!(routes, vec![Route::DeadLettered]);
    assert_eq!(broker.depth(RETRY).await.unwrap(), 0);

    let dead = broker.messages(DEAD).await;
    assert_eq!(dead.len(), 1);
    let header = |name: &str| dead[0].headers.get(name).cloned();
    assert_eq!(header(RetryMetadata::HEADER).as_deref(), Some("3"));
    assert_eq!(header(FAILED_STEP_HEADER).as_deref(), Some("upload"));
    assert_eq!(header(ORIGIN_GROUP_HEADER).as_deref(), Some("campex-test"));
    assert_eq!(
        header(RetryMetadata::REQUEST_ID_HEADER),
        Some(request_id.to_string())
    );
    assert!(header(ERROR_HEADER).unwrap().contains("503"));
}

#[tokio::test]
async fn test_legacy_retry_header_is_honoured() {
    let harness = Harness::new();
    harness.uploader.fail_next(1);
    let broker = Arc::new(InMemoryBroker::new());
    broker
        .publish(
            RETRY,
            request_message().with_header(RetryMetadata::LEGACY_HEADER, "1"),
        )
        .await
        .unwrap();

    let routes = runtime(&harness, broker.clone()).poll_once(10).await.unwrap();

    assert_eq!(
        routes,
        vec![Route::Retried {
            delay: Duration::from_secs(10)
        }]
    );
    let retried = broker.messages(RETRY).await;
    assert_eq!(
        retried[0].headers.get(RetryMetadata::HEADER).map(String::as_str),
        Some("2")
    );
    assert!(!retried[0].headers.contains_key(RetryMetadata::LEGACY_HEADER));
}

#[tokio::test]
async fn test_failed_retry_publish_leaves_message_unacknowledged() {
    let harness = Harness::new();
    harness.uploader.fail_next(1);
    let inner = Arc::new(InMemoryBroker::new());
    inner.publish(INPUT, request_message()).await.unwrap();
    let runtime = ConsumerRuntime::new(
        Arc::new(RefusingFollowUps {
            inner: inner.clone(),
        }),
        harness.orchestrator(DedupePolicy::Disabled),
        settings(),
    );

    let deliveries = inner
        .receive(&[INPUT.to_string()], 1, Duration::from_secs(60))
        .await
        .unwrap();
    let err = runtime.handle(&deliveries[0], None).await.unwrap_err();

    assert!(matches!(err, CampexError::Messaging(_)));
    assert!(err.to_string().contains(RETRY));
    assert_eq!(inner.depth(INPUT).await.unwrap(), 1);
    assert_eq!(inner.depth(RETRY).await.unwrap(), 0);
    let stats = runtime.stats();
    assert_eq!(stats.routing_failures, 1);
    assert_eq!(stats.retried, 0);
    assert_eq!(stats.received, 1);
}

#[tokio::test]
async fn test_failed_dead_letter_publish_leaves_message_unacknowledged() {
    let harness = Harness::new();
    harness.uploader.fail_next(1);
    let inner = Arc::new(InMemoryBroker::new());
    inner
        .publish(
            RETRY,
            request_message().with_header(RetryMetadata::HEADER, "3"),
        )
        .await
        .unwrap();
    let runtime = ConsumerRuntime::new(
        Arc::new(RefusingFollowUps {
            inner: inner.clone(),
        }),
        harness.orchestrator(DedupePolicy::Disabled),
        settings(),
    );

    let routes = runtime.poll_once(10).await;

    assert!(routes.is_err());
    assert_eq!(inner.depth(RETRY).await.unwrap(), 1);
    assert_eq!(inner.depth(DEAD).await.unwrap(), 0);
    let stats = runtime.stats();
    assert_eq!(stats.routing_failures, 1);
    assert_eq!(stats.dead_lettered, 0);
}

#[tokio::test]
async fn test_run_processes_until_shutdown() {
    let harness = Harness::new();
    let broker = Arc::new(InMemoryBroker::new());
    for _ in 0..3 {
        broker.publish(INPUT, request_message()).await.unwrap();
    }

    let runtime = runtime(&harness, broker.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(runtime.clone().run(shutdown_rx));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while runtime.stats().handled() < 3 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    shutdown_tx.send(true).unwrap();

    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.completed, 3);
    assert_eq!(broker.depth(INPUT).await.unwrap(), 0);
    assert_eq!(harness.ledger.processes().len(), 3);
    assert!(harness.leftover_artifacts().is_empty());
}
