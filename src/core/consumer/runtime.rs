//! Worker pool driving the orchestrator from the broker

use crate::adapters::broker::{Delivery, MessageBroker, OutboundMessage};
use crate::config::CampexConfig;
use crate::core::codec;
use crate::core::consumer::stats::ConsumerStats;
use crate::core::export::{ExportOrchestrator, RunControl};
use crate::core::retry::{Classification, RetryPolicy};
use crate::domain::{CampexError, ExportError, MessageHeaders, Result, RetryMetadata};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Dead-letter header carrying the error message
pub const ERROR_HEADER: &str = "error";
/// Dead-letter header carrying the failed step
pub const FAILED_STEP_HEADER: &str = "failed_step";
/// Dead-letter header carrying the consumer group
pub const ORIGIN_GROUP_HEADER: &str = "origin_group";

/// What happened to one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The export succeeded
    Completed,
    /// A terminal failure; the message was dropped
    Discarded,
    /// Republished to the retry topic, deliverable after `delay`
    Retried { delay: Duration },
    /// Published to the dead-letter topic
    DeadLettered,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Completed => "completed",
            Route::Discarded => "discarded",
            Route::Retried { .. } => "retried",
            Route::DeadLettered => "dead_lettered",
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub group: String,
    pub input_topic: String,
    pub retry_topic: String,
    pub dead_letter_topic: String,
    pub workers: usize,
    pub poll_interval: Duration,
    pub visibility_timeout: Duration,
    /// Upper bound on one orchestrator run
    pub message_timeout: Duration,
    /// Grace period for in-flight runs after shutdown is requested
    pub shutdown_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ConsumerSettings {
    /// Topics workers receive from
    pub fn consumed_topics(&self) -> Vec<String> {
        let mut topics = vec![self.input_topic.clone()];
        if self.retry_topic != self.input_topic {
            topics.push(self.retry_topic.clone());
        }
        topics
    }
}

impl From<&CampexConfig> for ConsumerSettings {
    fn from(config: &CampexConfig) -> Self {
        Self {
            group: config.consumer.group.clone(),
            input_topic: config.topics.input.clone(),
            retry_topic: config.topics.retry.clone(),
            dead_letter_topic: config.topics.dead_letter.clone(),
            workers: config.consumer.workers,
            poll_interval: Duration::from_millis(config.consumer.poll_interval_ms),
            visibility_timeout: Duration::from_secs(config.consumer.visibility_timeout_secs),
            message_timeout: Duration::from_secs(config.consumer.message_timeout_secs),
            shutdown_timeout: Duration::from_secs(config.consumer.shutdown_timeout_secs),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

/// Consumes export requests until shut down
#[derive(Clone)]
pub struct ConsumerRuntime {
    broker: Arc<dyn MessageBroker>,
    orchestrator: ExportOrchestrator,
    settings: ConsumerSettings,
    stats: Arc<Mutex<ConsumerStats>>,
}

impl ConsumerRuntime {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        orchestrator: ExportOrchestrator,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            broker,
            orchestrator,
            settings,
            stats: Arc::new(Mutex::new(ConsumerStats::default())),
        }
    }

    pub fn settings(&self) -> &ConsumerSettings {
        &self.settings
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> ConsumerStats {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update_stats(&self, f: impl FnOnce(&mut ConsumerStats)) {
        let mut stats = self
            .stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut stats);
    }

    /// Runs the worker pool until `shutdown` flips to `true`
    ///
    /// Workers stop claiming new deliveries at once. In-flight runs get
    /// `shutdown_timeout` to finish; after that they are cancelled at their
    /// next step boundary and their deliveries go through normal routing.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<ConsumerStats> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let mut workers = JoinSet::new();

        tracing::info!(
            group = %self.settings.group,
            workers = self.settings.workers,
            topics = ?self.settings.consumed_topics(),
            backend = self.broker.backend(),
            "Consumer started"
        );

        for worker_id in 0..self.settings.workers.max(1) {
            let runtime = self.clone();
            let shutdown = shutdown.clone();
            let cancel = cancel_rx.clone();
            workers.spawn(async move { runtime.worker_loop(worker_id, shutdown, cancel).await });
        }

        let mut shutdown_wait = shutdown.clone();
        tokio::select! {
            _ = wait_for_true(&mut shutdown_wait) => {}
            _ = drain(&mut workers) => {
                tracing::warn!("All workers exited before shutdown was requested");
            }
        }

        if !workers.is_empty() {
            tracing::info!(
                grace_secs = self.settings.shutdown_timeout.as_secs(),
                "Shutdown requested, waiting for in-flight exports"
            );
            if tokio::time::timeout(self.settings.shutdown_timeout, drain(&mut workers))
                .await
                .is_err()
            {
                tracing::warn!("Shutdown grace period elapsed, cancelling in-flight exports");
                let _ = cancel_tx.send(true);
                if tokio::time::timeout(self.settings.shutdown_timeout, drain(&mut workers))
                    .await
                    .is_err()
                {
                    tracing::error!("Workers did not stop after cancellation, aborting");
                    workers.abort_all();
                    drain(&mut workers).await;
                }
            }
        }

        let stats = self.stats();
        tracing::info!(
            received = stats.received,
            completed = stats.completed,
            discarded = stats.discarded,
            retried = stats.retried,
            dead_lettered = stats.dead_lettered,
            routing_failures = stats.routing_failures,
            "Consumer stopped"
        );
        Ok(stats)
    }

    async fn worker_loop(
        &self,
        worker_id: usize,
        mut shutdown: watch::Receiver<bool>,
        cancel: watch::Receiver<bool>,
    ) {
        let topics = self.settings.consumed_topics();
        tracing::debug!(worker_id, "Worker started");

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            let deliveries = match self
                .broker
                .receive(&topics, 1, self.settings.visibility_timeout)
                .await
            {
                Ok(deliveries) => deliveries,
                Err(e) => {
                    tracing::warn!(worker_id, error = %e, "Failed to receive deliveries");
                    Vec::new()
                }
            };

            if deliveries.is_empty() {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
                continue;
            }

            for delivery in deliveries {
                if let Err(e) = self.handle(&delivery, Some(cancel.clone())).await {
                    tracing::error!(
                        worker_id,
                        topic = %delivery.topic,
                        message_id = delivery.id,
                        error = %e,
                        "Delivery left unacknowledged"
                    );
                }
            }
        }

        tracing::debug!(worker_id, "Worker stopped");
    }

    /// Claims up to `max` deliveries and handles them one after another
    ///
    /// Returns the routes taken, in delivery order.
    pub async fn poll_once(&self, max: usize) -> Result<Vec<Route>> {
        let deliveries = self
            .broker
            .receive(
                &self.settings.consumed_topics(),
                max,
                self.settings.visibility_timeout,
            )
            .await?;

        let mut routes = Vec::with_capacity(deliveries.len());
        for delivery in &deliveries {
            routes.push(self.handle(delivery, None).await?);
        }
        Ok(routes)
    }

    /// Decodes, runs and routes one delivery
    ///
    /// # Errors
    ///
    /// Returns an error when the follow-up publish or the acknowledgement
    /// fails. The delivery is then redelivered after the visibility timeout.
    pub async fn handle(
        &self,
        delivery: &Delivery,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<Route> {
        self.update_stats(|s| s.received += 1);
        // Producers that do not stamp a request id get one here; retries carry it on
        let retry = RetryMetadata::from_headers(&delivery.headers).stamped();

        let outcome = match codec::decode(&delivery.payload) {
            Ok(request) => {
                let mut control = RunControl::unbounded().with_timeout(self.settings.message_timeout);
                if let Some(cancel) = cancel {
                    control = control.with_cancel(cancel);
                }
                self.orchestrator
                    .run(&request, retry, &control)
                    .await
                    .map(|_| ())
            }
            Err(e) => {
                tracing::warn!(
                    topic = %delivery.topic,
                    message_id = delivery.id,
                    error = %e,
                    "Undecodable export request"
                );
                Err(ExportError::from(e))
            }
        };

        let route = match outcome {
            Ok(()) => Route::Completed,
            Err(error) => match self.settings.retry.classify(&error, &retry) {
                Classification::Discard => Route::Discarded,
                Classification::Retry { delay } => {
                    self.publish_retry(delivery, retry, delay).await?;
                    Route::Retried { delay }
                }
                Classification::DeadLetter => {
                    self.publish_dead_letter(delivery, retry, &error).await?;
                    Route::DeadLettered
                }
            },
        };

        if let Err(e) = self.broker.ack(delivery).await {
            self.update_stats(|s| s.routing_failures += 1);
            return Err(e);
        }
        self.update_stats(|s| s.record(&route));
        crate::log_routing!(delivery.topic, delivery.id, route.as_str(), retry.attempt_count);
        Ok(route)
    }

    async fn publish_retry(
        &self,
        delivery: &Delivery,
        retry: RetryMetadata,
        delay: Duration,
    ) -> Result<()> {
        let delay_chrono = chrono::Duration::from_std(delay)
            .map_err(|e| CampexError::Messaging(format!("Invalid retry delay: {e}")))?;
        let mut headers = delivery.headers.clone();
        retry.next().write_to(&mut headers);

        let message = OutboundMessage::new(delivery.payload.clone())
            .with_headers(headers)
            .not_before(Utc::now() + delay_chrono);
        let message = match delivery.key.clone() {
            Some(key) => message.with_key(key),
            None => message,
        };

        self.publish(&self.settings.retry_topic, message).await
    }

    async fn publish_dead_letter(
        &self,
        delivery: &Delivery,
        retry: RetryMetadata,
        error: &ExportError,
    ) -> Result<()> {
        let mut headers: MessageHeaders = delivery.headers.clone();
        retry.write_to(&mut headers);
        headers.insert(ERROR_HEADER.to_string(), error.to_string());
        headers.insert(
            FAILED_STEP_HEADER.to_string(),
            error.failed_step().to_string(),
        );
        headers.insert(ORIGIN_GROUP_HEADER.to_string(), self.settings.group.clone());

        let message = OutboundMessage::new(delivery.payload.clone()).with_headers(headers);
        let message = match delivery.key.clone() {
            Some(key) => message.with_key(key),
            None => message,
        };

        self.publish(&self.settings.dead_letter_topic, message).await
    }

    async fn publish(&self, topic: &str, message: OutboundMessage) -> Result<()> {
        if let Err(e) = self.broker.publish(topic, message).await {
            self.update_stats(|s| s.routing_failures += 1);
            return Err(e.with_prefix(format!("publish to {topic}")));
        }
        Ok(())
    }
}

async fn wait_for_true(rx: &mut watch::Receiver<bool>) {
    loop {
        let requested = *rx.borrow();
        if requested {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped; nobody can request shutdown any more
            std::future::pending::<()>().await;
        }
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!(error = %e, "Worker panicked");
            }
        }
    }
}
