use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::sync::Arc;
use std::time::Duration;

use super::{EventPublisher, PublishError};
use crate::domain::order::OrderEvent;
use crate::metrics::Metrics;
use crate::utils::{
    retry_on_transient, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
    RetryPolicy, RetryResult,
};

/// Kafka-protocol publisher for order events (Redpanda in deployment)
pub struct RedpandaPublisher {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
    circuit_breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl RedpandaPublisher {
    pub fn new(
        brokers: &str,
        topic: impl Into<String>,
        message_timeout: Duration,
        retry_policy: RetryPolicy,
        metrics: Arc<Metrics>,
    ) -> Result<Self, PublishError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", message_timeout.as_millis().to_string())
            .set("acks", "all")
            .set("compression.type", "lz4")
            .create()
            .map_err(|e| PublishError::Broker(format!("Failed to create producer: {e}")))?;

        let observer_metrics = metrics.clone();
        let circuit_breaker = CircuitBreaker::new("redpanda", CircuitBreakerConfig::default())
            .with_observer(move |from, to| {
                observer_metrics.record_circuit_breaker_transition(from, to)
            });

        Ok(Self {
            producer,
            topic: topic.into(),
            send_timeout: message_timeout,
            circuit_breaker,
            retry_policy,
            metrics,
        })
    }

    async fn send(&self, key: &str, payload: &str, event: &OrderEvent) -> Result<(), PublishError> {
        let event_id = event.event_id.to_string();
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "event-type",
                value: Some(event.event_type.as_str()),
            })
            .insert(Header {
                key: "event-id",
                value: Some(event_id.as_str()),
            });

        let record = FutureRecord::to(&self.topic)
            .key(key)
            .payload(payload)
            .headers(headers);

        let result = self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| PublishError::Broker(e.to_string()));

        self.metrics.record_publish_attempt(result.is_ok());
        result
    }
}

#[async_trait]
impl EventPublisher for RedpandaPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;
        let key = event.partition_key();
        let (key, payload) = (key.as_str(), payload.as_str());

        let outcome = retry_on_transient(&self.retry_policy, "redpanda_publish", |_attempt| async move {
            match self.circuit_breaker.call(self.send(key, payload, event)).await {
                Ok(()) => Ok(()),
                Err(CircuitBreakerError::CircuitOpen) => Err(PublishError::CircuitOpen),
                Err(CircuitBreakerError::OperationFailed(e)) => Err(e),
            }
        })
        .await;

        match outcome {
            RetryResult::Success(()) => {
                tracing::info!(
                    topic = %self.topic,
                    key = %key,
                    event_id = %event.event_id,
                    "Published to Redpanda"
                );
                Ok(())
            }
            RetryResult::Failed { error, attempts } => Err(PublishError::RetriesExhausted {
                attempts,
                last_error: error.to_string(),
            }),
            RetryResult::PermanentFailure(error) => {
                tracing::error!(topic = %self.topic, error = %error, "Failed to publish to Redpanda");
                Err(error)
            }
        }
    }

    async fn circuit_state(&self) -> Option<CircuitState> {
        Some(self.circuit_breaker.state().await)
    }
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// Exercising this publisher needs a running broker:
//
//   docker run -p 9092:9092 redpandadata/redpanda redpanda start --smp 1
//   KAFKA_BROKERS=127.0.0.1:9092 cargo run
//
// The unit tests below only cover construction, which librdkafka performs
// without contacting the brokers.
//
// ============================================================================
