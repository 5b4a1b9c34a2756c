// ============================================================================
// Event Publishing - Downstream notification of committed transitions
// ============================================================================
//
// Every event of an order carries the order id as its partition key, so the
// broker keeps one order's events in commit order. Delivery is at-least-once:
// the Redpanda publisher retries transient failures, and consumers are
// expected to dedupe on `eventId`.
//
// ============================================================================

mod memory;
mod redpanda;

pub use self::memory::InMemoryEventPublisher;
pub use self::redpanda::RedpandaPublisher;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::order::OrderEvent;
use crate::utils::{CircuitState, IsTransient};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize event: {0}")]
    Serialization(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Circuit breaker open, broker unavailable")]
    CircuitOpen,

    #[error("Publish failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Gave up waiting; the broker may still deliver the message
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),
}

impl IsTransient for PublishError {
    fn is_transient(&self) -> bool {
        matches!(self, PublishError::Broker(_))
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError>;

    /// Breaker state, for publishers that carry one
    async fn circuit_state(&self) -> Option<CircuitState> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_broker_errors_are_transient() {
        assert!(PublishError::Broker("timeout".into()).is_transient());
        assert!(!PublishError::Serialization("bad".into()).is_transient());
        assert!(!PublishError::CircuitOpen.is_transient());
        assert!(!PublishError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!PublishError::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".into()
        }
        .is_transient());
    }
}
