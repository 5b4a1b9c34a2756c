use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventPublisher, PublishError};
use crate::domain::order::OrderEvent;

/// Records published events in publish order
#[derive(Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<RwLock<Vec<OrderEvent>>>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<OrderEvent> {
        self.events.read().await.clone()
    }

    pub async fn events_for(&self, order_id: Uuid) -> Vec<OrderEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
