use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Events - Notifications emitted after a committed status change
// ============================================================================
//
// Events are derived, never persisted by this service. The publisher owns
// their delivery; the order id doubles as the partition key so a consumer of
// one partition sees the transitions of an order in the order they happened.
//
// ============================================================================

pub const SYSTEM_ACTOR: &str = "system";
pub const STATUS_UPDATE_REASON: &str = "status_update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderStatusChanged,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderStatusChanged => "ORDER_STATUS_CHANGED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub changed_by: String,
    pub reason: String,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            changed_by: SYSTEM_ACTOR.to_string(),
            reason: STATUS_UPDATE_REASON.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub metadata: EventMetadata,
}

impl OrderEvent {
    /// Build the notification for a transition `order` has just gone through
    pub fn status_changed(order: &Order, old_status: OrderStatus) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: EventType::OrderStatusChanged,
            order_id: order.id,
            customer_id: order.customer_id,
            old_status,
            new_status: order.status,
            timestamp: Utc::now(),
            metadata: EventMetadata::default(),
        }
    }

    pub fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderItem;

    fn in_progress_order() -> Order {
        let mut order = Order::create(
            "123e4567-e89b-12d3-a456-426614174000",
            vec![OrderItem::new("LAPTOP-001", 1, 999.99)],
        )
        .unwrap();
        order.transition(OrderStatus::InProgress).unwrap();
        order
    }

    #[test]
    fn test_status_changed_event() {
        let order = in_progress_order();
        let event = OrderEvent::status_changed(&order, OrderStatus::New);

        assert_eq!(event.event_type, EventType::OrderStatusChanged);
        assert_eq!(event.order_id, order.id);
        assert_eq!(event.customer_id, order.customer_id);
        assert_eq!(event.old_status, OrderStatus::New);
        assert_eq!(event.new_status, OrderStatus::InProgress);
        assert_eq!(event.metadata.changed_by, "system");
        assert_eq!(event.partition_key(), order.id.to_string());
    }

    #[test]
    fn test_event_ids_are_unique() {
        let order = in_progress_order();
        let first = OrderEvent::status_changed(&order, OrderStatus::New);
        let second = OrderEvent::status_changed(&order, OrderStatus::New);

        assert_ne!(first.event_id, second.event_id);
    }

    #[test]
    fn test_event_wire_shape() {
        let order = in_progress_order();
        let event = OrderEvent::status_changed(&order, OrderStatus::New);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventType"], "ORDER_STATUS_CHANGED");
        assert_eq!(json["orderId"], order.id.to_string());
        assert_eq!(json["oldStatus"], "NEW");
        assert_eq!(json["newStatus"], "IN_PROGRESS");
        assert_eq!(json["metadata"]["changedBy"], "system");
        assert_eq!(json["metadata"]["reason"], "status_update");
        assert!(json.get("eventId").is_some());
        assert!(json.get("timestamp").is_some());
    }
}
