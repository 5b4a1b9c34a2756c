use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::{OrderItem, OrderStatus};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// Key Principles:
// 1. Validity rules live here, never in the persistence or transport layers
// 2. The only mutation after creation is a status transition
// 3. Every accepted transition bumps `version` by exactly one; the store
//    uses the pre-increment value as its write condition
// 4. No I/O: persisting, caching and announcing are the coordinator's job
//
// ============================================================================

pub const MAX_ITEMS_PER_ORDER: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    // Identity
    #[serde(rename = "orderId")]
    pub id: Uuid,
    pub customer_id: Uuid,

    // Current State
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,

    // Concurrency token
    pub version: i64,

    // Audit Trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validate input and build a brand-new order (status NEW, version 1)
    pub fn create(customer_id: &str, items: Vec<OrderItem>) -> Result<Self, OrderError> {
        if customer_id.is_empty() {
            return Err(OrderError::invalid("customer id is required"));
        }

        let customer_id = Uuid::parse_str(customer_id)
            .map_err(|_| OrderError::invalid(format!("customer id is not a valid UUID: {customer_id}")))?;

        Self::validate_items(&items)?;

        let now = now();
        let mut order = Self {
            id: Uuid::new_v4(),
            customer_id,
            status: OrderStatus::New,
            items,
            total_amount: 0.0,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        order.calculate_total_amount();

        Ok(order)
    }

    /// Whether `current -> target` is a legal edge of the delivery state machine
    pub fn can_transition(current: OrderStatus, target: OrderStatus) -> bool {
        current.can_transition_to(target)
    }

    /// Apply a status change in memory and return the previous status.
    ///
    /// On success the version is already incremented, so the caller can hand
    /// the aggregate straight to `OrderStore::update`.
    pub fn transition(&mut self, target: OrderStatus) -> Result<OrderStatus, OrderError> {
        if !Self::can_transition(self.status, target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        let previous = self.status;
        self.status = target;
        self.version += 1;
        self.updated_at = now();

        Ok(previous)
    }

    /// Recompute the total from the line items
    pub fn calculate_total_amount(&mut self) {
        self.total_amount = self.items.iter().map(OrderItem::subtotal).sum();
    }

    fn validate_items(items: &[OrderItem]) -> Result<(), OrderError> {
        if items.is_empty() {
            return Err(OrderError::invalid("order items cannot be empty"));
        }
        if items.len() > MAX_ITEMS_PER_ORDER {
            return Err(OrderError::invalid(format!(
                "order cannot contain more than {MAX_ITEMS_PER_ORDER} items"
            )));
        }

        items.iter().try_for_each(OrderItem::validate)
    }
}

// Stores keep millisecond precision; truncating here keeps round trips exact.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::MAX_ITEM_QUANTITY;
    use proptest::prelude::*;

    const CUSTOMER: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn sample_items() -> Vec<OrderItem> {
        vec![
            OrderItem::new("LAPTOP-001", 2, 999.99),
            OrderItem::new("MOUSE-002", 1, 29.99),
        ]
    }

    #[test]
    fn test_create_order() {
        let order = Order::create(CUSTOMER, sample_items()).unwrap();

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.version, 1);
        assert_eq!(order.customer_id.to_string(), CUSTOMER);
        assert!((order.total_amount - 2029.97).abs() < 1e-9);
        assert_eq!(order.created_at, order.updated_at);
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn test_create_rejects_invalid_customer() {
        assert!(matches!(
            Order::create("", sample_items()),
            Err(OrderError::InvalidData(_))
        ));
        assert!(matches!(
            Order::create("not-a-uuid", sample_items()),
            Err(OrderError::InvalidData(_))
        ));
    }

    #[test]
    fn test_create_rejects_bad_items() {
        assert!(Order::create(CUSTOMER, vec![]).is_err());
        assert!(Order::create(CUSTOMER, vec![OrderItem::new("SKU-1", 0, 10.0)]).is_err());
        assert!(Order::create(CUSTOMER, vec![OrderItem::new("SKU-1", 1, 0.0)]).is_err());

        let too_many = vec![OrderItem::new("SKU-1", 1, 1.0); MAX_ITEMS_PER_ORDER + 1];
        assert!(Order::create(CUSTOMER, too_many).is_err());
    }

    #[test]
    fn test_transition_bumps_version() {
        let mut order = Order::create(CUSTOMER, sample_items()).unwrap();
        let created_at = order.created_at;

        let previous = order.transition(OrderStatus::InProgress).unwrap();

        assert_eq!(previous, OrderStatus::New);
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.version, 2);
        assert_eq!(order.created_at, created_at);
        assert!(order.updated_at >= created_at);

        order.transition(OrderStatus::Delivered).unwrap();
        assert_eq!(order.version, 3);
    }

    #[test]
    fn test_illegal_transition_leaves_order_untouched() {
        let mut order = Order::create(CUSTOMER, sample_items()).unwrap();
        let before = order.clone();

        let err = order.transition(OrderStatus::Delivered).unwrap_err();

        assert_eq!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::New,
                to: OrderStatus::Delivered,
            }
        );
        assert_eq!(order, before);
    }

    #[test]
    fn test_terminal_order_rejects_transition() {
        let mut order = Order::create(CUSTOMER, sample_items()).unwrap();
        order.transition(OrderStatus::Cancelled).unwrap();

        for target in OrderStatus::ALL {
            assert!(order.transition(target).is_err());
        }
        assert_eq!(order.version, 2);
    }

    #[test]
    fn test_order_json_shape() {
        let order = Order::create(CUSTOMER, sample_items()).unwrap();
        let json = serde_json::to_value(&order).unwrap();

        assert!(json.get("orderId").is_some());
        assert_eq!(json["customerId"], CUSTOMER);
        assert_eq!(json["status"], "NEW");
        assert_eq!(json["version"], 1);
        assert!(json.get("totalAmount").is_some());
        assert!(json.get("createdAt").is_some());
    }

    fn item_strategy() -> impl Strategy<Value = OrderItem> {
        ("[A-Z]{3,12}", 1..=MAX_ITEM_QUANTITY, 1u32..1_000_000u32)
            .prop_map(|(sku, quantity, cents)| OrderItem::new(sku, quantity, f64::from(cents) / 100.0))
    }

    proptest! {
        #[test]
        fn prop_create_sets_initial_state(items in prop::collection::vec(item_strategy(), 1..20)) {
            let expected: f64 = items.iter().map(|i| f64::from(i.quantity) * i.price).sum();
            let order = Order::create(CUSTOMER, items).unwrap();

            prop_assert_eq!(order.version, 1);
            prop_assert_eq!(order.status, OrderStatus::New);
            prop_assert!((order.total_amount - expected).abs() <= expected.abs() * 1e-12);
        }

        #[test]
        fn prop_no_transition_leaves_terminal_or_enters_new(
            from in prop::sample::select(OrderStatus::ALL.to_vec()),
            to in prop::sample::select(OrderStatus::ALL.to_vec()),
        ) {
            if from.is_terminal() {
                prop_assert!(!Order::can_transition(from, to));
            }
            prop_assert!(!Order::can_transition(from, OrderStatus::New));
            if from == to {
                prop_assert!(!Order::can_transition(from, to));
            }
        }
    }
}
