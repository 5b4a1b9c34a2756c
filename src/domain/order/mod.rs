// ============================================================================
// Order Domain - Business Logic for the Delivery Order
// ============================================================================
//
// This module contains ALL Order-specific rules:
// - Value objects (OrderItem, OrderStatus and its state machine)
// - Aggregate (Order: creation, validation, status transitions)
// - Events (OrderEvent emitted after a committed transition)
// - Errors (OrderError enum)
//
// Nothing in here performs I/O.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use errors::*;
pub use aggregate::*;
