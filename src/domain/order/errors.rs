use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    /// Malformed input: client's fault, never worth retrying.
    #[error("Invalid order data: {0}")]
    InvalidData(String),

    /// Illegal state change: client's fault, never worth retrying.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl OrderError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        OrderError::InvalidData(reason.into())
    }
}
