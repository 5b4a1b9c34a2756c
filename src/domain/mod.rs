// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure domain code: the order aggregate and the state machine it enforces.
// Persistence, caching and messaging live in their own modules and depend on
// this layer, never the other way around.
//
// ============================================================================

pub mod order;
