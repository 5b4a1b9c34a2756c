use ::scylla::client::session::Session;
use ::scylla::response::query_result::QueryResult;
use ::scylla::value::{CqlValue, Row};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::sync::Arc;
use uuid::Uuid;

use super::{paginate, OrderFilter, OrderPage, OrderRecord, OrderRow, OrderStore, PageRequest, StoreError};
use crate::domain::order::Order;

// ============================================================================
// ScyllaDB Order Store
// ============================================================================
//
// Responsibilities:
// 1. Create orders with INSERT ... IF NOT EXISTS (duplicate ids are reported)
// 2. Apply transitions with UPDATE ... IF version = ? (compare-and-swap)
// 3. Serve filtered, newest-first listings
//
// Lightweight transactions run through Paxos, so the version check holds
// across every process instance writing to the cluster.
//
// ============================================================================

const SELECT_ORDERS: &str = "SELECT id, customer_id, status, items, total_amount, version, created_at, updated_at FROM orders";

pub struct ScyllaOrderStore {
    session: Arc<Session>,
}

/// Result of a lightweight transaction
struct LwtOutcome {
    applied: bool,
    current_version: Option<i64>,
}

impl ScyllaOrderStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Create the `orders` table and the indexes listing filters rely on.
    /// Expects the session to already be bound to a keyspace.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS orders (
                id uuid PRIMARY KEY,
                customer_id uuid,
                status text,
                items text,
                total_amount double,
                version bigint,
                created_at timestamp,
                updated_at timestamp
            )",
            "CREATE INDEX IF NOT EXISTS orders_status_idx ON orders (status)",
            "CREATE INDEX IF NOT EXISTS orders_customer_idx ON orders (customer_id)",
        ];

        for statement in statements {
            self.session
                .query_unpaged(statement, ())
                .await
                .map_err(StoreError::failure)?;
        }

        tracing::info!("Order schema ready");
        Ok(())
    }

    fn lwt_outcome(result: QueryResult) -> Result<LwtOutcome, StoreError> {
        let rows = result.into_rows_result().map_err(StoreError::failure)?;
        let version_idx = rows
            .column_specs()
            .iter()
            .position(|spec| spec.name() == "version");

        let row = rows
            .maybe_first_row::<Row>()
            .map_err(StoreError::failure)?
            .ok_or_else(|| StoreError::Failure("lightweight transaction returned no row".to_string()))?;

        let applied = row
            .columns
            .first()
            .and_then(Option::as_ref)
            .and_then(CqlValue::as_boolean)
            .unwrap_or(false);

        let current_version = version_idx
            .and_then(|idx| row.columns.get(idx))
            .and_then(Option::as_ref)
            .and_then(CqlValue::as_bigint);

        Ok(LwtOutcome {
            applied,
            current_version,
        })
    }
}

#[async_trait]
impl OrderStore for ScyllaOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let record = OrderRecord::from_order(order)?;

        let result = self
            .session
            .query_unpaged(
                "INSERT INTO orders (
                    id, customer_id, status, items, total_amount, version, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
                record.into_row(),
            )
            .await
            .map_err(StoreError::failure)?;

        if !Self::lwt_outcome(result)?.applied {
            tracing::warn!(order_id = %order.id, "Order id already taken");
            return Err(StoreError::DuplicateIdentifier(order.id));
        }

        tracing::debug!(order_id = %order.id, "Inserted order");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError> {
        let result = self
            .session
            .query_unpaged(format!("{SELECT_ORDERS} WHERE id = ?"), (id,))
            .await
            .map_err(StoreError::failure)?;

        let row = result
            .into_rows_result()
            .map_err(StoreError::failure)?
            .maybe_first_row::<OrderRow>()
            .map_err(StoreError::failure)?;

        match row {
            Some(row) => OrderRecord::from(row).into_order(),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn find_filtered(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError> {
        // Partitions are keyed by id, so ordering by created_at happens client-side:
        // every matching row is read before a page is cut. Unfiltered listings
        // scan the whole table.
        let pager = match (filter.status, filter.customer_id) {
            (Some(status), Some(customer_id)) => {
                let cql = format!("{SELECT_ORDERS} WHERE status = ? AND customer_id = ? ALLOW FILTERING");
                self.session.query_iter(cql, (status.as_str(), customer_id)).await
            }
            (Some(status), None) => {
                let cql = format!("{SELECT_ORDERS} WHERE status = ?");
                self.session.query_iter(cql, (status.as_str(),)).await
            }
            (None, Some(customer_id)) => {
                let cql = format!("{SELECT_ORDERS} WHERE customer_id = ?");
                self.session.query_iter(cql, (customer_id,)).await
            }
            (None, None) => self.session.query_iter(SELECT_ORDERS, ()).await,
        }
        .map_err(StoreError::failure)?;

        let mut rows = pager.rows_stream::<OrderRow>().map_err(StoreError::failure)?;
        let mut orders = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(StoreError::failure)? {
            orders.push(OrderRecord::from(row).into_order()?);
        }

        let result = paginate(orders, filter, page);

        tracing::debug!(
            status = ?filter.status,
            customer_id = ?filter.customer_id,
            page = page.page,
            page_size = page.page_size,
            total = result.total,
            "Listed orders"
        );

        Ok(result)
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let expected = order.version - 1;

        let result = self
            .session
            .query_unpaged(
                "UPDATE orders SET status = ?, version = ?, updated_at = ? WHERE id = ? IF version = ?",
                (order.status.as_str(), order.version, order.updated_at, order.id, expected),
            )
            .await
            .map_err(StoreError::failure)?;

        let outcome = Self::lwt_outcome(result)?;
        if outcome.applied {
            tracing::debug!(order_id = %order.id, version = order.version, "Updated order");
            return Ok(());
        }

        // Zero-match path only: tell a missing order apart from a stale version.
        let actual = match outcome.current_version {
            Some(version) => version,
            None => self.find_by_id(order.id).await?.version,
        };

        tracing::warn!(
            order_id = %order.id,
            expected_version = expected,
            actual_version = actual,
            "Version conflict on order update"
        );

        Err(StoreError::VersionConflict {
            id: order.id,
            expected,
            actual,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.session
            .query_unpaged("SELECT now() FROM system.local", ())
            .await
            .map_err(StoreError::failure)?;
        Ok(())
    }
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// Statements against a live cluster are not exercised by unit tests. The
// store contract (duplicate ids, NotFound vs VersionConflict, newest-first
// paging) is covered against InMemoryOrderStore, and the row mapping used
// here is covered by the OrderRecord round-trip tests.
//
// ============================================================================
