//! `SqliteDatabase` is the concrete durable-store backend: it implements [`OrderManagement`] and [`AuditLogging`]
//! over a pooled SQLite connection.
use std::fmt::Debug;

use sqlx::SqlitePool;

use super::db::{audit, orders};
use crate::{
    db_types::{AuditEvent, AuditEventType, NewAuditEvent, NewOrder, Order, OrderId, ReservationId},
    traits::{AuditLogging, DurableStoreError, OrderManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database connection pool with the given URL and maximum number of connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, DurableStoreError> {
        let pool = super::new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, DurableStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, DurableStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }
}

impl AuditLogging for SqliteDatabase {
    async fn record_event(&self, event: NewAuditEvent) -> Result<i64, DurableStoreError> {
        let mut conn = self.pool.acquire().await?;
        audit::insert_event(event, &mut conn).await
    }

    async fn events_for_reservation(&self, id: &ReservationId) -> Result<Vec<AuditEvent>, DurableStoreError> {
        let mut conn = self.pool.acquire().await?;
        audit::events_for_reservation(id, &mut conn).await
    }

    async fn events_of_type(&self, event_type: AuditEventType) -> Result<Vec<AuditEvent>, DurableStoreError> {
        let mut conn = self.pool.acquire().await?;
        audit::events_of_type(event_type, &mut conn).await
    }
}
