use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};
use srs_common::Money;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem},
    traits::DurableStoreError,
};

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    order_id: OrderId,
    user_id: String,
    status: String,
    total_amount: Money,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            order_id: self.order_id,
            user_id: self.user_id,
            status: self.status,
            total_amount: self.total_amount,
            created_at: self.created_at,
            items,
        }
    }
}

/// Inserts the order row and all of its line items. Not atomic on its own; callers embed this in a transaction and
/// pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, DurableStoreError> {
    let row: OrderRow = sqlx::query_as(
        r#"
            INSERT INTO orders (order_id, user_id, status, total_amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING order_id, user_id, status, total_amount, created_at;
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.user_id)
    .bind(crate::db_types::ORDER_STATUS_CONFIRMED)
    .bind(order.total_amount)
    .bind(order.created_at)
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, sku, quantity, price_per_unit)
                VALUES ($1, $2, $3, $4);
            "#,
        )
        .bind(&order.order_id)
        .bind(&item.sku)
        .bind(item.quantity)
        .bind(item.price_per_unit)
        .execute(&mut *conn)
        .await?;
    }
    debug!("🗃️ Order [{}] saved with {} line items", order.order_id, order.items.len());
    Ok(row.into_order(order.items))
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, DurableStoreError> {
    let row: Option<OrderRow> = sqlx::query_as(
        "SELECT order_id, user_id, status, total_amount, created_at FROM orders WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let items: Vec<OrderItem> = sqlx::query_as(
        "SELECT sku, quantity, price_per_unit FROM order_items WHERE order_id = $1 ORDER BY id ASC",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(Some(row.into_order(items)))
}
