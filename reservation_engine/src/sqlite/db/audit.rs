use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{Row, SqliteConnection};

use crate::{
    db_types::{AuditEvent, AuditEventType, NewAuditEvent, ReservationId},
    traits::DurableStoreError,
};

pub async fn insert_event(event: NewAuditEvent, conn: &mut SqliteConnection) -> Result<i64, DurableStoreError> {
    let details =
        serde_json::to_string(&event.details).map_err(|e| DurableStoreError::EncodingError(e.to_string()))?;
    let row = sqlx::query(
        r#"
            INSERT INTO audit_log (event_type, user_id, sku, reservation_id, details, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id;
        "#,
    )
    .bind(event.event_type.to_string())
    .bind(&event.user_id)
    .bind(&event.sku)
    .bind(event.reservation_id.as_ref().map(|id| id.as_str().to_string()))
    .bind(details)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    let id: i64 = row.try_get("id")?;
    trace!("🗃️ Audit event {} recorded with id {id}", event.event_type);
    Ok(id)
}

pub async fn events_for_reservation(
    reservation_id: &ReservationId,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEvent>, DurableStoreError> {
    let rows = sqlx::query(
        r#"
            SELECT id, event_type, user_id, sku, reservation_id, details, timestamp
            FROM audit_log WHERE reservation_id = $1 ORDER BY id ASC;
        "#,
    )
    .bind(reservation_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(row_to_event).collect()
}

pub async fn events_of_type(
    event_type: AuditEventType,
    conn: &mut SqliteConnection,
) -> Result<Vec<AuditEvent>, DurableStoreError> {
    let rows = sqlx::query(
        r#"
            SELECT id, event_type, user_id, sku, reservation_id, details, timestamp
            FROM audit_log WHERE event_type = $1 ORDER BY id ASC;
        "#,
    )
    .bind(event_type.to_string())
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(row_to_event).collect()
}

fn row_to_event(row: sqlx::sqlite::SqliteRow) -> Result<AuditEvent, DurableStoreError> {
    let event_type: String = row.try_get("event_type")?;
    let event_type = event_type.parse().map_err(|e: crate::db_types::StatusConversionError| {
        DurableStoreError::EncodingError(e.to_string())
    })?;
    let details: Option<String> = row.try_get("details")?;
    let details = match details {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| DurableStoreError::EncodingError(e.to_string()))?,
        None => serde_json::Value::Null,
    };
    let reservation_id: Option<String> = row.try_get("reservation_id")?;
    let timestamp: DateTime<Utc> = row.try_get("timestamp")?;
    Ok(AuditEvent {
        id: row.try_get("id")?,
        event_type,
        user_id: row.try_get("user_id")?,
        sku: row.try_get("sku")?,
        reservation_id: reservation_id.map(ReservationId::from),
        details,
        timestamp,
    })
}
