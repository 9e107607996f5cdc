use crate::{
    db_types::{AuditEvent, AuditEventType, NewAuditEvent, ReservationId},
    traits::{AuditLogging, DurableStoreError},
};

/// An audit sink that drops everything. Used by tests that only exercise hot-state behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLog;

impl AuditLogging for NullAuditLog {
    async fn record_event(&self, _event: NewAuditEvent) -> Result<i64, DurableStoreError> {
        Ok(0)
    }

    async fn events_for_reservation(&self, _id: &ReservationId) -> Result<Vec<AuditEvent>, DurableStoreError> {
        Ok(Vec::new())
    }

    async fn events_of_type(&self, _event_type: AuditEventType) -> Result<Vec<AuditEvent>, DurableStoreError> {
        Ok(Vec::new())
    }
}
