use std::sync::Arc;
use uuid::Uuid;

use crate::inventory::error::InventoryError;
use crate::models::Ticket;
use crate::store::InventoryStore;

/// Door operations: marking tickets used at entry. Only the organizer of the
/// ticket's parent event may check in or revert; a ticket goes unused→used at
/// most once, and the reverse direction is an audited override.
#[derive(Clone)]
pub struct Attendance {
    store: Arc<dyn InventoryStore>,
}

impl Attendance {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn check_in(
        &self,
        ticket_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Ticket, InventoryError> {
        self.authorize(ticket_id, requester_id).await?;
        self.store.set_ticket_used(ticket_id, true).await
    }

    /// Administrative undo of a check-in. Logged so the override leaves a
    /// trace even though it succeeds silently for the caller.
    pub async fn undo_check_in(
        &self,
        ticket_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Ticket, InventoryError> {
        self.authorize(ticket_id, requester_id).await?;
        let ticket = self.store.set_ticket_used(ticket_id, false).await?;
        tracing::warn!(
            %ticket_id,
            organizer_id = %requester_id,
            "check-in reverted by organizer override"
        );
        Ok(ticket)
    }

    async fn authorize(&self, ticket_id: Uuid, requester_id: Uuid) -> Result<(), InventoryError> {
        let ticket = self.store.ticket(ticket_id).await?;
        let ticket_type = self.store.ticket_type(ticket.ticket_type_id).await?;
        let event = self.store.event(ticket_type.event_id).await?;
        if event.organizer_id != requester_id {
            return Err(InventoryError::Forbidden(
                "only the event organizer may manage check-ins".to_string(),
            ));
        }
        Ok(())
    }
}
