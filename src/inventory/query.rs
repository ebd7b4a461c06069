use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

use crate::inventory::clock::Clock;
use crate::inventory::error::InventoryError;
use crate::store::InventoryStore;

/// Per-ticket-type availability as shown to buyers. Reflects committed sales
/// and live holds; a sold-out type lists with `available = 0` rather than
/// disappearing.
#[derive(Debug, Clone, Serialize)]
pub struct TicketTypeAvailability {
    pub ticket_type_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub available: i32,
}

/// A ticket joined with its order, ticket type, and event context, as needed
/// by the "my tickets" view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TicketDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_type_id: Uuid,
    pub owner_id: Uuid,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub ticket_type_name: String,
    pub unit_price: Decimal,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_location: String,
    pub event_starts_at: DateTime<Utc>,
}

/// One roster row for the organizer's attendee view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendeeRecord {
    pub ticket_id: Uuid,
    pub owner_id: Uuid,
    pub ticket_type_id: Uuid,
    pub ticket_type_name: String,
    pub order_id: Uuid,
    pub used: bool,
    pub purchased_at: DateTime<Utc>,
}

/// Read-only projection for the presentation layer. Only committed state is
/// visible; other users' reservations show up purely as reduced availability.
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
}

impl QueryFacade {
    pub fn new(store: Arc<dyn InventoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn list_availability(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<TicketTypeAvailability>, InventoryError> {
        let ticket_types = self
            .store
            .list_ticket_types(event_id, self.clock.now())
            .await?;

        Ok(ticket_types
            .into_iter()
            .map(|(ticket_type, availability)| TicketTypeAvailability {
                ticket_type_id: ticket_type.id,
                name: ticket_type.name,
                description: ticket_type.description,
                price: ticket_type.price,
                available: availability.available,
            })
            .collect())
    }

    /// Tickets owned by `user_id`, and nobody else's.
    pub async fn tickets_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<TicketDetail>, InventoryError> {
        self.store.tickets_for_user(user_id).await
    }

    /// Attendee roster for an event. Only the organizer may see it.
    pub async fn organizer_view(
        &self,
        event_id: Uuid,
        requester_id: Uuid,
    ) -> Result<Vec<AttendeeRecord>, InventoryError> {
        let event = self.store.event(event_id).await?;
        if event.organizer_id != requester_id {
            return Err(InventoryError::Forbidden(
                "only the event organizer may view attendees".to_string(),
            ));
        }
        self.store.attendees_for_event(event_id).await
    }
}
