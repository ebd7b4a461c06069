use thiserror::Error;
use uuid::Uuid;

use crate::models::ReservationState;

/// Failure taxonomy of the inventory core. Every variant is returned to the
/// caller as a typed result; none are swallowed, and a failing operation
/// leaves no partial writes behind.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("insufficient availability: requested {requested}, available {available}")]
    InsufficientAvailability { requested: i32, available: i32 },

    #[error("reservation {0} has expired")]
    ReservationExpired(Uuid),

    #[error("reservation {id} is already {state}")]
    ReservationAlreadyTerminal { id: Uuid, state: ReservationState },

    #[error("capacity exceeded for ticket type {ticket_type_id}: requested {requested} with {committed}/{total} committed")]
    CapacityExceeded {
        ticket_type_id: Uuid,
        requested: i32,
        committed: i32,
        total: i32,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("ticket {0} has already been used")]
    TicketAlreadyUsed(Uuid),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("storage error")]
    Storage(#[from] sqlx::Error),
}

impl InventoryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        InventoryError::NotFound(what.into())
    }
}
