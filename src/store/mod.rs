//! Storage backends for the inventory core.
//!
//! [`InventoryStore`] is the persistence seam: every method is one atomic
//! logical operation, so the read-check-write sequences on a ticket type's
//! counters can never interleave partway. [`MemoryStore`] serializes them
//! behind a mutex and backs the test suite and zero-infrastructure dev runs;
//! [`PgStore`] gets the same guarantees from guarded single-statement updates
//! and row locks inside Postgres transactions.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::inventory::error::InventoryError;
use crate::inventory::ledger::Availability;
use crate::inventory::query::{AttendeeRecord, TicketDetail};
use crate::models::{Event, Order, Reservation, Ticket, TicketType};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    // ------------------------------------------------------------------
    // Events and ticket types
    // ------------------------------------------------------------------

    async fn insert_event(&self, event: Event) -> Result<(), InventoryError>;

    async fn event(&self, event_id: Uuid) -> Result<Event, InventoryError>;

    async fn list_events(&self) -> Result<Vec<Event>, InventoryError>;

    async fn insert_ticket_type(&self, ticket_type: TicketType) -> Result<(), InventoryError>;

    async fn ticket_type(&self, ticket_type_id: Uuid) -> Result<TicketType, InventoryError>;

    /// Ticket types of an event with their current counters. Overdue holds
    /// are reconciled first so the availability never counts dead holds.
    async fn list_ticket_types(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<(TicketType, Availability)>, InventoryError>;

    /// Current counters for one ticket type, after reconciling overdue holds.
    async fn counters(
        &self,
        ticket_type_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Availability, InventoryError>;

    /// The ledger commit: increase the committed count by `quantity` if and
    /// only if it still fits under the total, as one atomic check-and-update.
    async fn commit_quantity(
        &self,
        ticket_type_id: Uuid,
        quantity: i32,
    ) -> Result<(), InventoryError>;

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    /// Admission plus insert in one atomic step: fails with
    /// `InsufficientAvailability` when `quantity` exceeds what is left after
    /// committed sales and every other active hold.
    async fn insert_hold(
        &self,
        ticket_type_id: Uuid,
        holder_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Reservation, InventoryError>;

    /// Active → Released. No-op for reservations already terminal.
    async fn release_hold(
        &self,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError>;

    /// Expires every active hold whose deadline has passed, returning the
    /// number of reservations flipped.
    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, InventoryError>;

    async fn reservation(&self, reservation_id: Uuid) -> Result<Reservation, InventoryError>;

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    /// The whole finalize sequence as one atomic unit: reservation to
    /// committed, counters moved from held to committed under the capacity
    /// guard, order inserted with the price snapshot, one ticket row per
    /// unit. Nothing is observable unless every step lands. Re-running after
    /// success returns the original order.
    async fn allocate(
        &self,
        reservation_id: Uuid,
        buyer_id: Uuid,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, InventoryError>;

    // ------------------------------------------------------------------
    // Read side and check-in
    // ------------------------------------------------------------------

    async fn order(&self, order_id: Uuid) -> Result<Order, InventoryError>;

    async fn tickets_for_user(&self, user_id: Uuid) -> Result<Vec<TicketDetail>, InventoryError>;

    async fn attendees_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendeeRecord>, InventoryError>;

    async fn ticket(&self, ticket_id: Uuid) -> Result<Ticket, InventoryError>;

    /// Flips the used flag. Checking in an already-used ticket fails with
    /// `TicketAlreadyUsed`; clearing the flag is unconditional (the caller is
    /// responsible for treating it as an audited override).
    async fn set_ticket_used(&self, ticket_id: Uuid, used: bool)
        -> Result<Ticket, InventoryError>;
}
