use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::inventory::clock::Clock;
use crate::inventory::error::InventoryError;
use crate::store::InventoryStore;

/// Snapshot of a ticket type's capacity accounting.
///
/// `available = total - committed - held`; expired holds are reconciled by
/// the store before this is computed, so the numbers never count dead holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub total: i32,
    pub committed: i32,
    pub held: i32,
    pub available: i32,
}

impl Availability {
    pub fn new(total: i32, committed: i32, held: i32) -> Self {
        Self {
            total,
            committed,
            held,
            available: total - committed - held,
        }
    }
}

/// Authoritative capacity accounting per ticket type. The committed count
/// only ever moves through [`Ledger::commit`]; holds are the reservation
/// manager's business and enter the picture here as reduced availability.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(store: Arc<dyn InventoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn availability(&self, ticket_type_id: Uuid) -> Result<Availability, InventoryError> {
        self.store.counters(ticket_type_id, self.clock.now()).await
    }

    /// Atomically increases the committed count. The capacity check and the
    /// increment are a single guarded update in the store, so two concurrent
    /// commits can never both squeeze past a stale read. Normally invoked by
    /// the allocation engine as one step of finalizing a reservation.
    pub async fn commit(&self, ticket_type_id: Uuid, quantity: i32) -> Result<(), InventoryError> {
        if quantity < 1 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        self.store.commit_quantity(ticket_type_id, quantity).await
    }
}
