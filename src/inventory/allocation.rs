use std::sync::Arc;
use uuid::Uuid;

use crate::inventory::clock::Clock;
use crate::inventory::error::InventoryError;
use crate::models::Order;
use crate::store::InventoryStore;

/// Converts a still-active, unexpired reservation into an order plus its
/// individual tickets — exactly once, with no partial effect on failure.
///
/// The store performs the whole sequence (reservation to committed, ledger
/// commit, order insert, ticket inserts) as one atomic unit; a retry after
/// success returns the original order rather than minting a duplicate.
#[derive(Clone)]
pub struct AllocationEngine {
    store: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
}

impl AllocationEngine {
    pub fn new(store: Arc<dyn InventoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn allocate(
        &self,
        reservation_id: Uuid,
        buyer_id: Uuid,
        payment_reference: &str,
    ) -> Result<Order, InventoryError> {
        let result = self
            .store
            .allocate(reservation_id, buyer_id, payment_reference, self.clock.now())
            .await;

        if let Err(error @ InventoryError::CapacityExceeded { .. }) = &result {
            // A correctly admitted hold reserves its capacity up front, so the
            // ledger rejecting the commit afterwards means the counters and
            // the reservation book disagree.
            tracing::error!(
                %reservation_id,
                %buyer_id,
                error = %error,
                "ledger rejected a commit backed by a live reservation"
            );
        }

        result
    }
}
