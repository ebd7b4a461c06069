use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::inventory::clock::Clock;
use crate::inventory::error::InventoryError;
use crate::models::Reservation;
use crate::store::InventoryStore;

/// TTL bounds applied to incoming hold requests.
#[derive(Debug, Clone, Copy)]
pub struct HoldPolicy {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::seconds(600),
            max_ttl: Duration::seconds(1800),
        }
    }
}

/// Short-lived, cancellable claims against availability. A hold makes other
/// buyers see reduced availability before a sale commits; it guarantees
/// nothing past its TTL, and a client whose hold lapsed must start over.
#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
    policy: HoldPolicy,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn InventoryStore>, clock: Arc<dyn Clock>, policy: HoldPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Places a hold for `quantity` units. Admission is checked against
    /// availability including every other active hold, atomically with the
    /// insert, so two buyers racing for the last unit get exactly one winner.
    pub async fn hold(
        &self,
        ticket_type_id: Uuid,
        holder_id: Uuid,
        quantity: i32,
        ttl: Option<Duration>,
    ) -> Result<Reservation, InventoryError> {
        if quantity < 1 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        let ttl = ttl
            .unwrap_or(self.policy.default_ttl)
            .max(Duration::seconds(1))
            .min(self.policy.max_ttl);
        let now = self.clock.now();

        self.store
            .insert_hold(ticket_type_id, holder_id, quantity, now, now + ttl)
            .await
    }

    /// Releases a hold early. Idempotent: releasing a reservation that is
    /// already terminal is a no-op.
    pub async fn release(&self, reservation_id: Uuid) -> Result<(), InventoryError> {
        self.store
            .release_hold(reservation_id, self.clock.now())
            .await
    }

    pub async fn reservation(&self, reservation_id: Uuid) -> Result<Reservation, InventoryError> {
        self.store.reservation(reservation_id).await
    }

    /// Transitions every overdue active hold to expired, returning its
    /// quantity to the available pool. Runs under the same atomicity
    /// guarantee as `hold`, so a sweep can never resurrect capacity that a
    /// concurrent allocation just committed. The stores also reconcile
    /// lazily on read, so the periodic sweep is a backstop, not the only
    /// expiry path.
    pub async fn sweep_expired(&self) -> Result<u64, InventoryError> {
        self.store.expire_due(self.clock.now()).await
    }

    /// Spawns the periodic sweep task.
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match manager.sweep_expired().await {
                    Ok(0) => {}
                    Ok(expired) => {
                        tracing::debug!(expired, "expired overdue holds");
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "hold sweep failed");
                    }
                }
            }
        })
    }
}
