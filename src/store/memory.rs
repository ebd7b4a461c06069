use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::inventory::error::InventoryError;
use crate::inventory::ledger::Availability;
use crate::inventory::query::{AttendeeRecord, TicketDetail};
use crate::models::{
    Event, Order, OrderLine, OrderStatus, Reservation, ReservationState, Ticket, TicketType,
};
use crate::store::InventoryStore;

/// In-memory backend. One mutex spans every logical operation, which makes
/// each of them trivially atomic and the whole store linearizable — the
/// reference behavior the Postgres backend reproduces with transactions.
///
/// Backs the test suite and zero-infrastructure development runs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    events: HashMap<Uuid, Event>,
    ticket_types: HashMap<Uuid, TicketType>,
    reservations: HashMap<Uuid, Reservation>,
    orders: HashMap<Uuid, Order>,
    order_by_reservation: HashMap<Uuid, Uuid>,
    tickets: HashMap<Uuid, Ticket>,
}

impl State {
    /// Expire-on-read: flip overdue active holds before any availability
    /// math, so dead holds never mask capacity. Scoped to one ticket type or
    /// the whole book.
    fn expire_due(&mut self, now: DateTime<Utc>, ticket_type_id: Option<Uuid>) -> u64 {
        let mut expired = 0;
        for reservation in self.reservations.values_mut() {
            let in_scope = ticket_type_id.map_or(true, |id| id == reservation.ticket_type_id);
            if in_scope && reservation.is_expired(now) {
                reservation.state = ReservationState::Expired;
                expired += 1;
            }
        }
        expired
    }

    /// Units under active hold for a ticket type. Callers reconcile expiry
    /// first.
    fn held(&self, ticket_type_id: Uuid) -> i32 {
        self.reservations
            .values()
            .filter(|r| r.ticket_type_id == ticket_type_id && r.state == ReservationState::Active)
            .map(|r| r.quantity)
            .sum()
    }

    fn availability(&self, ticket_type: &TicketType) -> Availability {
        Availability::new(
            ticket_type.total_quantity,
            ticket_type.committed_quantity,
            self.held(ticket_type.id),
        )
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned mutex only means another thread panicked mid-operation in a
    // test; the data itself is still usable.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn insert_event(&self, event: Event) -> Result<(), InventoryError> {
        self.state().events.insert(event.id, event);
        Ok(())
    }

    async fn event(&self, event_id: Uuid) -> Result<Event, InventoryError> {
        self.state()
            .events
            .get(&event_id)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(format!("event {event_id}")))
    }

    async fn list_events(&self) -> Result<Vec<Event>, InventoryError> {
        let mut events: Vec<Event> = self.state().events.values().cloned().collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn insert_ticket_type(&self, ticket_type: TicketType) -> Result<(), InventoryError> {
        let mut state = self.state();
        if !state.events.contains_key(&ticket_type.event_id) {
            return Err(InventoryError::not_found(format!(
                "event {}",
                ticket_type.event_id
            )));
        }
        state.ticket_types.insert(ticket_type.id, ticket_type);
        Ok(())
    }

    async fn ticket_type(&self, ticket_type_id: Uuid) -> Result<TicketType, InventoryError> {
        self.state()
            .ticket_types
            .get(&ticket_type_id)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(format!("ticket type {ticket_type_id}")))
    }

    async fn list_ticket_types(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<(TicketType, Availability)>, InventoryError> {
        let mut state = self.state();
        if !state.events.contains_key(&event_id) {
            return Err(InventoryError::not_found(format!("event {event_id}")));
        }
        state.expire_due(now, None);

        let mut ticket_types: Vec<TicketType> = state
            .ticket_types
            .values()
            .filter(|tt| tt.event_id == event_id)
            .cloned()
            .collect();
        ticket_types.sort_by_key(|tt| tt.created_at);

        Ok(ticket_types
            .into_iter()
            .map(|tt| {
                let availability = state.availability(&tt);
                (tt, availability)
            })
            .collect())
    }

    async fn counters(
        &self,
        ticket_type_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Availability, InventoryError> {
        let mut state = self.state();
        state.expire_due(now, Some(ticket_type_id));
        let ticket_type = state
            .ticket_types
            .get(&ticket_type_id)
            .ok_or_else(|| InventoryError::not_found(format!("ticket type {ticket_type_id}")))?;
        Ok(state.availability(ticket_type))
    }

    async fn commit_quantity(
        &self,
        ticket_type_id: Uuid,
        quantity: i32,
    ) -> Result<(), InventoryError> {
        let mut state = self.state();
        let ticket_type = state
            .ticket_types
            .get_mut(&ticket_type_id)
            .ok_or_else(|| InventoryError::not_found(format!("ticket type {ticket_type_id}")))?;

        if ticket_type.committed_quantity + quantity > ticket_type.total_quantity {
            return Err(InventoryError::CapacityExceeded {
                ticket_type_id,
                requested: quantity,
                committed: ticket_type.committed_quantity,
                total: ticket_type.total_quantity,
            });
        }
        ticket_type.committed_quantity += quantity;
        Ok(())
    }

    async fn insert_hold(
        &self,
        ticket_type_id: Uuid,
        holder_id: Uuid,
        quantity: i32,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Reservation, InventoryError> {
        let mut state = self.state();
        state.expire_due(now, Some(ticket_type_id));

        let ticket_type = state
            .ticket_types
            .get(&ticket_type_id)
            .ok_or_else(|| InventoryError::not_found(format!("ticket type {ticket_type_id}")))?;

        let availability = state.availability(ticket_type);
        if quantity > availability.available {
            return Err(InventoryError::InsufficientAvailability {
                requested: quantity,
                available: availability.available,
            });
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            ticket_type_id,
            holder_id,
            quantity,
            state: ReservationState::Active,
            created_at: now,
            expires_at,
        };
        state
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn release_hold(
        &self,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        let mut state = self.state();
        let Some(reservation) = state.reservations.get_mut(&reservation_id) else {
            return Err(InventoryError::not_found(format!(
                "reservation {reservation_id}"
            )));
        };

        if reservation.is_expired(now) {
            reservation.state = ReservationState::Expired;
            return Ok(());
        }
        if reservation.state == ReservationState::Active {
            reservation.state = ReservationState::Released;
        }
        Ok(())
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, InventoryError> {
        Ok(self.state().expire_due(now, None))
    }

    async fn reservation(&self, reservation_id: Uuid) -> Result<Reservation, InventoryError> {
        self.state()
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(format!("reservation {reservation_id}")))
    }

    async fn allocate(
        &self,
        reservation_id: Uuid,
        buyer_id: Uuid,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, InventoryError> {
        let mut state = self.state();

        let reservation = state
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(format!("reservation {reservation_id}")))?;

        match reservation.state {
            ReservationState::Committed => {
                // Retry after success: hand back the original order.
                let order_id = state.order_by_reservation.get(&reservation_id).copied();
                return order_id
                    .and_then(|id| state.orders.get(&id).cloned())
                    .ok_or(InventoryError::ReservationAlreadyTerminal {
                        id: reservation_id,
                        state: ReservationState::Committed,
                    });
            }
            ReservationState::Released => {
                return Err(InventoryError::ReservationAlreadyTerminal {
                    id: reservation_id,
                    state: ReservationState::Released,
                });
            }
            ReservationState::Expired => {
                return Err(InventoryError::ReservationExpired(reservation_id));
            }
            ReservationState::Active => {}
        }

        if reservation.is_expired(now) {
            if let Some(r) = state.reservations.get_mut(&reservation_id) {
                r.state = ReservationState::Expired;
            }
            return Err(InventoryError::ReservationExpired(reservation_id));
        }

        if reservation.holder_id != buyer_id {
            return Err(InventoryError::Forbidden(
                "reservation belongs to a different buyer".to_string(),
            ));
        }

        let ticket_type = state
            .ticket_types
            .get(&reservation.ticket_type_id)
            .cloned()
            .ok_or_else(|| {
                InventoryError::not_found(format!("ticket type {}", reservation.ticket_type_id))
            })?;

        // Every check happens before the first write, so a failure here
        // leaves the pre-call state fully intact.
        if ticket_type.committed_quantity + reservation.quantity > ticket_type.total_quantity {
            return Err(InventoryError::CapacityExceeded {
                ticket_type_id: ticket_type.id,
                requested: reservation.quantity,
                committed: ticket_type.committed_quantity,
                total: ticket_type.total_quantity,
            });
        }

        let order = Order {
            id: Uuid::new_v4(),
            buyer_id,
            reservation_id,
            status: OrderStatus::Completed,
            total_amount: ticket_type.price * Decimal::from(reservation.quantity),
            payment_reference: payment_reference.to_string(),
            created_at: now,
            lines: vec![OrderLine {
                ticket_type_id: ticket_type.id,
                quantity: reservation.quantity,
                unit_price: ticket_type.price,
            }],
        };

        if let Some(tt) = state.ticket_types.get_mut(&ticket_type.id) {
            tt.committed_quantity += reservation.quantity;
        }
        if let Some(r) = state.reservations.get_mut(&reservation_id) {
            r.state = ReservationState::Committed;
        }
        for _ in 0..reservation.quantity {
            let ticket = Ticket {
                id: Uuid::new_v4(),
                order_id: order.id,
                ticket_type_id: ticket_type.id,
                owner_id: buyer_id,
                used: false,
                created_at: now,
            };
            state.tickets.insert(ticket.id, ticket);
        }
        state.order_by_reservation.insert(reservation_id, order.id);
        state.orders.insert(order.id, order.clone());

        Ok(order)
    }

    async fn order(&self, order_id: Uuid) -> Result<Order, InventoryError> {
        self.state()
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(format!("order {order_id}")))
    }

    async fn tickets_for_user(&self, user_id: Uuid) -> Result<Vec<TicketDetail>, InventoryError> {
        let state = self.state();
        let mut details: Vec<TicketDetail> = state
            .tickets
            .values()
            .filter(|t| t.owner_id == user_id)
            .filter_map(|t| {
                let ticket_type = state.ticket_types.get(&t.ticket_type_id)?;
                let event = state.events.get(&ticket_type.event_id)?;
                Some(TicketDetail {
                    id: t.id,
                    order_id: t.order_id,
                    ticket_type_id: t.ticket_type_id,
                    owner_id: t.owner_id,
                    used: t.used,
                    created_at: t.created_at,
                    ticket_type_name: ticket_type.name.clone(),
                    unit_price: ticket_type.price,
                    event_id: event.id,
                    event_title: event.title.clone(),
                    event_location: event.location.clone(),
                    event_starts_at: event.starts_at,
                })
            })
            .collect();
        details.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(details)
    }

    async fn attendees_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendeeRecord>, InventoryError> {
        let state = self.state();
        if !state.events.contains_key(&event_id) {
            return Err(InventoryError::not_found(format!("event {event_id}")));
        }
        let mut roster: Vec<AttendeeRecord> = state
            .tickets
            .values()
            .filter_map(|t| {
                let ticket_type = state.ticket_types.get(&t.ticket_type_id)?;
                (ticket_type.event_id == event_id).then(|| AttendeeRecord {
                    ticket_id: t.id,
                    owner_id: t.owner_id,
                    ticket_type_id: t.ticket_type_id,
                    ticket_type_name: ticket_type.name.clone(),
                    order_id: t.order_id,
                    used: t.used,
                    purchased_at: t.created_at,
                })
            })
            .collect();
        roster.sort_by_key(|r| r.purchased_at);
        Ok(roster)
    }

    async fn ticket(&self, ticket_id: Uuid) -> Result<Ticket, InventoryError> {
        self.state()
            .tickets
            .get(&ticket_id)
            .cloned()
            .ok_or_else(|| InventoryError::not_found(format!("ticket {ticket_id}")))
    }

    async fn set_ticket_used(
        &self,
        ticket_id: Uuid,
        used: bool,
    ) -> Result<Ticket, InventoryError> {
        let mut state = self.state();
        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| InventoryError::not_found(format!("ticket {ticket_id}")))?;

        if used && ticket.used {
            return Err(InventoryError::TicketAlreadyUsed(ticket_id));
        }
        ticket.used = used;
        Ok(ticket.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event(organizer_id: Uuid) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            organizer_id,
            title: "Warehouse Live".to_string(),
            description: None,
            location: "12 Dock Rd".to_string(),
            latitude: 51.5,
            longitude: -0.08,
            starts_at: now + Duration::days(7),
            ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_ticket_type(event_id: Uuid, total: i32) -> TicketType {
        let now = Utc::now();
        TicketType {
            id: Uuid::new_v4(),
            event_id,
            name: "General".to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            total_quantity: total,
            committed_quantity: 0,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed(store: &MemoryStore, total: i32) -> (Event, TicketType) {
        let event = sample_event(Uuid::new_v4());
        let ticket_type = sample_ticket_type(event.id, total);
        store.insert_event(event.clone()).await.unwrap();
        store
            .insert_ticket_type(ticket_type.clone())
            .await
            .unwrap();
        (event, ticket_type)
    }

    #[tokio::test]
    async fn hold_admission_counts_other_active_holds() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 5).await;
        let now = Utc::now();
        let expires = now + Duration::minutes(10);

        store
            .insert_hold(tt.id, Uuid::new_v4(), 3, now, expires)
            .await
            .unwrap();

        let err = store
            .insert_hold(tt.id, Uuid::new_v4(), 3, now, expires)
            .await
            .unwrap_err();
        match err {
            InventoryError::InsufficientAvailability {
                requested,
                available,
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn commit_quantity_is_guarded() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 3).await;

        store.commit_quantity(tt.id, 3).await.unwrap();
        let err = store.commit_quantity(tt.id, 1).await.unwrap_err();
        assert!(matches!(err, InventoryError::CapacityExceeded { .. }));

        let counters = store.counters(tt.id, Utc::now()).await.unwrap();
        assert_eq!(counters.committed, 3);
        assert_eq!(counters.available, 0);
    }

    #[tokio::test]
    async fn release_is_idempotent_and_frees_capacity() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 2).await;
        let now = Utc::now();

        let hold = store
            .insert_hold(tt.id, Uuid::new_v4(), 2, now, now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(store.counters(tt.id, now).await.unwrap().available, 0);

        store.release_hold(hold.id, now).await.unwrap();
        store.release_hold(hold.id, now).await.unwrap();

        let reservation = store.reservation(hold.id).await.unwrap();
        assert_eq!(reservation.state, ReservationState::Released);
        assert_eq!(store.counters(tt.id, now).await.unwrap().available, 2);
    }

    #[tokio::test]
    async fn expire_due_flips_only_overdue_active_holds() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 10).await;
        let now = Utc::now();

        let short = store
            .insert_hold(tt.id, Uuid::new_v4(), 2, now, now + Duration::seconds(30))
            .await
            .unwrap();
        let long = store
            .insert_hold(tt.id, Uuid::new_v4(), 3, now, now + Duration::minutes(30))
            .await
            .unwrap();

        let later = now + Duration::seconds(31);
        assert_eq!(store.expire_due(later).await.unwrap(), 1);
        assert_eq!(
            store.reservation(short.id).await.unwrap().state,
            ReservationState::Expired
        );
        assert_eq!(
            store.reservation(long.id).await.unwrap().state,
            ReservationState::Active
        );
        assert_eq!(store.counters(tt.id, later).await.unwrap().held, 3);
    }

    #[tokio::test]
    async fn allocate_moves_held_to_committed_and_mints_tickets() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 5).await;
        let buyer = Uuid::new_v4();
        let now = Utc::now();

        let hold = store
            .insert_hold(tt.id, buyer, 2, now, now + Duration::minutes(5))
            .await
            .unwrap();
        let order = store
            .allocate(hold.id, buyer, "pay-001", now)
            .await
            .unwrap();

        assert_eq!(order.total_amount, Decimal::new(5000, 2));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.lines[0].unit_price, Decimal::new(2500, 2));

        let counters = store.counters(tt.id, now).await.unwrap();
        assert_eq!(counters.committed, 2);
        assert_eq!(counters.held, 0);
        assert_eq!(counters.available, 3);

        let tickets = store.tickets_for_user(buyer).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.order_id == order.id && !t.used));
    }

    #[tokio::test]
    async fn allocate_rejects_a_different_buyer_without_side_effects() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 5).await;
        let holder = Uuid::new_v4();
        let now = Utc::now();

        let hold = store
            .insert_hold(tt.id, holder, 2, now, now + Duration::minutes(5))
            .await
            .unwrap();
        let err = store
            .allocate(hold.id, Uuid::new_v4(), "pay-002", now)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Forbidden(_)));

        let reservation = store.reservation(hold.id).await.unwrap();
        assert_eq!(reservation.state, ReservationState::Active);
        assert_eq!(store.counters(tt.id, now).await.unwrap().committed, 0);
    }

    #[tokio::test]
    async fn failed_allocate_leaves_no_order_ticket_or_ledger_change() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 2).await;
        let buyer = Uuid::new_v4();
        let now = Utc::now();

        let hold = store
            .insert_hold(tt.id, buyer, 2, now, now + Duration::minutes(5))
            .await
            .unwrap();
        // Drain capacity behind the reservation's back so the allocation's
        // final guard has to fire.
        store.commit_quantity(tt.id, 2).await.unwrap();

        let err = store.allocate(hold.id, buyer, "pay-003", now).await.unwrap_err();
        assert!(matches!(err, InventoryError::CapacityExceeded { .. }));

        let reservation = store.reservation(hold.id).await.unwrap();
        assert_eq!(reservation.state, ReservationState::Active);
        assert!(store.tickets_for_user(buyer).await.unwrap().is_empty());
        assert_eq!(store.counters(tt.id, now).await.unwrap().committed, 2);
    }

    #[tokio::test]
    async fn check_in_transitions_once() {
        let store = MemoryStore::new();
        let (_, tt) = seed(&store, 1).await;
        let buyer = Uuid::new_v4();
        let now = Utc::now();

        let hold = store
            .insert_hold(tt.id, buyer, 1, now, now + Duration::minutes(5))
            .await
            .unwrap();
        store.allocate(hold.id, buyer, "pay-004", now).await.unwrap();
        let ticket_id = store.tickets_for_user(buyer).await.unwrap()[0].id;

        let ticket = store.set_ticket_used(ticket_id, true).await.unwrap();
        assert!(ticket.used);

        let err = store.set_ticket_used(ticket_id, true).await.unwrap_err();
        assert!(matches!(err, InventoryError::TicketAlreadyUsed(_)));

        let ticket = store.set_ticket_used(ticket_id, false).await.unwrap();
        assert!(!ticket.used);
    }
}
