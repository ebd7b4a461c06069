use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool, Postgres};
use sqlx::{FromRow, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::inventory::error::InventoryError;
use crate::inventory::ledger::Availability;
use crate::inventory::query::{AttendeeRecord, TicketDetail};
use crate::models::{
    Event, Order, OrderLine, OrderStatus, Reservation, ReservationState, Ticket, TicketType,
};
use crate::store::InventoryStore;

/// Postgres backend. Atomicity comes from guarded single-statement updates on
/// the ticket type counters (the capacity check and the increment are one
/// `UPDATE ... WHERE` round trip) plus `SELECT ... FOR UPDATE` on reservation
/// rows, all inside one transaction per logical operation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ReservationRow {
    id: Uuid,
    ticket_type_id: Uuid,
    holder_id: Uuid,
    quantity: i32,
    state: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ReservationRow {
    fn into_model(self) -> Result<Reservation, InventoryError> {
        let state = parse_state(&self.state)?;
        Ok(Reservation {
            id: self.id,
            ticket_type_id: self.ticket_type_id,
            holder_id: self.holder_id,
            quantity: self.quantity,
            state,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    reservation_id: Uuid,
    status: String,
    total_amount: Decimal,
    payment_reference: String,
    created_at: DateTime<Utc>,
}

fn parse_state(raw: &str) -> Result<ReservationState, InventoryError> {
    raw.parse::<ReservationState>()
        .map_err(|e| InventoryError::Storage(sqlx::Error::Decode(e.into())))
}

fn parse_status(raw: &str) -> Result<OrderStatus, InventoryError> {
    raw.parse::<OrderStatus>()
        .map_err(|e| InventoryError::Storage(sqlx::Error::Decode(e.into())))
}

const SELECT_TICKET_TYPE: &str = "SELECT id, event_id, name, description, price, total_quantity, \
     committed_quantity, created_at, updated_at FROM ticket_types";

const SELECT_RESERVATION: &str = "SELECT id, ticket_type_id, holder_id, quantity, state, \
     created_at, expires_at FROM reservations";

/// Expires overdue active holds for one ticket type and hands their quantity
/// back, inside the caller's transaction. Concurrent sweeps serialize on the
/// reservation row locks, so a hold is only ever counted back once.
async fn expire_for_ticket_type(
    tx: &mut Transaction<'_, Postgres>,
    ticket_type_id: Uuid,
    now: DateTime<Utc>,
) -> Result<u64, InventoryError> {
    let freed: Vec<(i32,)> = sqlx::query_as(
        "UPDATE reservations SET state = 'expired' \
         WHERE ticket_type_id = $1 AND state = 'active' AND expires_at <= $2 \
         RETURNING quantity",
    )
    .bind(ticket_type_id)
    .bind(now)
    .fetch_all(&mut **tx)
    .await?;

    let total: i64 = freed.iter().map(|(q,)| i64::from(*q)).sum();
    if total > 0 {
        sqlx::query("UPDATE ticket_types SET held_quantity = held_quantity - $1 WHERE id = $2")
            .bind(total as i32)
            .bind(ticket_type_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(freed.len() as u64)
}

async fn fetch_order(
    conn: &mut PgConnection,
    where_sql: &str,
    id: Uuid,
) -> Result<Option<Order>, InventoryError> {
    let sql = format!(
        "SELECT id, buyer_id, reservation_id, status, total_amount, payment_reference, \
         created_at FROM orders WHERE {where_sql} = $1"
    );
    let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let lines: Vec<(Uuid, i32, Decimal)> = sqlx::query_as(
        "SELECT ticket_type_id, quantity, unit_price FROM order_lines WHERE order_id = $1",
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Order {
        id: row.id,
        buyer_id: row.buyer_id,
        reservation_id: row.reservation_id,
        status: parse_status(&row.status)?,
        total_amount: row.total_amount,
        payment_reference: row.payment_reference,
        created_at: row.created_at,
        lines: lines
            .into_iter()
            .map(|(ticket_type_id, quantity, unit_price)| OrderLine {
                ticket_type_id,
                quantity,
                unit_price,
            })
            .collect(),
    }))
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn insert_event(&self, event: Event) -> Result<(), InventoryError> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, location, latitude, \
             longitude, starts_at, ends_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn event(&self, event_id: Uuid) -> Result<Event, InventoryError> {
        sqlx::query_as::<_, Event>(
            "SELECT id, organizer_id, title, description, location, latitude, longitude, \
             starts_at, ends_at, created_at, updated_at FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| InventoryError::not_found(format!("event {event_id}")))
    }

    async fn list_events(&self) -> Result<Vec<Event>, InventoryError> {
        Ok(sqlx::query_as::<_, Event>(
            "SELECT id, organizer_id, title, description, location, latitude, longitude, \
             starts_at, ends_at, created_at, updated_at FROM events ORDER BY starts_at",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_ticket_type(&self, ticket_type: TicketType) -> Result<(), InventoryError> {
        let event_exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM events WHERE id = $1")
            .bind(ticket_type.event_id)
            .fetch_optional(&self.pool)
            .await?;
        if event_exists.is_none() {
            return Err(InventoryError::not_found(format!(
                "event {}",
                ticket_type.event_id
            )));
        }

        sqlx::query(
            "INSERT INTO ticket_types (id, event_id, name, description, price, total_quantity, \
             committed_quantity, held_quantity, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9)",
        )
        .bind(ticket_type.id)
        .bind(ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.price)
        .bind(ticket_type.total_quantity)
        .bind(ticket_type.committed_quantity)
        .bind(ticket_type.created_at)
        .bind(ticket_type.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ticket_type(&self, ticket_type_id: Uuid) -> Result<TicketType, InventoryError> {
        sqlx::query_as::<_, TicketType>(&format!("{SELECT_TICKET_TYPE} WHERE id = $1"))
            .bind(ticket_type_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| InventoryError::not_found(format!("ticket type {ticket_type_id}")))
    }

    async fn list_ticket_types(
        &self,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<(TicketType, Availability)>, InventoryError> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM ticket_types WHERE event_id = $1 ORDER BY created_at")
                .bind(event_id)
                .fetch_all(&mut *tx)
                .await?;

        if ids.is_empty() {
            let event_exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM events WHERE id = $1")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
            if event_exists.is_none() {
                return Err(InventoryError::not_found(format!("event {event_id}")));
            }
        }

        for (ticket_type_id,) in &ids {
            expire_for_ticket_type(&mut tx, *ticket_type_id, now).await?;
        }

        let mut out = Vec::with_capacity(ids.len());
        for (ticket_type_id,) in ids {
            let ticket_type =
                sqlx::query_as::<_, TicketType>(&format!("{SELECT_TICKET_TYPE} WHERE id = $1"))
                    .bind(ticket_type_id)
                    .fetch_one(&mut *tx)
                    .await?;
            let (held,): (i32,) =
                sqlx::query_as("SELECT held_quantity FROM ticket_types WHERE id = $1")
                    .bind(ticket_type_id)
                    .fetch_one(&mut *tx)
                    .await?;
            let availability = Availability::new(
                ticket_type.total_quantity,
                ticket_type.committed_quantity,
                held,
            );
            out.push((ticket_type, availability));
        }

        tx.commit().await?;
        Ok(out)
    }

    async fn counters(
        &self,
        ticket_type_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Availability, InventoryError> {
        let mut tx = self.pool.begin().await?;
        expire_for_ticket_type(&mut tx, ticket_type_id, now).await?;

        let row: Option<(i32, i32, i32)> = sqlx::query_as(
            "SELECT total_quantity, committed_quantity, held_quantity FROM ticket_types \
             WHERE id = $1",
        )
        .bind(ticket_type_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (total, committed, held) = row
            .ok_or_else(|| InventoryError::not_found(format!("ticket type {ticket_type_id}")))?;
        tx.commit().await?;
        Ok(Availability::new(total, committed, held))
    }

    async fn commit_quantity(
        &self,
        ticket_type_id: Uuid,
        quantity: i32,
    ) -> Result<(), InventoryError> {
        // The capacity check and the increment are one conditional statement;
        // two racing commits cannot both pass on a stale read.
        let updated = sqlx::query(
            "UPDATE ticket_types SET committed_quantity = committed_quantity + $1, \
             updated_at = now() \
             WHERE id = $2 AND committed_quantity + $1 <= total_quantity",
        )
        .bind(quantity)
        .bind(ticket_type_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let row: Option<(i32, i32)> = sqlx::query_as(
                "SELECT committed_quantity, total_quantity FROM ticket_types WHERE id = $1",
            )
            .bind(ticket_type_id)
            .fetch_optional(&self.pool)
            .await?;
            return match row {
                None => Err(InventoryError::not_found(format!(
                    "ticket type {ticket_type_id}"
                ))),
                Some((committed, total)) => Err(InventoryError::CapacityExceeded {
                    ticket_type_id,
                    requested: quantity,
                    committed,
                    total,
                }),
            };
        }
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
        let mut tx = self.pool.begin().await?;
        expire_for_ticket_type(&mut tx, ticket_type_id, now).await?;

        let claimed = sqlx::query(
            "UPDATE ticket_types SET held_quantity = held_quantity + $1, updated_at = $2 \
             WHERE id = $3 \
             AND total_quantity - committed_quantity - held_quantity >= $1",
        )
        .bind(quantity)
        .bind(now)
        .bind(ticket_type_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let row: Option<(i32, i32, i32)> = sqlx::query_as(
                "SELECT total_quantity, committed_quantity, held_quantity FROM ticket_types \
                 WHERE id = $1",
            )
            .bind(ticket_type_id)
            .fetch_optional(&mut *tx)
            .await?;
            return match row {
                None => Err(InventoryError::not_found(format!(
                    "ticket type {ticket_type_id}"
                ))),
                Some((total, committed, held)) => {
                    Err(InventoryError::InsufficientAvailability {
                        requested: quantity,
                        available: total - committed - held,
                    })
                }
            };
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
        sqlx::query(
            "INSERT INTO reservations (id, ticket_type_id, holder_id, quantity, state, \
             created_at, expires_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reservation.id)
        .bind(reservation.ticket_type_id)
        .bind(reservation.holder_id)
        .bind(reservation.quantity)
        .bind(reservation.state.as_str())
        .bind(reservation.created_at)
        .bind(reservation.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation)
    }

    async fn release_hold(
        &self,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_RESERVATION} WHERE id = $1 FOR UPDATE"
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| InventoryError::not_found(format!("reservation {reservation_id}")))?;

        let reservation = row.into_model()?;
        if reservation.state != ReservationState::Active {
            return Ok(());
        }

        let next_state = if reservation.expires_at <= now {
            ReservationState::Expired
        } else {
            ReservationState::Released
        };
        sqlx::query("UPDATE reservations SET state = $1 WHERE id = $2")
            .bind(next_state.as_str())
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE ticket_types SET held_quantity = held_quantity - $1 WHERE id = $2")
            .bind(reservation.quantity)
            .bind(reservation.ticket_type_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, InventoryError> {
        let mut tx = self.pool.begin().await?;

        let expired: Vec<(Uuid, i32)> = sqlx::query_as(
            "UPDATE reservations SET state = 'expired' \
             WHERE state = 'active' AND expires_at <= $1 \
             RETURNING ticket_type_id, quantity",
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        let mut freed: HashMap<Uuid, i64> = HashMap::new();
        for (ticket_type_id, quantity) in &expired {
            *freed.entry(*ticket_type_id).or_default() += i64::from(*quantity);
        }
        for (ticket_type_id, quantity) in freed {
            sqlx::query(
                "UPDATE ticket_types SET held_quantity = held_quantity - $1 WHERE id = $2",
            )
            .bind(quantity as i32)
            .bind(ticket_type_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(expired.len() as u64)
    }

    async fn reservation(&self, reservation_id: Uuid) -> Result<Reservation, InventoryError> {
        sqlx::query_as::<_, ReservationRow>(&format!("{SELECT_RESERVATION} WHERE id = $1"))
            .bind(reservation_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| InventoryError::not_found(format!("reservation {reservation_id}")))?
            .into_model()
    }

    async fn allocate(
        &self,
        reservation_id: Uuid,
        buyer_id: Uuid,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, InventoryError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes competing allocations (and sweeps) of the same
        // reservation for the rest of the transaction.
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{SELECT_RESERVATION} WHERE id = $1 FOR UPDATE"
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| InventoryError::not_found(format!("reservation {reservation_id}")))?;
        let reservation = row.into_model()?;

        match reservation.state {
            ReservationState::Committed => {
                // Retry after success: hand back the original order.
                let order = fetch_order(&mut *tx, "reservation_id", reservation_id).await?;
                tx.commit().await?;
                return order.ok_or(InventoryError::ReservationAlreadyTerminal {
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

        if reservation.expires_at <= now {
            sqlx::query("UPDATE reservations SET state = 'expired' WHERE id = $1")
                .bind(reservation_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "UPDATE ticket_types SET held_quantity = held_quantity - $1 WHERE id = $2",
            )
            .bind(reservation.quantity)
            .bind(reservation.ticket_type_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Err(InventoryError::ReservationExpired(reservation_id));
        }

        if reservation.holder_id != buyer_id {
            return Err(InventoryError::Forbidden(
                "reservation belongs to a different buyer".to_string(),
            ));
        }

        let moved = sqlx::query(
            "UPDATE ticket_types SET committed_quantity = committed_quantity + $1, \
             held_quantity = held_quantity - $1, updated_at = $2 \
             WHERE id = $3 AND committed_quantity + $1 <= total_quantity",
        )
        .bind(reservation.quantity)
        .bind(now)
        .bind(reservation.ticket_type_id)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            let row: Option<(i32, i32)> = sqlx::query_as(
                "SELECT committed_quantity, total_quantity FROM ticket_types WHERE id = $1",
            )
            .bind(reservation.ticket_type_id)
            .fetch_optional(&mut *tx)
            .await?;
            // Dropping the transaction rolls everything back.
            return match row {
                None => Err(InventoryError::not_found(format!(
                    "ticket type {}",
                    reservation.ticket_type_id
                ))),
                Some((committed, total)) => Err(InventoryError::CapacityExceeded {
                    ticket_type_id: reservation.ticket_type_id,
                    requested: reservation.quantity,
                    committed,
                    total,
                }),
            };
        }

        sqlx::query("UPDATE reservations SET state = 'committed' WHERE id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await?;

        let (unit_price,): (Decimal,) =
            sqlx::query_as("SELECT price FROM ticket_types WHERE id = $1")
                .bind(reservation.ticket_type_id)
                .fetch_one(&mut *tx)
                .await?;

        let order = Order {
            id: Uuid::new_v4(),
            buyer_id,
            reservation_id,
            status: OrderStatus::Completed,
            total_amount: unit_price * Decimal::from(reservation.quantity),
            payment_reference: payment_reference.to_string(),
            created_at: now,
            lines: vec![OrderLine {
                ticket_type_id: reservation.ticket_type_id,
                quantity: reservation.quantity,
                unit_price,
            }],
        };

        sqlx::query(
            "INSERT INTO orders (id, buyer_id, reservation_id, status, total_amount, \
             payment_reference, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order.id)
        .bind(order.buyer_id)
        .bind(order.reservation_id)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(&order.payment_reference)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO order_lines (id, order_id, ticket_type_id, quantity, unit_price) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(reservation.ticket_type_id)
        .bind(reservation.quantity)
        .bind(unit_price)
        .execute(&mut *tx)
        .await?;

        for _ in 0..reservation.quantity {
            sqlx::query(
                "INSERT INTO tickets (id, order_id, ticket_type_id, owner_id, used, created_at) \
                 VALUES ($1, $2, $3, $4, FALSE, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(reservation.ticket_type_id)
            .bind(buyer_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    async fn order(&self, order_id: Uuid) -> Result<Order, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut *conn, "id", order_id)
            .await?
            .ok_or_else(|| InventoryError::not_found(format!("order {order_id}")))
    }

    async fn tickets_for_user(&self, user_id: Uuid) -> Result<Vec<TicketDetail>, InventoryError> {
        Ok(sqlx::query_as::<_, TicketDetail>(
            "SELECT t.id, t.order_id, t.ticket_type_id, t.owner_id, t.used, t.created_at, \
             tt.name AS ticket_type_name, tt.price AS unit_price, \
             e.id AS event_id, e.title AS event_title, e.location AS event_location, \
             e.starts_at AS event_starts_at \
             FROM tickets t \
             JOIN ticket_types tt ON tt.id = t.ticket_type_id \
             JOIN events e ON e.id = tt.event_id \
             WHERE t.owner_id = $1 \
             ORDER BY t.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn attendees_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendeeRecord>, InventoryError> {
        let event_exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        if event_exists.is_none() {
            return Err(InventoryError::not_found(format!("event {event_id}")));
        }

        Ok(sqlx::query_as::<_, AttendeeRecord>(
            "SELECT t.id AS ticket_id, t.owner_id, t.ticket_type_id, \
             tt.name AS ticket_type_name, t.order_id, t.used, t.created_at AS purchased_at \
             FROM tickets t \
             JOIN ticket_types tt ON tt.id = t.ticket_type_id \
             WHERE tt.event_id = $1 \
             ORDER BY t.created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn ticket(&self, ticket_id: Uuid) -> Result<Ticket, InventoryError> {
        sqlx::query_as::<_, Ticket>(
            "SELECT id, order_id, ticket_type_id, owner_id, used, created_at FROM tickets \
             WHERE id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| InventoryError::not_found(format!("ticket {ticket_id}")))
    }

    async fn set_ticket_used(
        &self,
        ticket_id: Uuid,
        used: bool,
    ) -> Result<Ticket, InventoryError> {
        let sql = if used {
            // Guarded flip: a ticket goes unused→used at most once.
            "UPDATE tickets SET used = TRUE WHERE id = $1 AND used = FALSE \
             RETURNING id, order_id, ticket_type_id, owner_id, used, created_at"
        } else {
            "UPDATE tickets SET used = FALSE WHERE id = $1 \
             RETURNING id, order_id, ticket_type_id, owner_id, used, created_at"
        };

        let updated = sqlx::query_as::<_, Ticket>(sql)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(ticket) => Ok(ticket),
            None => {
                let exists: Option<(bool,)> =
                    sqlx::query_as("SELECT used FROM tickets WHERE id = $1")
                        .bind(ticket_id)
                        .fetch_optional(&self.pool)
                        .await?;
                match exists {
                    Some(_) => Err(InventoryError::TicketAlreadyUsed(ticket_id)),
                    None => Err(InventoryError::not_found(format!("ticket {ticket_id}"))),
                }
            }
        }
    }
}
