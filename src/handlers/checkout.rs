use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Duration;
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::AuthUser;
use crate::inventory::InventoryError;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success};

#[derive(Deserialize)]
pub struct HoldRequest {
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub ttl_seconds: Option<u64>,
}

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub reservation_id: Uuid,
    pub payment_reference: String,
}

pub async fn create_hold(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<HoldRequest>,
) -> Result<Response, AppError> {
    let ttl = req.ttl_seconds.map(|secs| Duration::seconds(secs as i64));
    let reservation = state
        .reservations
        .hold(req.ticket_type_id, user_id, req.quantity, ttl)
        .await?;
    Ok(created(reservation, "Hold placed"))
}

pub async fn release_hold(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<Response, AppError> {
    // Releasing someone else's hold is not a thing; releasing a hold that is
    // already gone is fine (idempotent).
    match state.reservations.reservation(reservation_id).await {
        Ok(reservation) if reservation.holder_id != user_id => {
            return Err(AppError::Inventory(InventoryError::Forbidden(
                "hold belongs to a different user".to_string(),
            )));
        }
        Err(InventoryError::NotFound(_)) => {
            return Ok(empty_success("Hold released"));
        }
        Err(other) => return Err(other.into()),
        Ok(_) => {}
    }

    state.reservations.release(reservation_id).await?;
    Ok(empty_success("Hold released"))
}

pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(buyer_id): AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<Response, AppError> {
    if req.payment_reference.trim().is_empty() {
        return Err(AppError::Validation(
            "payment_reference must not be empty".to_string(),
        ));
    }

    let order = state
        .allocation
        .allocate(req.reservation_id, buyer_id, &req.payment_reference)
        .await?;
    Ok(created(order, "Order completed"))
}
