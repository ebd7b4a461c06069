use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::handlers::AuthUser;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn my_tickets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Response, AppError> {
    let tickets = state.queries.tickets_for_user(user_id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn check_in(
    State(state): State<AppState>,
    AuthUser(requester_id): AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state.attendance.check_in(ticket_id, requester_id).await?;
    Ok(success(ticket, "Ticket checked in"))
}

pub async fn undo_check_in(
    State(state): State<AppState>,
    AuthUser(requester_id): AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state
        .attendance
        .undo_check_in(ticket_id, requester_id)
        .await?;
    Ok(success(ticket, "Check-in reverted"))
}
