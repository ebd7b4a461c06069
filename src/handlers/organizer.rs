use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::handlers::AuthUser;
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn list_attendees(
    State(state): State<AppState>,
    AuthUser(requester_id): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let roster = state
        .queries
        .organizer_view(event_id, requester_id)
        .await?;
    Ok(success(roster, "Attendees retrieved"))
}
