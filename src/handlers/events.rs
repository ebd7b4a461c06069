use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::AuthUser;
use crate::inventory::{Clock, TicketTypeAvailability};
use crate::models::{Event, TicketType};
use crate::routes::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ticket_types: Vec<CreateTicketTypeRequest>,
}

#[derive(Deserialize)]
pub struct CreateTicketTypeRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub total_quantity: i32,
}

#[derive(Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,
    pub ticket_types: Vec<TicketTypeAvailability>,
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(organizer_id): AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    for ticket_type in &req.ticket_types {
        if ticket_type.name.trim().is_empty() {
            return Err(AppError::Validation(
                "ticket type name must not be empty".to_string(),
            ));
        }
        if ticket_type.price < Decimal::ZERO {
            return Err(AppError::Validation(
                "ticket type price must not be negative".to_string(),
            ));
        }
        if ticket_type.total_quantity < 1 {
            return Err(AppError::Validation(
                "ticket type capacity must be at least 1".to_string(),
            ));
        }
    }

    let now = state.clock.now();
    let event = Event {
        id: Uuid::new_v4(),
        organizer_id,
        title: req.title,
        description: req.description,
        location: req.location,
        latitude: req.latitude,
        longitude: req.longitude,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_event(event.clone()).await?;

    for ticket_type in req.ticket_types {
        state
            .store
            .insert_ticket_type(TicketType {
                id: Uuid::new_v4(),
                event_id: event.id,
                name: ticket_type.name,
                description: ticket_type.description,
                price: ticket_type.price,
                total_quantity: ticket_type.total_quantity,
                committed_quantity: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let ticket_types = state.queries.list_availability(event.id).await?;
    Ok(created(
        EventResponse {
            event,
            ticket_types,
        },
        "Event created",
    ))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.store.list_events().await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state.store.event(event_id).await?;
    let ticket_types = state.queries.list_availability(event_id).await?;
    Ok(success(
        EventResponse {
            event,
            ticket_types,
        },
        "Event retrieved",
    ))
}

pub async fn availability(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket_types = state.queries.list_availability(event_id).await?;
    Ok(success(ticket_types, "Availability retrieved"))
}

/// Counter-level view of one ticket type, for re-validating a selection right
/// before checkout.
pub async fn ticket_type_availability(
    State(state): State<AppState>,
    Path(ticket_type_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let counters = state.ledger.availability(ticket_type_id).await?;
    Ok(success(counters, "Availability retrieved"))
}
