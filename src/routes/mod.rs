use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers};
use crate::handlers::{checkout, events, health_check, organizer, tickets};
use crate::inventory::{
    AllocationEngine, Attendance, Clock, HoldPolicy, Ledger, QueryFacade, ReservationManager,
};
use crate::store::InventoryStore;

/// Shared handler state: the four engine components plus direct store and
/// clock access for the plain CRUD paths.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub reservations: ReservationManager,
    pub allocation: AllocationEngine,
    pub queries: QueryFacade,
    pub attendance: Attendance,
    pub store: Arc<dyn InventoryStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        clock: Arc<dyn Clock>,
        hold_policy: HoldPolicy,
    ) -> Self {
        Self {
            ledger: Ledger::new(store.clone(), clock.clone()),
            reservations: ReservationManager::new(store.clone(), clock.clone(), hold_policy),
            allocation: AllocationEngine::new(store.clone(), clock.clone()),
            queries: QueryFacade::new(store.clone(), clock.clone()),
            attendance: Attendance::new(store.clone()),
            store,
            clock,
        }
    }
}

pub fn create_routes(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/availability", get(events::availability))
        .route(
            "/ticket-types/:id/availability",
            get(events::ticket_type_availability),
        )
        .route("/events/:id/attendees", get(organizer::list_attendees))
        .route("/holds", post(checkout::create_hold))
        .route("/holds/:id", delete(checkout::release_hold))
        .route("/orders", post(checkout::create_order))
        .route("/me/tickets", get(tickets::my_tickets))
        .route(
            "/tickets/:id/check-in",
            post(tickets::check_in).delete(tickets::undo_check_in),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    with_security_headers(router).layer(create_cors_layer())
}
