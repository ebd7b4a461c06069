//! HTTP surface tests: the axum router over the in-memory backend, driven
//! request by request with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use gather_server::inventory::{Clock, HoldPolicy, SystemClock};
use gather_server::routes::{create_routes, AppState};
use gather_server::store::{InventoryStore, MemoryStore};

fn app() -> Router {
    let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    create_routes(AppState::new(store, clock, HoldPolicy::default()))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_event(app: &Router, organizer: Uuid, total: i64) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/events",
        Some(organizer),
        Some(json!({
            "title": "Night Market",
            "description": "Food, music, stalls",
            "location": "Old Town Square",
            "latitude": 50.087,
            "longitude": 14.421,
            "starts_at": "2026-09-01T18:00:00Z",
            "ticket_types": [
                { "name": "General", "price": "15.00", "total_quantity": total }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create event failed: {body}");

    let event_id = body["data"]["id"].as_str().unwrap().to_string();
    let ticket_type_id = body["data"]["ticket_types"][0]["ticket_type_id"]
        .as_str()
        .unwrap()
        .to_string();
    (event_id, ticket_type_id)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn purchase_flow_end_to_end() {
    let app = app();
    let organizer = Uuid::new_v4();
    let buyer = Uuid::new_v4();
    let (event_id, ticket_type_id) = create_event(&app, organizer, 5).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/events/{event_id}/availability"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["available"], 5);

    let (status, body) = send(
        &app,
        "POST",
        "/holds",
        Some(buyer),
        Some(json!({ "ticket_type_id": ticket_type_id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["state"], "active");
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(buyer),
        Some(json!({
            "reservation_id": reservation_id,
            "payment_reference": "demo-5512"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "allocate failed: {body}");
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["lines"][0]["quantity"], 2);

    let (status, body) = send(&app, "GET", "/me/tickets", Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["event_title"], "Night Market");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/events/{event_id}/availability"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["available"], 3);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/ticket-types/{ticket_type_id}/availability"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["committed"], 2);
    assert_eq!(body["data"]["held"], 0);
}

#[tokio::test]
async fn sold_out_hold_maps_to_conflict() {
    let app = app();
    let organizer = Uuid::new_v4();
    let buyer = Uuid::new_v4();
    let (_, ticket_type_id) = create_event(&app, organizer, 1).await;

    let (status, _) = send(
        &app,
        "POST",
        "/holds",
        Some(buyer),
        Some(json!({ "ticket_type_id": ticket_type_id, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/holds",
        Some(Uuid::new_v4()),
        Some(json!({ "ticket_type_id": ticket_type_id, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_AVAILABILITY");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn identityless_requests_are_rejected() {
    let app = app();
    let (status, body) = send(&app, "GET", "/me/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn roster_and_check_in_are_organizer_scoped() {
    let app = app();
    let organizer = Uuid::new_v4();
    let buyer = Uuid::new_v4();
    let (event_id, ticket_type_id) = create_event(&app, organizer, 3).await;

    let (_, body) = send(
        &app,
        "POST",
        "/holds",
        Some(buyer),
        Some(json!({ "ticket_type_id": ticket_type_id, "quantity": 1 })),
    )
    .await;
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        "POST",
        "/orders",
        Some(buyer),
        Some(json!({
            "reservation_id": reservation_id,
            "payment_reference": "demo-door"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/events/{event_id}/attendees"),
        Some(buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/events/{event_id}/attendees"),
        Some(organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let roster = body["data"].as_array().unwrap();
    assert_eq!(roster.len(), 1);
    let ticket_id = roster[0]["ticket_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/check-in"),
        Some(organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/tickets/{ticket_id}/check-in"),
        Some(organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "TICKET_ALREADY_USED");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/tickets/{ticket_id}/check-in"),
        Some(organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn released_hold_is_idempotent_over_http() {
    let app = app();
    let organizer = Uuid::new_v4();
    let buyer = Uuid::new_v4();
    let (_, ticket_type_id) = create_event(&app, organizer, 2).await;

    let (_, body) = send(
        &app,
        "POST",
        "/holds",
        Some(buyer),
        Some(json!({ "ticket_type_id": ticket_type_id, "quantity": 2 })),
    )
    .await;
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/holds/{reservation_id}"),
            Some(buyer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // A stranger cannot release someone else's hold.
    let (_, body) = send(
        &app,
        "POST",
        "/holds",
        Some(buyer),
        Some(json!({ "ticket_type_id": ticket_type_id, "quantity": 1 })),
    )
    .await;
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/holds/{reservation_id}"),
        Some(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_event_payload_is_a_validation_error() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/events",
        Some(Uuid::new_v4()),
        Some(json!({
            "title": "  ",
            "location": "Nowhere",
            "latitude": 0.0,
            "longitude": 0.0,
            "starts_at": "2026-09-01T18:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
