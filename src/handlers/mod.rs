use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;
use serde::Serialize;
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod checkout;
pub mod events;
pub mod organizer;
pub mod tickets;

/// Caller identity, as established by the upstream auth layer and forwarded
/// in the `x-user-id` header. Verifying credentials is that layer's job; this
/// extractor only refuses requests that arrive without an identity at all.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .ok_or_else(|| AppError::Auth("missing x-user-id header".to_string()))?;

        header
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(AuthUser)
            .ok_or_else(|| AppError::Auth("invalid x-user-id header".to_string()))
    }
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "gather-api",
    };

    success(payload, "Health check successful")
}
