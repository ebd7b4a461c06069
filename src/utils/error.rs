use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::inventory::InventoryError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Inventory(inner) => match inner {
                InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
                InventoryError::InsufficientAvailability { .. } => StatusCode::CONFLICT,
                InventoryError::ReservationExpired(_) => StatusCode::GONE,
                InventoryError::ReservationAlreadyTerminal { .. } => StatusCode::CONFLICT,
                InventoryError::CapacityExceeded { .. } => StatusCode::CONFLICT,
                InventoryError::Forbidden(_) => StatusCode::FORBIDDEN,
                InventoryError::TicketAlreadyUsed(_) => StatusCode::CONFLICT,
                InventoryError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                InventoryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Inventory(inner) => match inner {
                InventoryError::NotFound(_) => "NOT_FOUND",
                InventoryError::InsufficientAvailability { .. } => "INSUFFICIENT_AVAILABILITY",
                InventoryError::ReservationExpired(_) => "RESERVATION_EXPIRED",
                InventoryError::ReservationAlreadyTerminal { .. } => "RESERVATION_ALREADY_FINAL",
                InventoryError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
                InventoryError::Forbidden(_) => "FORBIDDEN",
                InventoryError::TicketAlreadyUsed(_) => "TICKET_ALREADY_USED",
                InventoryError::InvalidQuantity(_) => "INVALID_QUANTITY",
                InventoryError::Storage(_) => "STORAGE_ERROR",
            },
        }
    }

    fn log(&self) {
        match self {
            AppError::Inventory(InventoryError::Storage(e)) => {
                error!(error = ?e, "Storage error");
            }
            other => {
                warn!(code = other.code(), message = %other, "Request failed");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Storage internals stay out of the response body
        let public_message = match &self {
            AppError::Inventory(InventoryError::Storage(_)) => {
                "A storage error occurred".to_string()
            }
            other => other.to_string(),
        };

        error_response(code, public_message, status)
    }
}
