use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

/// Why a requested quantity was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityProblem {
    NonPositive,
    ExceedsMaximum,
    NotAnInteger,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid quantity {requested}: {reason:?}")]
    InvalidQuantity {
        requested: i64,
        reason: QuantityProblem,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ticket type already defined for this event")]
    DuplicateTicketType,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("Event not found")]
    EventNotFound,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i32 },

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidQuantity { .. } | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateTicketType | AppError::InsufficientStock { .. } => {
                StatusCode::CONFLICT
            }
            AppError::TicketNotFound | AppError::EventNotFound => StatusCode::NOT_FOUND,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::DuplicateTicketType => "DUPLICATE_TICKET_TYPE",
            AppError::TicketNotFound => "TICKET_NOT_FOUND",
            AppError::EventNotFound => "EVENT_NOT_FOUND",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::PermissionDenied => "PERMISSION_DENIED",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Structured payload for errors the caller can act on.
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::InvalidQuantity { requested, reason } => Some(json!({
                "requested": requested,
                "reason": reason,
                "max_per_order": crate::services::allocator::MAX_PER_ORDER,
            })),
            AppError::InsufficientStock {
                requested,
                available,
            } => Some(json!({
                "requested": requested,
                "available": available,
            })),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            _ => {
                warn!(code = self.code(), message = %self, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Storage faults keep their internals out of the response
        let public_message = match &self {
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidQuantity {
                requested: 0,
                reason: QuantityProblem::NonPositive
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DuplicateTicketType.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::TicketNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::PermissionDenied.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_stock_details() {
        let details = AppError::InsufficientStock {
            requested: 6,
            available: 5,
        }
        .details()
        .unwrap();
        assert_eq!(details["requested"], 6);
        assert_eq!(details["available"], 5);
    }

    #[test]
    fn test_invalid_quantity_details_distinguish_reason() {
        let details = AppError::InvalidQuantity {
            requested: 501,
            reason: QuantityProblem::ExceedsMaximum,
        }
        .details()
        .unwrap();
        assert_eq!(details["reason"], "exceeds_maximum");
        assert_eq!(details["max_per_order"], 500);
    }
}
