use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Actor, Role};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod bookings;
pub mod tickets;

pub use bookings::{book_ticket, my_bookings};
pub use tickets::{create_ticket, delete_ticket, list_tickets, update_ticket};

/// Caller identity headers set by the authenticating front end.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    storage: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "booking-api",
        storage: if state.store.is_dev_mode() {
            "memory"
        } else {
            "postgres"
        },
    };

    success(payload, "Health check successful").into_response()
}

fn actor_from_parts(parts: &Parts) -> Result<Option<Actor>, AppError> {
    let Some(raw_id) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let id = raw_id
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::AuthError(format!("{USER_ID_HEADER} is not a valid UUID")))?;

    let role = match parts.headers.get(ROLE_HEADER) {
        None => Role::User,
        Some(raw) => raw
            .to_str()
            .ok()
            .and_then(Role::parse)
            .ok_or_else(|| AppError::AuthError(format!("{ROLE_HEADER} is not a known role")))?,
    };

    Ok(Some(Actor { id, role }))
}

/// Authenticated caller; rejects the request when identity is missing.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts)?
            .map(CurrentActor)
            .ok_or_else(|| AppError::AuthError(format!("missing {USER_ID_HEADER} header")))
    }
}

/// Caller identity when present; anonymous otherwise.
pub struct MaybeActor(pub Option<Actor>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts).map(MaybeActor)
    }
}

/// Unwraps a JSON body, turning malformed input into `InvalidInput`.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}
