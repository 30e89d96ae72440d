use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use super::{json_body, CurrentActor};
use crate::models::BookRequest;
use crate::services::allocator::requested_quantity;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn book_ticket(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(event_id): Path<Uuid>,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(body)?;
    let selector = request
        .selector()
        .ok_or_else(|| AppError::InvalidInput("ticket_id or ticket_type is required".to_string()))?;
    let quantity = requested_quantity(&request.quantity)?;

    let outcome = state
        .allocator
        .book(event_id, selector, quantity, actor.id)
        .await?;

    let message = outcome.message();
    if outcome.created {
        Ok(created(outcome, message))
    } else {
        Ok(success(outcome, message))
    }
}

pub async fn my_bookings(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Response, AppError> {
    let bookings = state.allocator.bookings_for(actor.id).await?;
    Ok(success(bookings, "Bookings retrieved"))
}
