use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::{json_body, CurrentActor, MaybeActor};
use crate::models::{NewTicket, TicketUpdate};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Default, Deserialize)]
pub struct TicketFilter {
    pub event_id: Option<Uuid>,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    MaybeActor(viewer): MaybeActor,
    Query(filter): Query<TicketFilter>,
) -> Result<Response, AppError> {
    let tickets = state
        .catalog
        .list_tickets(filter.event_id, viewer.as_ref())
        .await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<NewTicket>, JsonRejection>,
) -> Result<Response, AppError> {
    let input = json_body(body)?;
    let ticket = state.catalog.create_ticket(input, &actor).await?;
    Ok(created(ticket, "Ticket created"))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ticket_id): Path<Uuid>,
    body: Result<Json<TicketUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let update = json_body(body)?;
    let ticket = state
        .catalog
        .update_ticket(ticket_id, update, &actor)
        .await?;
    Ok(success(ticket, "Ticket updated"))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.catalog.delete_ticket(ticket_id, &actor).await?;
    Ok(empty_success("Ticket deleted"))
}
