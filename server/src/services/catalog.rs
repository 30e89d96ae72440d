//! Ticket catalog: ticket types per event, their price and stock.
//!
//! Every mutation loads the owning event and passes the access guard before
//! touching storage. Uniqueness of `(event_id, ticket_type)` is enforced by
//! the storage layer inside the write itself.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Actor, Event, NewTicket, Ticket, TicketChanges, TicketUpdate, TicketView,
};
use crate::services::guard;
use crate::storage::StorageBackend;
use crate::utils::error::AppError;

/// Two fractional digits, fifteen significant digits in total.
const MONEY_SCALE: u32 = 2;
const MONEY_INTEGER_DIGITS: u32 = 13;

pub fn validate_price(price: Decimal) -> Result<Decimal, AppError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::InvalidInput(
            "unit_price must not be negative".to_string(),
        ));
    }
    if price.normalize().scale() > MONEY_SCALE {
        return Err(AppError::InvalidInput(
            "unit_price allows at most two decimal places".to_string(),
        ));
    }
    if price >= Decimal::from(10_i64.pow(MONEY_INTEGER_DIGITS)) {
        return Err(AppError::InvalidInput("unit_price is too large".to_string()));
    }

    let mut price = price.abs();
    price.rescale(MONEY_SCALE);
    Ok(price)
}

pub fn validate_stock(stock: i64) -> Result<i32, AppError> {
    if stock < 0 {
        return Err(AppError::InvalidInput(
            "available_stock must not be negative".to_string(),
        ));
    }
    i32::try_from(stock)
        .map_err(|_| AppError::InvalidInput("available_stock is too large".to_string()))
}

#[derive(Clone)]
pub struct TicketCatalog {
    store: StorageBackend,
}

impl TicketCatalog {
    pub fn new(store: StorageBackend) -> Self {
        Self { store }
    }

    async fn load_event(&self, event_id: Uuid) -> Result<Event, AppError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(AppError::EventNotFound)
    }

    async fn load_ticket(&self, ticket_id: Uuid) -> Result<(Ticket, Event), AppError> {
        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or(AppError::TicketNotFound)?;
        let event = self.load_event(ticket.event_id).await?;
        Ok((ticket, event))
    }

    pub async fn create_ticket(
        &self,
        input: NewTicket,
        actor: &Actor,
    ) -> Result<TicketView, AppError> {
        let event = self.load_event(input.event_id).await?;
        guard::authorize_mutation(actor, &event)?;

        let ticket = Ticket {
            id: Uuid::new_v4(),
            event_id: event.id,
            ticket_type: input.ticket_type,
            unit_price: validate_price(input.unit_price)?,
            available_stock: validate_stock(input.available_stock)?,
        };
        let ticket = self.store.insert_ticket(ticket).await?;

        tracing::info!(
            ticket = %ticket.id,
            event = %event.id,
            ticket_type = %ticket.ticket_type,
            stock = ticket.available_stock,
            "Ticket created"
        );
        Ok(TicketView::new(ticket, event.title, true))
    }

    /// Partial update. Stock may be set directly; existing bookings are not
    /// reconciled against the new value.
    pub async fn update_ticket(
        &self,
        ticket_id: Uuid,
        update: TicketUpdate,
        actor: &Actor,
    ) -> Result<TicketView, AppError> {
        let (_, event) = self.load_ticket(ticket_id).await?;
        guard::authorize_mutation(actor, &event)?;

        if update.is_empty() {
            return Err(AppError::InvalidInput("no fields to update".to_string()));
        }
        let changes = TicketChanges {
            ticket_type: update.ticket_type,
            unit_price: update.unit_price.map(validate_price).transpose()?,
            available_stock: update.available_stock.map(validate_stock).transpose()?,
        };

        let ticket = self.store.update_ticket(ticket_id, &changes).await?;
        tracing::info!(
            ticket = %ticket.id,
            actor = %actor.id,
            price = %ticket.unit_price,
            stock = ticket.available_stock,
            "Ticket updated"
        );
        Ok(TicketView::new(ticket, event.title, true))
    }

    pub async fn delete_ticket(&self, ticket_id: Uuid, actor: &Actor) -> Result<(), AppError> {
        let (_, event) = self.load_ticket(ticket_id).await?;
        guard::authorize_mutation(actor, &event)?;

        let removed = self.store.delete_ticket(ticket_id).await?;
        tracing::info!(
            ticket = %ticket_id,
            actor = %actor.id,
            bookings_removed = removed,
            "Ticket deleted"
        );
        Ok(())
    }

    pub async fn list_tickets(
        &self,
        event_id: Option<Uuid>,
        viewer: Option<&Actor>,
    ) -> Result<Vec<TicketView>, AppError> {
        let listings = self.store.list_tickets(event_id).await?;

        Ok(listings
            .into_iter()
            .map(|listing| {
                let can_edit =
                    viewer.map_or(false, |actor| guard::can_edit(actor, listing.event_owner_id));
                TicketView::new(listing.ticket, listing.event_title, can_edit)
            })
            .collect())
    }
}
