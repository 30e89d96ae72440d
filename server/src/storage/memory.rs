// In-memory storage for dev mode and tests
//
// Every table sits behind one mutex. Holding it for the whole of `allocate`
// makes the stock check, the decrement and the ledger upsert a single
// atomic step, the same guarantee the Postgres row lock gives.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use super::TicketListing;
use crate::models::{
    Booking, BookingOutcome, BookingView, Event, Ticket, TicketChanges, TicketSelector,
};
use crate::services::ledger;
use crate::utils::error::AppError;

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    // Keyed by (user_id, ticket_id)
    bookings: HashMap<(Uuid, Uuid), Booking>,
}

impl Tables {
    fn type_taken(&self, ticket: &Ticket) -> bool {
        self.tickets.values().any(|t| {
            t.id != ticket.id && t.event_id == ticket.event_id && t.ticket_type == ticket.ticket_type
        })
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_event(&self, event: &Event) -> Result<(), AppError> {
        self.tables.lock().events.insert(event.id, event.clone());
        Ok(())
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.tables.lock().events.get(&id).cloned())
    }

    pub async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        let mut tables = self.tables.lock();
        if !tables.events.contains_key(&ticket.event_id) {
            return Err(AppError::EventNotFound);
        }
        if tables.type_taken(&ticket) {
            return Err(AppError::DuplicateTicketType);
        }
        tables.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        Ok(self.tables.lock().tickets.get(&id).cloned())
    }

    pub async fn find_ticket(
        &self,
        event_id: Uuid,
        selector: TicketSelector,
    ) -> Result<Option<Ticket>, AppError> {
        let tables = self.tables.lock();
        let found = tables.tickets.values().find(|t| {
            t.event_id == event_id
                && match selector {
                    TicketSelector::Id(id) => t.id == id,
                    TicketSelector::Type(ticket_type) => t.ticket_type == ticket_type,
                }
        });
        Ok(found.cloned())
    }

    pub async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Ticket, AppError> {
        let mut tables = self.tables.lock();
        let mut updated = tables
            .tickets
            .get(&id)
            .cloned()
            .ok_or(AppError::TicketNotFound)?;
        changes.apply(&mut updated);

        if tables.type_taken(&updated) {
            return Err(AppError::DuplicateTicketType);
        }
        tables.tickets.insert(id, updated.clone());
        Ok(updated)
    }

    pub async fn delete_ticket(&self, id: Uuid) -> Result<u64, AppError> {
        let mut tables = self.tables.lock();
        if tables.tickets.remove(&id).is_none() {
            return Err(AppError::TicketNotFound);
        }
        let before = tables.bookings.len();
        tables.bookings.retain(|(_, ticket_id), _| *ticket_id != id);
        Ok((before - tables.bookings.len()) as u64)
    }

    pub async fn list_tickets(
        &self,
        event_id: Option<Uuid>,
    ) -> Result<Vec<TicketListing>, AppError> {
        let tables = self.tables.lock();
        let mut rows: Vec<(&Event, &Ticket)> = tables
            .tickets
            .values()
            .filter(|t| event_id.map_or(true, |id| t.event_id == id))
            .filter_map(|t| tables.events.get(&t.event_id).map(|e| (e, t)))
            .collect();

        rows.sort_by(|(ea, ta), (eb, tb)| {
            (ea.starts_at, &ea.title, ea.id, ta.ticket_type.as_str()).cmp(&(
                eb.starts_at,
                &eb.title,
                eb.id,
                tb.ticket_type.as_str(),
            ))
        });

        Ok(rows
            .into_iter()
            .map(|(event, ticket)| TicketListing {
                ticket: ticket.clone(),
                event_title: event.title.clone(),
                event_owner_id: event.owner_id,
            })
            .collect())
    }

    pub async fn allocate(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<BookingOutcome, AppError> {
        let mut guard = self.tables.lock();
        let tables = &mut *guard;

        let ticket = tables
            .tickets
            .get_mut(&ticket_id)
            .ok_or(AppError::TicketNotFound)?;

        if quantity > ticket.available_stock {
            return Err(AppError::InsufficientStock {
                requested: i64::from(quantity),
                available: ticket.available_stock,
            });
        }

        // Merge first so a failed merge leaves the stock untouched
        let key = (user_id, ticket_id);
        let (mut booking, created) = ledger::get_or_create(
            tables.bookings.get(&key).cloned(),
            user_id,
            ticket_id,
            Utc::now(),
        );
        ledger::increment(&mut booking, quantity, ticket.unit_price)?;

        ticket.available_stock -= quantity;
        let remaining_stock = ticket.available_stock;

        let outcome = BookingOutcome {
            booking_id: booking.id,
            ticket_id,
            created,
            cumulative_quantity: booking.cumulative_quantity,
            total_price: booking.total_price,
            remaining_stock,
        };
        tables.bookings.insert(key, booking);
        Ok(outcome)
    }

    pub async fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BookingView>, AppError> {
        let tables = self.tables.lock();
        let mut views: Vec<BookingView> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| {
                let ticket = tables.tickets.get(&b.ticket_id)?;
                let event = tables.events.get(&ticket.event_id)?;
                Some(BookingView {
                    booking_id: b.id,
                    ticket_id: ticket.id,
                    ticket_type: ticket.ticket_type,
                    event_id: event.id,
                    event_title: event.title.clone(),
                    event_location: event.location.clone(),
                    event_starts_at: event.starts_at,
                    cumulative_quantity: b.cumulative_quantity,
                    unit_price: ticket.unit_price,
                    total_price: b.total_price,
                    booked_at: b.created_at,
                })
            })
            .collect();

        views.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(views)
    }
}
