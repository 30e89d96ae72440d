// Storage backend abstraction
//
// `StorageBackend` dispatches to PostgreSQL in production or to an
// in-memory store in dev mode and tests. Both keep the same guarantees:
// `allocate` is one atomic compare-and-decrement plus ledger upsert.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    BookingOutcome, BookingView, Event, Ticket, TicketChanges, TicketSelector,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Ticket joined with the event fields the catalog needs.
#[derive(Debug, Clone)]
pub struct TicketListing {
    pub ticket: Ticket,
    pub event_title: String,
    pub event_owner_id: Option<Uuid>,
}

#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(PgStore),
    /// In-memory store (dev mode, tests)
    InMemory(Arc<InMemoryStore>),
}

impl StorageBackend {
    /// Picks the backend from configuration: Postgres when a database URL is
    /// configured, in-memory otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url, config.max_connections).await?;
                store.migrate().await?;
                Ok(Self::Postgres(store))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory storage (data is lost on restart)");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryStore::new()))
    }

    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    // ============================================
    // Events
    // ============================================

    pub async fn upsert_event(&self, event: &Event) -> Result<(), AppError> {
        match self {
            Self::Postgres(db) => db.upsert_event(event).await,
            Self::InMemory(db) => db.upsert_event(event).await,
        }
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        match self {
            Self::Postgres(db) => db.get_event(id).await,
            Self::InMemory(db) => db.get_event(id).await,
        }
    }

    // ============================================
    // Tickets
    // ============================================

    pub async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        match self {
            Self::Postgres(db) => db.insert_ticket(ticket).await,
            Self::InMemory(db) => db.insert_ticket(ticket).await,
        }
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        match self {
            Self::Postgres(db) => db.get_ticket(id).await,
            Self::InMemory(db) => db.get_ticket(id).await,
        }
    }

    pub async fn find_ticket(
        &self,
        event_id: Uuid,
        selector: TicketSelector,
    ) -> Result<Option<Ticket>, AppError> {
        match self {
            Self::Postgres(db) => db.find_ticket(event_id, selector).await,
            Self::InMemory(db) => db.find_ticket(event_id, selector).await,
        }
    }

    pub async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Ticket, AppError> {
        match self {
            Self::Postgres(db) => db.update_ticket(id, changes).await,
            Self::InMemory(db) => db.update_ticket(id, changes).await,
        }
    }

    /// Deletes the ticket and its bookings. Returns the number of bookings removed.
    pub async fn delete_ticket(&self, id: Uuid) -> Result<u64, AppError> {
        match self {
            Self::Postgres(db) => db.delete_ticket(id).await,
            Self::InMemory(db) => db.delete_ticket(id).await,
        }
    }

    pub async fn list_tickets(
        &self,
        event_id: Option<Uuid>,
    ) -> Result<Vec<TicketListing>, AppError> {
        match self {
            Self::Postgres(db) => db.list_tickets(event_id).await,
            Self::InMemory(db) => db.list_tickets(event_id).await,
        }
    }

    // ============================================
    // Bookings
    // ============================================

    /// Moves `quantity` units from the ticket's stock into the user's booking
    /// in one atomic unit of work.
    pub async fn allocate(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<BookingOutcome, AppError> {
        match self {
            Self::Postgres(db) => db.allocate(ticket_id, user_id, quantity).await,
            Self::InMemory(db) => db.allocate(ticket_id, user_id, quantity).await,
        }
    }

    pub async fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BookingView>, AppError> {
        match self {
            Self::Postgres(db) => db.list_bookings_for_user(user_id).await,
            Self::InMemory(db) => db.list_bookings_for_user(user_id).await,
        }
    }
}
