use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::TicketListing;
use crate::models::{
    Booking, BookingOutcome, BookingView, Event, Ticket, TicketChanges, TicketSelector, TicketType,
};
use crate::services::ledger;
use crate::utils::error::AppError;

const TICKET_COLUMNS: &str = "id, event_id, ticket_type, unit_price, available_stock";

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    event_id: Uuid,
    ticket_type: String,
    unit_price: Decimal,
    available_stock: i32,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = AppError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            event_id: row.event_id,
            ticket_type: parse_ticket_type(&row.ticket_type)?,
            unit_price: row.unit_price,
            available_stock: row.available_stock,
        })
    }
}

#[derive(Debug, FromRow)]
struct TicketListingRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    event_title: String,
    event_owner_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    ticket_id: Uuid,
    quantity: i32,
    total_price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            cumulative_quantity: row.quantity,
            total_price: row.total_price,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BookingViewRow {
    booking_id: Uuid,
    ticket_id: Uuid,
    ticket_type: String,
    event_id: Uuid,
    event_title: String,
    event_location: String,
    event_starts_at: DateTime<Utc>,
    cumulative_quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    booked_at: DateTime<Utc>,
}

fn parse_ticket_type(value: &str) -> Result<TicketType, AppError> {
    value
        .parse()
        .map_err(|e: String| AppError::DatabaseError(sqlx::Error::Decode(e.into())))
}

/// Maps constraint violations on ticket writes to domain errors.
fn translate_ticket_write(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::DuplicateTicketType;
        }
        if db.is_foreign_key_violation() {
            return AppError::EventNotFound;
        }
        if db.is_check_violation() {
            return AppError::InvalidInput("ticket values out of range".to_string());
        }
    }
    AppError::DatabaseError(e)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;

        tracing::info!("Migrations run successfully");
        Ok(())
    }

    pub async fn upsert_event(&self, event: &Event) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO events (id, owner_id, title, location, starts_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                title = EXCLUDED.title,
                location = EXCLUDED.location,
                starts_at = EXCLUDED.starts_at",
        )
        .bind(event.id)
        .bind(event.owner_id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(event.starts_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, owner_id, title, location, starts_at FROM events WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    pub async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, AppError> {
        // The unique constraint decides concurrent creations of the same type
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "INSERT INTO tickets (id, event_id, ticket_type, unit_price, available_stock)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.ticket_type.as_str())
        .bind(ticket.unit_price)
        .bind(ticket.available_stock)
        .fetch_one(&self.pool)
        .await
        .map_err(translate_ticket_write)?;

        row.try_into()
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>, AppError> {
        sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Ticket::try_from)
        .transpose()
    }

    pub async fn find_ticket(
        &self,
        event_id: Uuid,
        selector: TicketSelector,
    ) -> Result<Option<Ticket>, AppError> {
        let filter = match selector {
            TicketSelector::Id(_) => "id = $2",
            TicketSelector::Type(_) => "ticket_type = $2",
        };
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 AND {filter}");

        let query = sqlx::query_as::<_, TicketRow>(&sql).bind(event_id);
        let query = match selector {
            TicketSelector::Id(id) => query.bind(id),
            TicketSelector::Type(ticket_type) => query.bind(ticket_type.as_str()),
        };

        query
            .fetch_optional(&self.pool)
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    pub async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Ticket, AppError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "UPDATE tickets SET
                ticket_type = COALESCE($2, ticket_type),
                unit_price = COALESCE($3, unit_price),
                available_stock = COALESCE($4, available_stock),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.ticket_type.map(|t| t.as_str()))
        .bind(changes.unit_price)
        .bind(changes.available_stock)
        .fetch_optional(&self.pool)
        .await
        .map_err(translate_ticket_write)?
        .ok_or(AppError::TicketNotFound)?;

        row.try_into()
    }

    pub async fn delete_ticket(&self, id: Uuid) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        // Same lock as `allocate`, so no booking lands on a ticket being removed
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::TicketNotFound);
        }

        let removed = sqlx::query("DELETE FROM bookings WHERE ticket_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    pub async fn list_tickets(
        &self,
        event_id: Option<Uuid>,
    ) -> Result<Vec<TicketListing>, AppError> {
        let rows = sqlx::query_as::<_, TicketListingRow>(
            "SELECT t.id, t.event_id, t.ticket_type, t.unit_price, t.available_stock,
                    e.title AS event_title, e.owner_id AS event_owner_id
             FROM tickets t
             JOIN events e ON e.id = t.event_id
             WHERE ($1::uuid IS NULL OR t.event_id = $1)
             ORDER BY e.starts_at, e.title, e.id, t.ticket_type",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<TicketListing, AppError> {
                Ok(TicketListing {
                    ticket: row.ticket.try_into()?,
                    event_title: row.event_title,
                    event_owner_id: row.event_owner_id,
                })
            })
            .collect()
    }

    /// Compare-and-decrement plus ledger upsert in one transaction.
    ///
    /// The ticket row is locked with `FOR UPDATE` before stock is read, and
    /// every writer of a ticket's bookings takes that lock first. The booking
    /// row read below therefore cannot go stale before the upsert.
    pub async fn allocate(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<BookingOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let ticket: Ticket = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE"
        ))
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::TicketNotFound)?
        .try_into()?;

        // Dropping `tx` rolls back
        if quantity > ticket.available_stock {
            return Err(AppError::InsufficientStock {
                requested: i64::from(quantity),
                available: ticket.available_stock,
            });
        }

        let existing = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, ticket_id, quantity, total_price, created_at
             FROM bookings
             WHERE user_id = $1 AND ticket_id = $2",
        )
        .bind(user_id)
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Booking::from);

        let (mut booking, created) =
            ledger::get_or_create(existing, user_id, ticket_id, Utc::now());
        ledger::increment(&mut booking, quantity, ticket.unit_price)?;

        let remaining_stock: i32 = sqlx::query_scalar(
            "UPDATE tickets
             SET available_stock = available_stock - $2, updated_at = NOW()
             WHERE id = $1 AND available_stock >= $2
             RETURNING available_stock",
        )
        .bind(ticket_id)
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::InsufficientStock {
            requested: i64::from(quantity),
            available: ticket.available_stock,
        })?;

        sqlx::query(
            "INSERT INTO bookings (id, user_id, ticket_id, quantity, total_price, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, ticket_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                total_price = EXCLUDED.total_price,
                updated_at = NOW()",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.ticket_id)
        .bind(booking.cumulative_quantity)
        .bind(booking.total_price)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BookingOutcome {
            booking_id: booking.id,
            ticket_id,
            created,
            cumulative_quantity: booking.cumulative_quantity,
            total_price: booking.total_price,
            remaining_stock,
        })
    }

    pub async fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BookingView>, AppError> {
        let rows = sqlx::query_as::<_, BookingViewRow>(
            "SELECT b.id AS booking_id, t.id AS ticket_id, t.ticket_type,
                    e.id AS event_id, e.title AS event_title,
                    e.location AS event_location, e.starts_at AS event_starts_at,
                    b.quantity AS cumulative_quantity, t.unit_price, b.total_price,
                    b.created_at AS booked_at
             FROM bookings b
             JOIN tickets t ON t.id = b.ticket_id
             JOIN events e ON e.id = t.event_id
             WHERE b.user_id = $1
             ORDER BY b.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<BookingView, AppError> {
                Ok(BookingView {
                    booking_id: row.booking_id,
                    ticket_id: row.ticket_id,
                    ticket_type: parse_ticket_type(&row.ticket_type)?,
                    event_id: row.event_id,
                    event_title: row.event_title,
                    event_location: row.event_location,
                    event_starts_at: row.event_starts_at,
                    cumulative_quantity: row.cumulative_quantity,
                    unit_price: row.unit_price,
                    total_price: row.total_price,
                    booked_at: row.booked_at,
                })
            })
            .collect()
    }
}
