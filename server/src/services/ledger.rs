//! Booking ledger: the merge rule for a user's holding of one ticket type.
//!
//! Storage backends call [`open`] and [`increment`] while they hold the
//! ticket row lock, so the read of the existing row and the write of the
//! merged one belong to the same unit of work as the stock decrement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Booking, BookingView};
use crate::storage::StorageBackend;
use crate::utils::error::AppError;

/// Fresh, not yet persisted row. Only ever written after an [`increment`].
pub fn open(user_id: Uuid, ticket_id: Uuid, now: DateTime<Utc>) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        user_id,
        ticket_id,
        cumulative_quantity: 0,
        total_price: Decimal::ZERO,
        created_at: now,
    }
}

/// Resolves the row to merge into: the existing one, or a new one.
/// Returns the row and whether it was created.
pub fn get_or_create(
    existing: Option<Booking>,
    user_id: Uuid,
    ticket_id: Uuid,
    now: DateTime<Utc>,
) -> (Booking, bool) {
    match existing {
        Some(booking) => (booking, false),
        None => (open(user_id, ticket_id, now), true),
    }
}

pub fn total_price(unit_price: Decimal, quantity: i32) -> Decimal {
    let mut total = unit_price * Decimal::from(quantity);
    total.rescale(2);
    total
}

/// Adds `delta` to the holding and recomputes the total from the current
/// unit price. The total is never accumulated incrementally.
pub fn increment(booking: &mut Booking, delta: i32, unit_price: Decimal) -> Result<(), AppError> {
    let quantity = booking
        .cumulative_quantity
        .checked_add(delta)
        .ok_or_else(|| AppError::InvalidInput("booking quantity overflow".to_string()))?;

    booking.cumulative_quantity = quantity;
    booking.total_price = total_price(unit_price, quantity);
    Ok(())
}

pub async fn list_for_user(
    store: &StorageBackend,
    user_id: Uuid,
) -> Result<Vec<BookingView>, AppError> {
    store.list_bookings_for_user(user_id).await
}
