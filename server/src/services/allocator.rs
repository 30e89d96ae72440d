//! Inventory allocator: validates a booking request and moves stock from the
//! catalog into the booking ledger.
//!
//! The lookup in [`Allocator::book`] only resolves which ticket is meant. The
//! stock check that decides the outcome is repeated by
//! [`StorageBackend::allocate`] under the ticket row lock, together with the
//! decrement and the ledger upsert, so concurrent requests cannot oversell.
//! A request that loses the race fails with `InsufficientStock` immediately;
//! retrying is up to the caller.

use serde_json::Number;
use uuid::Uuid;

use crate::models::{BookingOutcome, BookingView, TicketSelector};
use crate::services::ledger;
use crate::storage::StorageBackend;
use crate::utils::error::{AppError, QuantityProblem};

/// Upper bound on the quantity of a single booking request.
pub const MAX_PER_ORDER: i64 = 500;

pub fn validate_quantity(quantity: i64) -> Result<i32, AppError> {
    if quantity < 1 {
        return Err(AppError::InvalidQuantity {
            requested: quantity,
            reason: QuantityProblem::NonPositive,
        });
    }
    if quantity > MAX_PER_ORDER {
        return Err(AppError::InvalidQuantity {
            requested: quantity,
            reason: QuantityProblem::ExceedsMaximum,
        });
    }
    // Bounded by MAX_PER_ORDER above
    Ok(quantity as i32)
}

/// Reads a quantity off the wire. Values beyond `i64` or with a fractional
/// part are reported as `InvalidQuantity` with the reason the caller can fix.
pub fn requested_quantity(raw: &Number) -> Result<i64, AppError> {
    if let Some(quantity) = raw.as_i64() {
        return Ok(quantity);
    }
    if raw.is_u64() {
        return Err(AppError::InvalidQuantity {
            requested: i64::MAX,
            reason: QuantityProblem::ExceedsMaximum,
        });
    }

    let value = raw.as_f64().unwrap_or(f64::NAN);
    // `as` saturates, which is what the error payload wants
    let requested = value as i64;
    let reason = if value > MAX_PER_ORDER as f64 {
        QuantityProblem::ExceedsMaximum
    } else if value < 1.0 {
        QuantityProblem::NonPositive
    } else if value.fract() == 0.0 {
        return Ok(requested);
    } else {
        QuantityProblem::NotAnInteger
    };
    Err(AppError::InvalidQuantity { requested, reason })
}

#[derive(Clone)]
pub struct Allocator {
    store: StorageBackend,
}

impl Allocator {
    pub fn new(store: StorageBackend) -> Self {
        Self { store }
    }

    pub async fn book(
        &self,
        event_id: Uuid,
        selector: TicketSelector,
        quantity: i64,
        user_id: Uuid,
    ) -> Result<BookingOutcome, AppError> {
        if self.store.get_event(event_id).await?.is_none() {
            return Err(AppError::EventNotFound);
        }
        let ticket = self
            .store
            .find_ticket(event_id, selector)
            .await?
            .ok_or(AppError::TicketNotFound)?;

        let quantity = validate_quantity(quantity)?;

        let outcome = self.store.allocate(ticket.id, user_id, quantity).await?;

        tracing::info!(
            user = %user_id,
            ticket = %ticket.id,
            quantity,
            created = outcome.created,
            cumulative_quantity = outcome.cumulative_quantity,
            remaining_stock = outcome.remaining_stock,
            "Booking allocated"
        );
        Ok(outcome)
    }

    pub async fn bookings_for(&self, user_id: Uuid) -> Result<Vec<BookingView>, AppError> {
        ledger::list_for_user(&self.store, user_id).await
    }
}
