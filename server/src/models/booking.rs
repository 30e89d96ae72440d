use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use super::ticket::{TicketSelector, TicketType};

/// Cumulative holding of one user for one ticket type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub cumulative_quantity: i32,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Body of a booking call. Either `ticket_id` or `ticket_type` names the
/// ticket; the id wins when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct BookRequest {
    #[serde(default)]
    pub ticket_id: Option<Uuid>,
    #[serde(default)]
    pub ticket_type: Option<TicketType>,
    /// Kept as a raw JSON number so out-of-range and fractional values reach
    /// quantity validation instead of failing to parse.
    pub quantity: Number,
}

impl BookRequest {
    pub fn selector(&self) -> Option<TicketSelector> {
        match (self.ticket_id, self.ticket_type) {
            (Some(id), _) => Some(TicketSelector::Id(id)),
            (None, Some(ticket_type)) => Some(TicketSelector::Type(ticket_type)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingOutcome {
    pub booking_id: Uuid,
    pub ticket_id: Uuid,
    pub created: bool,
    pub cumulative_quantity: i32,
    pub total_price: Decimal,
    pub remaining_stock: i32,
}

impl BookingOutcome {
    pub fn message(&self) -> String {
        if self.created {
            "Tickets booked".to_string()
        } else {
            format!(
                "Booking updated; you now hold {}",
                self.cumulative_quantity
            )
        }
    }
}

/// Booking joined with the ticket and event display fields.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub booking_id: Uuid,
    pub ticket_id: Uuid,
    pub ticket_type: TicketType,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_location: String,
    pub event_starts_at: DateTime<Utc>,
    pub cumulative_quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub booked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_prefers_id() {
        let id = Uuid::new_v4();
        let request = BookRequest {
            ticket_id: Some(id),
            ticket_type: Some(TicketType::Vip),
            quantity: Number::from(1),
        };
        assert_eq!(request.selector(), Some(TicketSelector::Id(id)));
    }

    #[test]
    fn test_selector_by_type_or_missing() {
        let request: BookRequest =
            serde_json::from_str(r#"{"ticket_type": "vip", "quantity": 2}"#).unwrap();
        assert_eq!(request.selector(), Some(TicketSelector::Type(TicketType::Vip)));

        let request: BookRequest = serde_json::from_str(r#"{"quantity": 2}"#).unwrap();
        assert_eq!(request.selector(), None);
    }

    #[test]
    fn test_outcome_message() {
        let mut outcome = BookingOutcome {
            booking_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            created: true,
            cumulative_quantity: 2,
            total_price: Decimal::new(20000, 2),
            remaining_stock: 8,
        };
        assert_eq!(outcome.message(), "Tickets booked");
        outcome.created = false;
        outcome.cumulative_quantity = 5;
        assert_eq!(outcome.message(), "Booking updated; you now hold 5");
    }
}
