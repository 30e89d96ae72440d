use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Admission category. An event defines each type at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Regular,
    Vip,
}

impl TicketType {
    pub const ALL: [TicketType; 2] = [TicketType::Regular, TicketType::Vip];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Regular => "regular",
            TicketType::Vip => "vip",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TicketType::Regular => "Regular",
            TicketType::Vip => "VIP",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown ticket type '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_type: TicketType,
    pub unit_price: Decimal,
    pub available_stock: i32,
}

/// How a booking request names the ticket it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketSelector {
    Id(Uuid),
    Type(TicketType),
}

/// Body of a create-ticket call. Numbers arrive wide so that negative or
/// oversized input is rejected as `InvalidInput` rather than failing to parse.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub event_id: Uuid,
    pub ticket_type: TicketType,
    pub unit_price: Decimal,
    pub available_stock: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketUpdate {
    pub ticket_type: Option<TicketType>,
    pub unit_price: Option<Decimal>,
    pub available_stock: Option<i64>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.ticket_type.is_none() && self.unit_price.is_none() && self.available_stock.is_none()
    }
}

/// Validated partial update, applied by the storage layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketChanges {
    pub ticket_type: Option<TicketType>,
    pub unit_price: Option<Decimal>,
    pub available_stock: Option<i32>,
}

impl TicketChanges {
    pub fn apply(&self, ticket: &mut Ticket) {
        if let Some(ticket_type) = self.ticket_type {
            ticket.ticket_type = ticket_type;
        }
        if let Some(unit_price) = self.unit_price {
            ticket.unit_price = unit_price;
        }
        if let Some(available_stock) = self.available_stock {
            ticket.available_stock = available_stock;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub ticket_type: TicketType,
    pub ticket_type_label: &'static str,
    pub unit_price: Decimal,
    pub available_stock: i32,
    pub can_edit: bool,
}

impl TicketView {
    pub fn new(ticket: Ticket, event_title: String, can_edit: bool) -> Self {
        Self {
            id: ticket.id,
            event_id: ticket.event_id,
            event_title,
            ticket_type: ticket.ticket_type,
            ticket_type_label: ticket.ticket_type.label(),
            unit_price: ticket.unit_price,
            available_stock: ticket.available_stock,
            can_edit,
        }
    }
}
