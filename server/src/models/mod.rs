pub mod booking;
pub mod event;
pub mod ticket;
pub mod user;

pub use booking::{BookRequest, Booking, BookingOutcome, BookingView};
pub use event::Event;
pub use ticket::{
    NewTicket, Ticket, TicketChanges, TicketSelector, TicketType, TicketUpdate, TicketView,
};
pub use user::{Actor, Role};
