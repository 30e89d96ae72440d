pub mod allocator;
pub mod catalog;
pub mod guard;
pub mod ledger;

pub use allocator::Allocator;
pub use catalog::TicketCatalog;
