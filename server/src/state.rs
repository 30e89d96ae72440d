use crate::services::{Allocator, TicketCatalog};
use crate::storage::StorageBackend;

#[derive(Clone)]
pub struct AppState {
    pub store: StorageBackend,
    pub catalog: TicketCatalog,
    pub allocator: Allocator,
}

impl AppState {
    pub fn new(store: StorageBackend) -> Self {
        Self {
            catalog: TicketCatalog::new(store.clone()),
            allocator: Allocator::new(store.clone()),
            store,
        }
    }
}
