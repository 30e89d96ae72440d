use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers, Config};
use crate::handlers::{
    book_ticket, create_ticket, delete_ticket, health_check, list_tickets, my_bookings,
    update_ticket,
};
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/:ticket_id", patch(update_ticket).delete(delete_ticket))
        .route("/events/:event_id/bookings", post(book_ticket))
        .route("/bookings/me", get(my_bookings))
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let router = api_routes().with_state(state);

    with_security_headers(router, config.production)
        .layer(create_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
