use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::tickets::handlers;
use crate::features::tickets::services::TicketService;

/// Create routes for the tickets feature
pub fn routes(service: Arc<TicketService>) -> Router {
    Router::new()
        .route(
            "/api/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route("/api/tickets/stats", get(handlers::get_ticket_stats))
        .route("/api/tickets/classify", post(handlers::classify_ticket))
        .route(
            "/api/tickets/{id}",
            get(handlers::get_ticket)
                .patch(handlers::update_ticket)
                .delete(handlers::delete_ticket),
        )
        .with_state(service)
}
