mod classification_service;
mod ticket_service;

pub use classification_service::{LlmClassifier, TicketClassifier};
pub use ticket_service::TicketService;
