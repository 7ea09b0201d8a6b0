pub mod classification;
pub mod ticket;

pub use classification::ClassificationResult;
pub use ticket::{Ticket, TicketCategory, TicketPriority, TicketStatus};
