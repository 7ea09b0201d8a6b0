//! Support tickets.
//!
//! CRUD over the `tickets` table plus aggregate stats. New tickets missing a
//! category or priority are classified from their description by an
//! OpenAI-compatible completion service, falling back to `general`/`medium`.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/tickets` | List with filters and pagination |
//! | POST | `/api/tickets` | Create (auto-classified) |
//! | GET | `/api/tickets/stats` | Aggregate statistics |
//! | POST | `/api/tickets/classify` | Suggest category/priority |
//! | GET | `/api/tickets/{id}` | Get one |
//! | PATCH | `/api/tickets/{id}` | Partial update |
//! | DELETE | `/api/tickets/{id}` | Delete |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::{LlmClassifier, TicketService};
