pub mod ticket_handler;

pub use ticket_handler::{
    __path_classify_ticket, __path_create_ticket, __path_delete_ticket, __path_get_ticket,
    __path_get_ticket_stats, __path_list_tickets, __path_update_ticket, classify_ticket,
    create_ticket, delete_ticket, get_ticket, get_ticket_stats, list_tickets, update_ticket,
};
