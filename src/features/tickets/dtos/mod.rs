pub mod ticket_dto;

pub use ticket_dto::{
    ClassificationResponseDto, ClassifyTicketDto, CreateTicketDto, TicketQueryParams,
    TicketResponseDto, TicketStatsDto, UpdateTicketDto,
};
