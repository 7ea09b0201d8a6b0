use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::tickets::dtos::{
    ClassificationResponseDto, ClassifyTicketDto, CreateTicketDto, TicketQueryParams,
    TicketResponseDto, TicketStatsDto, UpdateTicketDto,
};
use crate::features::tickets::services::TicketService;
use crate::shared::types::{ApiResponse, Meta};

/// List tickets with optional filters
#[utoipa::path(
    get,
    path = "/api/tickets",
    params(TicketQueryParams),
    responses(
        (status = 200, description = "Tickets retrieved successfully", body = ApiResponse<Vec<TicketResponseDto>>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    State(service): State<Arc<TicketService>>,
    AppQuery(params): AppQuery<TicketQueryParams>,
) -> Result<Json<ApiResponse<Vec<TicketResponseDto>>>> {
    let (tickets, total) = service.list(&params).await?;
    Ok(Json(ApiResponse::success(
        Some(tickets),
        None,
        Some(Meta { total }),
    )))
}

/// Create a ticket
///
/// Missing `category` or `priority` is filled in by the classifier.
#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketDto,
    responses(
        (status = 201, description = "Ticket created successfully", body = ApiResponse<TicketResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "tickets"
)]
pub async fn create_ticket(
    State(service): State<Arc<TicketService>>,
    AppJson(dto): AppJson<CreateTicketDto>,
) -> Result<(StatusCode, Json<ApiResponse<TicketResponseDto>>)> {
    dto.validate()?;

    let ticket = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(ticket),
            Some("Ticket created successfully".to_string()),
            None,
        )),
    ))
}

/// Aggregate ticket statistics
#[utoipa::path(
    get,
    path = "/api/tickets/stats",
    responses(
        (status = 200, description = "Statistics retrieved successfully", body = ApiResponse<TicketStatsDto>)
    ),
    tag = "tickets"
)]
pub async fn get_ticket_stats(
    State(service): State<Arc<TicketService>>,
) -> Result<Json<ApiResponse<TicketStatsDto>>> {
    let stats = service.stats().await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

/// Suggest a category and priority for a description
#[utoipa::path(
    post,
    path = "/api/tickets/classify",
    request_body = ClassifyTicketDto,
    responses(
        (status = 200, description = "Suggested classification", body = ApiResponse<ClassificationResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "tickets"
)]
pub async fn classify_ticket(
    State(service): State<Arc<TicketService>>,
    AppJson(dto): AppJson<ClassifyTicketDto>,
) -> Result<Json<ApiResponse<ClassificationResponseDto>>> {
    dto.validate()?;

    let suggestion = service.classify(&dto.description).await;
    Ok(Json(ApiResponse::success(Some(suggestion), None, None)))
}

/// Get ticket by ID
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    params(
        ("id" = i64, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket found", body = ApiResponse<TicketResponseDto>),
        (status = 404, description = "Ticket not found")
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    State(service): State<Arc<TicketService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TicketResponseDto>>> {
    let ticket = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(ticket), None, None)))
}

/// Partially update a ticket
#[utoipa::path(
    patch,
    path = "/api/tickets/{id}",
    params(
        ("id" = i64, Path, description = "Ticket ID")
    ),
    request_body = UpdateTicketDto,
    responses(
        (status = 200, description = "Ticket updated successfully", body = ApiResponse<TicketResponseDto>),
        (status = 400, description = "Validation error or empty update"),
        (status = 404, description = "Ticket not found")
    ),
    tag = "tickets"
)]
pub async fn update_ticket(
    State(service): State<Arc<TicketService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateTicketDto>,
) -> Result<Json<ApiResponse<TicketResponseDto>>> {
    dto.validate()?;

    let ticket = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(ticket),
        Some("Ticket updated successfully".to_string()),
        None,
    )))
}

/// Delete a ticket
#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    params(
        ("id" = i64, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket deleted successfully"),
        (status = 404, description = "Ticket not found")
    ),
    tag = "tickets"
)]
pub async fn delete_ticket(
    State(service): State<Arc<TicketService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Ticket deleted successfully".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use super::*;
    use crate::features::tickets::models::{ClassificationResult, TicketCategory, TicketPriority};
    use crate::features::tickets::routes;
    use crate::shared::test_helpers::{lazy_pool, StubClassifier};

    fn server_with(classifier: Arc<StubClassifier>) -> TestServer {
        let service = Arc::new(TicketService::new(lazy_pool(), classifier));
        TestServer::new(routes::routes(service)).unwrap()
    }

    fn server() -> TestServer {
        server_with(Arc::new(StubClassifier::new(ClassificationResult::default())))
    }

    #[tokio::test]
    async fn test_classify_returns_suggestion() {
        let stub = Arc::new(StubClassifier::new(ClassificationResult::new(
            TicketCategory::Billing,
            TicketPriority::High,
        )));
        let server = server_with(stub.clone());

        let response = server
            .post("/api/tickets/classify")
            .json(&json!({ "description": "I was charged twice" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["suggested_category"], "billing");
        assert_eq!(body["data"]["suggested_priority"], "high");
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_classify_rejects_empty_description() {
        let stub = Arc::new(StubClassifier::new(ClassificationResult::default()));
        let server = server_with(stub.clone());

        let response = server
            .post("/api/tickets/classify")
            .json(&json!({ "description": "" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["errors"].is_array());
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_validation_error() {
        let stub = Arc::new(StubClassifier::new(ClassificationResult::default()));
        let server = server_with(stub.clone());

        let response = server
            .post("/api/tickets")
            .json(&json!({ "title": "", "description": "Cannot log in" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_category() {
        let response = server()
            .post("/api/tickets")
            .json(&json!({
                "title": "Help",
                "description": "Cannot log in",
                "category": "spam"
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_json() {
        let response = server()
            .post("/api/tickets")
            .content_type("application/json")
            .text("{\"title\": ")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_filter_value() {
        let response = server().get("/api/tickets?priority=urgent").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid query parameters"));
    }

    #[tokio::test]
    async fn test_list_rejects_non_numeric_page() {
        let response = server().get("/api/tickets?page=first").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let response = server().patch("/api/tickets/1").json(&json!({})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "At least one field must be provided");
    }

    #[tokio::test]
    async fn test_database_failure_uses_envelope() {
        let response = server().get("/api/tickets/1").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Database error occurred");
    }
}
