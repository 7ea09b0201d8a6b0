use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::core::error::{AppError, Result};
use crate::features::tickets::dtos::{
    ClassificationResponseDto, CreateTicketDto, TicketQueryParams, TicketResponseDto,
    TicketStatsDto, UpdateTicketDto,
};
use crate::features::tickets::models::{
    ClassificationResult, Ticket, TicketCategory, TicketPriority, TicketStatus,
};
use crate::features::tickets::services::TicketClassifier;
use crate::shared::types::{page_limit, page_offset};

const TICKET_COLUMNS: &str =
    "id, title, description, category, priority, status, created_at, updated_at";

/// Row for the headline counters in stats
#[derive(Debug, FromRow)]
struct TicketCounts {
    total_tickets: i64,
    open_tickets: i64,
}

/// Service for ticket operations
pub struct TicketService {
    pool: PgPool,
    classifier: Arc<dyn TicketClassifier>,
}

impl TicketService {
    pub fn new(pool: PgPool, classifier: Arc<dyn TicketClassifier>) -> Self {
        Self { pool, classifier }
    }

    /// List tickets matching the filters, newest first. Returns the page and
    /// the total number of matches.
    pub async fn list(&self, params: &TicketQueryParams) -> Result<(Vec<TicketResponseDto>, i64)> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets");
        push_filters(&mut count_query, params);

        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count tickets: {:?}", e);
                AppError::Database(e)
            })?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tickets", TICKET_COLUMNS));
        push_filters(&mut query, params);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page_limit(params.page_size))
            .push(" OFFSET ")
            .push_bind(page_offset(params.page, params.page_size));

        let tickets = query
            .build_query_as::<Ticket>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list tickets: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((tickets.into_iter().map(Into::into).collect(), total))
    }

    /// Create a ticket, classifying the description when category or
    /// priority was not supplied
    pub async fn create(&self, dto: CreateTicketDto) -> Result<TicketResponseDto> {
        let classification = self
            .fill_classification(&dto.description, dto.category, dto.priority)
            .await;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (title, description, category, priority, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, category, priority, status, created_at, updated_at
            "#,
        )
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(classification.category)
        .bind(classification.priority)
        .bind(TicketStatus::Open)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create ticket: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!(
            "Ticket created: id={}, category={}, priority={}",
            ticket.id,
            ticket.category,
            ticket.priority
        );

        Ok(ticket.into())
    }

    /// Submitted values win; the classifier only runs for missing fields
    async fn fill_classification(
        &self,
        description: &str,
        category: Option<TicketCategory>,
        priority: Option<TicketPriority>,
    ) -> ClassificationResult {
        match (category, priority) {
            (Some(category), Some(priority)) => ClassificationResult::new(category, priority),
            (category, priority) => {
                let suggested = self.classifier.classify(description).await;
                ClassificationResult::new(
                    category.unwrap_or(suggested.category),
                    priority.unwrap_or(suggested.priority),
                )
            }
        }
    }

    async fn update_classification(
        &self,
        dto: &UpdateTicketDto,
    ) -> (Option<TicketCategory>, Option<TicketPriority>) {
        match dto.description.as_deref() {
            Some(description) => {
                let filled = self
                    .fill_classification(description, dto.category, dto.priority)
                    .await;
                (Some(filled.category), Some(filled.priority))
            }
            None => (dto.category, dto.priority),
        }
    }

    /// NotFound unless the ticket exists
    async fn ensure_exists(&self, id: i64) -> Result<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check ticket existence: {:?}", e);
            AppError::Database(e)
        })?;

        if !exists {
            return Err(AppError::NotFound(format!("Ticket '{}' not found", id)));
        }

        Ok(())
    }

    /// Get ticket by ID
    pub async fn get_by_id(&self, id: i64) -> Result<TicketResponseDto> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, title, description, category, priority, status, created_at, updated_at
            FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get ticket by ID: {:?}", e);
            AppError::Database(e)
        })?;

        ticket
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Ticket '{}' not found", id)))
    }

    /// Partially update a ticket. A new description re-classifies whichever of
    /// category/priority the request leaves out.
    pub async fn update(&self, id: i64, dto: UpdateTicketDto) -> Result<TicketResponseDto> {
        if dto.is_empty() {
            return Err(AppError::BadRequest(
                "At least one field must be provided".to_string(),
            ));
        }

        if dto.needs_classification() {
            self.ensure_exists(id).await?;
        }

        let (category, priority) = self.update_classification(&dto).await;

        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                priority = COALESCE($5, priority),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, category, priority, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(dto.title)
        .bind(dto.description)
        .bind(category)
        .bind(priority)
        .bind(dto.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update ticket: {:?}", e);
            AppError::Database(e)
        })?;

        let ticket =
            ticket.ok_or_else(|| AppError::NotFound(format!("Ticket '{}' not found", id)))?;

        tracing::info!("Ticket updated: id={}, status={}", ticket.id, ticket.status);

        Ok(ticket.into())
    }

    /// Delete ticket
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete ticket: {:?}", e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Ticket '{}' not found", id)));
        }

        tracing::info!("Ticket deleted: id={}", id);

        Ok(())
    }

    /// Aggregate ticket statistics
    pub async fn stats(&self) -> Result<TicketStatsDto> {
        let counts = sqlx::query_as::<_, TicketCounts>(
            r#"
            SELECT
                COUNT(*) AS total_tickets,
                COUNT(*) FILTER (WHERE status = 'open') AS open_tickets
            FROM tickets
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get ticket counts: {:?}", e);
            AppError::Database(e)
        })?;

        let by_priority = sqlx::query_as::<_, (TicketPriority, i64)>(
            "SELECT priority, COUNT(*) FROM tickets GROUP BY priority",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get priority breakdown: {:?}", e);
            AppError::Database(e)
        })?;

        let by_category = sqlx::query_as::<_, (TicketCategory, i64)>(
            "SELECT category, COUNT(*) FROM tickets GROUP BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get category breakdown: {:?}", e);
            AppError::Database(e)
        })?;

        // NULL when the table is empty
        let avg_per_day = sqlx::query_scalar::<_, Option<Decimal>>(
            r#"
            SELECT AVG(daily.ticket_count)
            FROM (
                SELECT COUNT(*) AS ticket_count
                FROM tickets
                GROUP BY (created_at AT TIME ZONE 'UTC')::date
            ) AS daily
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get daily average: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(build_stats(
            counts.total_tickets,
            counts.open_tickets,
            &by_priority,
            &by_category,
            avg_per_day,
        ))
    }

    /// Suggest a classification without persisting anything
    pub async fn classify(&self, description: &str) -> ClassificationResponseDto {
        self.classifier.classify(description).await.into()
    }
}

/// Append a WHERE clause for the supplied filters only
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, params: &TicketQueryParams) {
    let mut separator = " WHERE ";

    if let Some(category) = params.category {
        query.push(separator).push("category = ").push_bind(category);
        separator = " AND ";
    }

    if let Some(priority) = params.priority {
        query.push(separator).push("priority = ").push_bind(priority);
        separator = " AND ";
    }

    if let Some(status) = params.status {
        query.push(separator).push("status = ").push_bind(status);
        separator = " AND ";
    }

    if let Some(search) = params.search.as_deref() {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(separator)
            .push("(title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape LIKE metacharacters so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Assemble stats from raw aggregates. Breakdowns list every enum value.
fn build_stats(
    total_tickets: i64,
    open_tickets: i64,
    by_priority: &[(TicketPriority, i64)],
    by_category: &[(TicketCategory, i64)],
    avg_per_day: Option<Decimal>,
) -> TicketStatsDto {
    let mut priority_breakdown: BTreeMap<String, i64> = TicketPriority::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), 0))
        .collect();
    for (priority, count) in by_priority {
        priority_breakdown.insert(priority.as_str().to_string(), *count);
    }

    let mut category_breakdown: BTreeMap<String, i64> = TicketCategory::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), 0))
        .collect();
    for (category, count) in by_category {
        category_breakdown.insert(category.as_str().to_string(), *count);
    }

    let avg_tickets_per_day = avg_per_day
        .map(|avg| avg.round_dp_with_strategy(1, RoundingStrategy::MidpointNearestEven))
        .and_then(|avg| avg.to_f64())
        .unwrap_or(0.0);

    TicketStatsDto {
        total_tickets,
        open_tickets,
        avg_tickets_per_day,
        priority_breakdown,
        category_breakdown,
    }
}
