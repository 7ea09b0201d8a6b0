use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::tickets::models::{
    ClassificationResult, Ticket, TicketCategory, TicketPriority, TicketStatus,
};
use crate::shared::types::{default_page, default_page_size, empty_string_as_none};

/// Response DTO for ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponseDto {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponseDto {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            category: t.category,
            priority: t.priority,
            status: t.status,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Request DTO for creating a ticket.
///
/// Omitted `category`/`priority` are filled in by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTicketDto {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TicketCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
}

/// Request DTO for partially updating a ticket
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketDto {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description must not be empty"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<TicketCategory>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
}

impl UpdateTicketDto {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    /// A new description with a label left out triggers re-classification
    pub fn needs_classification(&self) -> bool {
        self.description.is_some() && (self.category.is_none() || self.priority.is_none())
    }
}

/// Query params for listing tickets
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(default = 1, minimum = 1)]
    pub page: i64,

    /// Items per page (max 100)
    #[serde(default = "default_page_size")]
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub page_size: i64,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<TicketCategory>)]
    pub category: Option<TicketCategory>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<TicketPriority>)]
    pub priority: Option<TicketPriority>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<TicketStatus>)]
    pub status: Option<TicketStatus>,

    /// Case-insensitive match against title or description
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub search: Option<String>,
}

/// Aggregate ticket statistics
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketStatsDto {
    pub total_tickets: i64,
    pub open_tickets: i64,
    /// Mean tickets per calendar day (UTC), over days with at least one ticket
    pub avg_tickets_per_day: f64,
    pub priority_breakdown: BTreeMap<String, i64>,
    pub category_breakdown: BTreeMap<String, i64>,
}

/// Request DTO for classifying a description without creating a ticket
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ClassifyTicketDto {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

/// Suggested classification for a description
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResponseDto {
    pub suggested_category: TicketCategory,
    pub suggested_priority: TicketPriority,
}

impl From<ClassificationResult> for ClassificationResponseDto {
    fn from(result: ClassificationResult) -> Self {
        Self {
            suggested_category: result.category,
            suggested_priority: result.priority,
        }
    }
}
