use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Ticket category enum matching database enum
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
    ToSchema,
)]
#[sqlx(type_name = "ticket_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketCategory {
    Billing,
    Technical,
    Account,
    #[default]
    General,
}

impl TicketCategory {
    pub const ALL: [TicketCategory; 4] = [
        TicketCategory::Billing,
        TicketCategory::Technical,
        TicketCategory::Account,
        TicketCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Billing => "billing",
            TicketCategory::Technical => "technical",
            TicketCategory::Account => "account",
            TicketCategory::General => "general",
        }
    }
}

/// Ticket priority enum matching database enum
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type,
    ToSchema,
)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Critical => "critical",
        }
    }
}

/// Ticket status enum matching database enum
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Exact, case-sensitive parsing used for query-string filters. Lenient
// normalization of LLM output lives in the classification service.
impl FromStr for TicketCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

impl FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketPriority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown priority '{}'", s))
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(format!("unknown status '{}'", s)),
        }
    }
}

/// Database model for ticket
#[derive(Debug, Clone, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_serde_names() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&TicketCategory::Billing).unwrap(),
            "\"billing\""
        );
        assert_eq!(
            serde_json::from_str::<TicketPriority>("\"critical\"").unwrap(),
            TicketPriority::Critical
        );
    }

    #[test]
    fn test_from_str_is_exact() {
        assert_eq!("technical".parse::<TicketCategory>(), Ok(TicketCategory::Technical));
        assert!("Technical".parse::<TicketCategory>().is_err());
        assert_eq!("in_progress".parse::<TicketStatus>(), Ok(TicketStatus::InProgress));
        assert!("urgent".parse::<TicketPriority>().is_err());
    }

    #[test]
    fn test_display_matches_as_str() {
        for category in TicketCategory::ALL {
            assert_eq!(category.to_string(), category.as_str());
        }
        for priority in TicketPriority::ALL {
            assert_eq!(priority.to_string(), priority.as_str());
        }
    }
}
