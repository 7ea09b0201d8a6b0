use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{TicketCategory, TicketPriority};

/// Category/priority pair assigned to a ticket description.
///
/// Always fully populated; the default is the safe fallback used whenever
/// the classifier is unconfigured or the completion service fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct ClassificationResult {
    pub category: TicketCategory,
    pub priority: TicketPriority,
}

impl ClassificationResult {
    pub fn new(category: TicketCategory, priority: TicketPriority) -> Self {
        Self { category, priority }
    }
}
