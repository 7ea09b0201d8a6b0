//! Prompt template management module.
//!
//! # Usage
//!
//! ```ignore
//! use crate::shared::prompts::render_ticket_classification_prompts;
//!
//! let prompts = render_ticket_classification_prompts("I was charged twice")?;
//! ```

pub mod engine;

pub use engine::{render_template, TemplateError};

use minijinja::Value;
use std::collections::HashMap;

use crate::features::tickets::models::{TicketCategory, TicketPriority};

/// Rendered system/user message pair for one classification request
#[derive(Debug, Clone)]
pub struct ClassificationPrompts {
    pub system: String,
    pub user: String,
}

/// Render the ticket classification prompts for a description.
///
/// The user prompt lists every allowed category and priority, then embeds the
/// description verbatim.
pub fn render_ticket_classification_prompts(
    description: &str,
) -> Result<ClassificationPrompts, TemplateError> {
    let system = render_template("ticket_classification/system.jinja", &HashMap::new())?;

    let categories: Vec<&str> = TicketCategory::ALL.iter().map(|c| c.as_str()).collect();
    let priorities: Vec<&str> = TicketPriority::ALL.iter().map(|p| p.as_str()).collect();

    let mut ctx: HashMap<&str, Value> = HashMap::new();
    ctx.insert("categories", Value::from_serialize(&categories));
    ctx.insert("priorities", Value::from_serialize(&priorities));
    ctx.insert("description", Value::from(description));

    let user = render_template("ticket_classification/user.jinja", &ctx)?;

    Ok(ClassificationPrompts { system, user })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ticket_classification_prompts() {
        let prompts = render_ticket_classification_prompts("My invoice is wrong").unwrap();

        assert_eq!(
            prompts.system,
            "You are a helpful assistant that classifies support tickets. You must return valid JSON."
        );
        assert_eq!(
            prompts.user,
            "Classify the following support ticket description.\n\
             Categories: billing, technical, account, general.\n\
             Priorities: low, medium, high, critical.\n\
             Return a JSON object with keys 'category' and 'priority'.\n\
             \n\
             Description: My invoice is wrong"
        );
    }

    #[test]
    fn test_description_is_embedded_verbatim() {
        let description = "<b>{{ not a template }}</b> & \"quotes\"";
        let prompts = render_ticket_classification_prompts(description).unwrap();
        assert!(prompts.user.ends_with(description));
    }

    #[test]
    fn test_empty_description_renders() {
        let prompts = render_ticket_classification_prompts("").unwrap();
        assert!(prompts.user.ends_with("Description: "));
    }
}
