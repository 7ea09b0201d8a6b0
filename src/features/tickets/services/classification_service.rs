use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::config::ClassifierConfig;
use crate::features::tickets::models::{ClassificationResult, TicketCategory, TicketPriority};
use crate::shared::prompts::{render_ticket_classification_prompts, TemplateError};

/// Sampling temperature for classification requests
const TEMPERATURE: f64 = 0.3;

/// Completion budget; the reply is a two-field JSON object
const MAX_TOKENS: u32 = 60;

/// Assigns a category and priority to a ticket description.
///
/// Implementations must be total: every call returns a well-formed
/// [`ClassificationResult`], falling back to the default on any failure.
#[async_trait]
pub trait TicketClassifier: Send + Sync {
    async fn classify(&self, description: &str) -> ClassificationResult;
}

/// Reasons a service-mode classification fell back to the default
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP client unavailable: {0}")]
    ClientUnavailable(String),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] TemplateError),

    #[error("Completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Completion response had no content")]
    EmptyResponse,

    #[error("Completion content is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unexpected classification shape: {0}")]
    InvalidShape(String),
}

// =============================================================================
// SANITIZATION
// =============================================================================

/// Normalize a category label; anything outside the known set becomes `general`
pub fn sanitize_category(raw: &str) -> TicketCategory {
    let lowered = raw.to_lowercase();
    TicketCategory::ALL
        .into_iter()
        .find(|c| c.as_str() == lowered)
        .unwrap_or_default()
}

/// Normalize a priority label; anything outside the known set becomes `medium`
pub fn sanitize_priority(raw: &str) -> TicketPriority {
    let lowered = raw.to_lowercase();
    TicketPriority::ALL
        .into_iter()
        .find(|p| p.as_str() == lowered)
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Absent -> Ok(None); a present field must be a string
fn string_field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, ClassifierError> {
    match object.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ClassifierError::InvalidShape(format!(
            "'{}' must be a string, got {}",
            key,
            json_kind(other)
        ))),
    }
}

/// Parse the completion content into a sanitized classification.
///
/// Content that is not a JSON object, or that has a non-string `category` or
/// `priority`, is rejected as a whole. Missing or unknown labels are
/// defaulted per field.
pub fn parse_classification(content: &str) -> Result<ClassificationResult, ClassifierError> {
    let value: Value = serde_json::from_str(content)?;

    let object = value.as_object().ok_or_else(|| {
        ClassifierError::InvalidShape(format!("expected a JSON object, got {}", json_kind(&value)))
    })?;

    let category = string_field(object, "category")?
        .map(sanitize_category)
        .unwrap_or_default();
    let priority = string_field(object, "priority")?
        .map(sanitize_priority)
        .unwrap_or_default();

    Ok(ClassificationResult::new(category, priority))
}

// =============================================================================
// COMPLETION API WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// =============================================================================
// LLM CLASSIFIER
// =============================================================================

/// Classifier backed by an OpenAI-compatible chat completion API
pub struct LlmClassifier {
    config: ClassifierConfig,
    client: Option<reqwest::Client>,
}

impl LlmClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let client = match reqwest::Client::builder().timeout(config.timeout).build() {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("Failed to build classifier HTTP client: {}", e);
                None
            }
        };

        Self { config, client }
    }

    /// Whether the classifier will call the completion service
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Single attempt at service-mode classification
    async fn request_classification(
        &self,
        api_key: &str,
        description: &str,
    ) -> Result<ClassificationResult, ClassifierError> {
        let client = self.client.as_ref().ok_or_else(|| {
            ClassifierError::ClientUnavailable("client failed to initialize".to_string())
        })?;

        let prompts = render_ticket_classification_prompts(description)?;
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompts.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompts.user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ClassifierError::EmptyResponse)?;

        tracing::debug!(
            "Raw classification response (first 200 chars): {}",
            content.chars().take(200).collect::<String>()
        );

        parse_classification(&content)
    }
}

#[async_trait]
impl TicketClassifier for LlmClassifier {
    async fn classify(&self, description: &str) -> ClassificationResult {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::warn!("No OpenAI API key configured, using default classification");
            return ClassificationResult::default();
        };

        match self.request_classification(api_key, description).await {
            Ok(result) => {
                tracing::debug!(
                    "Ticket classified: category={}, priority={}",
                    result.category,
                    result.priority
                );
                result
            }
            Err(e) => {
                tracing::warn!("Ticket classification failed, using default: {}", e);
                ClassificationResult::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const API_KEY: &str = "sk-test";

    fn service_config(base_url: String) -> ClassifierConfig {
        ClassifierConfig {
            api_key: Some(API_KEY.to_string()),
            base_url,
            model: ClassifierConfig::DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    /// Classify `description` against a mock service replying with `content`
    async fn classify_with_content(content: &str) -> ClassificationResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion(content));
            })
            .await;

        let classifier = LlmClassifier::new(service_config(server.base_url()));
        let result = classifier.classify("Some ticket").await;

        mock.assert_async().await;
        result
    }

    // ==================== sanitization ====================

    #[test]
    fn test_sanitize_category() {
        assert_eq!(sanitize_category("billing"), TicketCategory::Billing);
        assert_eq!(sanitize_category("Billing"), TicketCategory::Billing);
        assert_eq!(sanitize_category("TECHNICAL"), TicketCategory::Technical);
        assert_eq!(sanitize_category("Account"), TicketCategory::Account);
        assert_eq!(sanitize_category("spam"), TicketCategory::General);
        assert_eq!(sanitize_category(""), TicketCategory::General);
        // No trimming: padded labels are not members of the set
        assert_eq!(sanitize_category(" billing"), TicketCategory::General);
    }

    #[test]
    fn test_sanitize_priority() {
        assert_eq!(sanitize_priority("low"), TicketPriority::Low);
        assert_eq!(sanitize_priority("HIGH"), TicketPriority::High);
        assert_eq!(sanitize_priority("Critical"), TicketPriority::Critical);
        assert_eq!(sanitize_priority("urgent"), TicketPriority::Medium);
        assert_eq!(sanitize_priority(""), TicketPriority::Medium);
    }

    // ==================== parse_classification ====================

    #[test]
    fn test_parse_normalizes_case() {
        let result = parse_classification(r#"{"category": "Billing", "priority": "HIGH"}"#).unwrap();
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Billing, TicketPriority::High)
        );
    }

    #[test]
    fn test_parse_defaults_invalid_fields_independently() {
        let result = parse_classification(r#"{"category": "spam", "priority": "urgent"}"#).unwrap();
        assert_eq!(result, ClassificationResult::default());

        let result = parse_classification(r#"{"category": "spam", "priority": "low"}"#).unwrap();
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::General, TicketPriority::Low)
        );

        let result =
            parse_classification(r#"{"category": "account", "priority": "urgent"}"#).unwrap();
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Account, TicketPriority::Medium)
        );
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let result = parse_classification(r#"{"category": "technical"}"#).unwrap();
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Technical, TicketPriority::Medium)
        );

        let result = parse_classification("{}").unwrap();
        assert_eq!(result, ClassificationResult::default());
    }

    #[test]
    fn test_parse_ignores_extra_keys() {
        let result = parse_classification(
            r#"{"category": "account", "priority": "critical", "reason": "locked out"}"#,
        )
        .unwrap();
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Account, TicketPriority::Critical)
        );
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            parse_classification("not json at all"),
            Err(ClassifierError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"category": "billing","#),
            Err(ClassifierError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_classification(""),
            Err(ClassifierError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            parse_classification(r#"["billing", "high"]"#),
            Err(ClassifierError::InvalidShape(_))
        ));
        assert!(matches!(
            parse_classification(r#""billing""#),
            Err(ClassifierError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_string_fields() {
        assert!(matches!(
            parse_classification(r#"{"category": 3, "priority": "high"}"#),
            Err(ClassifierError::InvalidShape(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"category": "billing", "priority": null}"#),
            Err(ClassifierError::InvalidShape(_))
        ));
    }

    // ==================== unconfigured mode ====================

    #[tokio::test]
    async fn test_unconfigured_returns_default_without_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(completion(r#"{"category": "billing"}"#));
            })
            .await;

        let config = ClassifierConfig {
            api_key: None,
            ..service_config(server.base_url())
        };
        let classifier = LlmClassifier::new(config);
        assert!(!classifier.is_configured());

        assert_eq!(classifier.classify("").await, ClassificationResult::default());
        for _ in 0..25 {
            let description: String = Sentence(3..20).fake();
            assert_eq!(
                classifier.classify(&description).await,
                ClassificationResult::default()
            );
        }

        mock.assert_hits_async(0).await;
    }

    // ==================== service mode ====================

    #[tokio::test]
    async fn test_service_mode_sends_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(
                        r#"{
                            "model": "gpt-3.5-turbo",
                            "temperature": 0.3,
                            "max_tokens": 60,
                            "response_format": { "type": "json_object" }
                        }"#,
                    )
                    .body_contains("Categories: billing, technical, account, general.")
                    .body_contains("Priorities: low, medium, high, critical.")
                    .body_contains("Description: I was charged twice this month");
                then.status(200)
                    .json_body(completion(r#"{"category": "billing", "priority": "high"}"#));
            })
            .await;

        let classifier = LlmClassifier::new(service_config(server.base_url()));
        let result = classifier.classify("I was charged twice this month").await;

        mock.assert_async().await;
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Billing, TicketPriority::High)
        );
    }

    #[tokio::test]
    async fn test_service_mode_normalizes_case() {
        let result = classify_with_content(r#"{"category": "Billing", "priority": "HIGH"}"#).await;
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Billing, TicketPriority::High)
        );
    }

    #[tokio::test]
    async fn test_service_mode_invalid_values_default() {
        let result = classify_with_content(r#"{"category": "spam", "priority": "urgent"}"#).await;
        assert_eq!(result, ClassificationResult::default());
    }

    #[tokio::test]
    async fn test_service_mode_partial_response() {
        let result = classify_with_content(r#"{"category": "technical"}"#).await;
        assert_eq!(
            result,
            ClassificationResult::new(TicketCategory::Technical, TicketPriority::Medium)
        );
    }

    #[tokio::test]
    async fn test_service_mode_malformed_content_defaults() {
        let result = classify_with_content("Sure! The category is billing.").await;
        assert_eq!(result, ClassificationResult::default());
    }

    #[tokio::test]
    async fn test_service_error_status_defaults() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("upstream exploded");
            })
            .await;

        let classifier = LlmClassifier::new(service_config(server.base_url()));
        let result = classifier.classify("Cannot log in").await;

        mock.assert_async().await;
        assert_eq!(result, ClassificationResult::default());
    }

    #[tokio::test]
    async fn test_malformed_response_body_defaults() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .body("{not valid json");
            })
            .await;

        let classifier = LlmClassifier::new(service_config(server.base_url()));
        let result = classifier.classify("Cannot log in").await;

        mock.assert_async().await;
        assert_eq!(result, ClassificationResult::default());
    }

    #[tokio::test]
    async fn test_empty_choices_defaults() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let classifier = LlmClassifier::new(service_config(server.base_url()));
        assert_eq!(
            classifier.classify("Cannot log in").await,
            ClassificationResult::default()
        );
    }

    #[tokio::test]
    async fn test_timeout_defaults() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(completion(r#"{"category": "billing", "priority": "high"}"#));
            })
            .await;

        let config = ClassifierConfig {
            timeout: Duration::from_millis(200),
            ..service_config(server.base_url())
        };
        let classifier = LlmClassifier::new(config);
        assert_eq!(
            classifier.classify("Refund please").await,
            ClassificationResult::default()
        );
    }

    #[tokio::test]
    async fn test_connection_refused_defaults() {
        // Port 9 (discard) is not listening on test hosts
        let classifier = LlmClassifier::new(service_config("http://127.0.0.1:9".to_string()));
        assert_eq!(
            classifier.classify("Refund please").await,
            ClassificationResult::default()
        );
    }
}
