//! HTTP client for OpenAI-compatible chat-completion endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::LlmError;

/// A single role-tagged turn in a conversation.
///
/// The pipeline reads conversation history as a slice of these and never
/// mutates a caller's history; components that need to extend it clone
/// into a private transcript first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender ("system", "user" or "assistant").
    pub role: String,
    /// Text content of the turn.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a single text completion.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Model identifier to use for generation.
    pub model: String,
    /// Conversation messages, system instruction first.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request with default sampling parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResponse {
    /// Model that generated this response.
    #[serde(default)]
    pub model: String,
    /// Generated choices.
    pub choices: Vec<Choice>,
    /// Token usage statistics, when the endpoint reports them.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl GenerationResponse {
    /// The text content of the first choice.
    ///
    /// Returns `None` when the endpoint produced no choice or a choice
    /// without text content; the pipeline treats that as a fatal
    /// integration fault rather than an empty answer.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}

/// A single generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Generated message. Content is optional at the wire level; a missing
    /// or non-text segment surfaces as `None`.
    pub message: ResponseMessage,
    /// Reason the generation stopped.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message body of a generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Trait for LLM collaborators that can produce a text completion.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Client for OpenAI-compatible chat-completion APIs.
pub struct CompletionClient {
    api_base: String,
    api_key: Option<String>,
    http_client: Client,
}

impl CompletionClient {
    /// Create a new client with explicit configuration.
    pub fn new(api_base: String, api_key: Option<String>) -> Self {
        Self {
            api_base,
            api_key,
            http_client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Create a client from environment variables.
    ///
    /// Reads `STEPCHECK_API_BASE` (required) and `STEPCHECK_API_KEY`
    /// (optional).
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = env::var("STEPCHECK_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let api_key = env::var("STEPCHECK_API_KEY").ok();
        Ok(Self::new(api_base, api_key))
    }

    /// The configured API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

/// Error response body from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for CompletionClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut http_request = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let http_response = http_request
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            let message = serde_json::from_str::<ApiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            return Err(LlmError::ApiError {
                code: status.as_u16(),
                message,
            });
        }

        http_response
            .json::<GenerationResponse>()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::system("a").role, "system");
        assert_eq!(Message::user("b").role, "user");
        assert_eq!(Message::assistant("c").role, "assistant");
    }

    #[test]
    fn request_builder_sets_sampling_params() {
        let request = GenerationRequest::new("test-model", vec![Message::user("hi")])
            .with_temperature(0.0)
            .with_max_tokens(1024);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(1024));
    }

    #[test]
    fn first_content_requires_text() {
        let response = GenerationResponse {
            model: "test".to_string(),
            choices: vec![Choice {
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: None,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        };
        assert!(response.first_content().is_none());

        let empty = GenerationResponse {
            model: "test".to_string(),
            choices: vec![],
            usage: None,
        };
        assert!(empty.first_content().is_none());
    }

    #[test]
    fn request_serializes_without_unset_params() {
        let request = GenerationRequest::new("m", vec![Message::user("hi")]);
        let json = serde_json::to_string(&request).expect("serializable");
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }
}
