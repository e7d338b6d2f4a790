//! Answer Parser: converts conversation history into structured reasoning
//! steps.
//!
//! Extraction itself is delegated to the model collaborator under a fixed
//! instruction; this component's own responsibility is stripping fencing
//! artifacts, decoding the payload, validating its shape against the
//! recognized schemas, and classifying exactly one of the outcomes. A
//! payload matching neither schema is a fatal protocol violation, signaled
//! distinctly from the three recognized parsing error codes.

use std::sync::Arc;

use crate::answer::ParseOutcome;
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::utils::json_extraction::extract_json_object;

/// System prompt instructing the model to extract reasoning steps.
const PARSE_SYSTEM_PROMPT: &str = r#"You are a math reasoning parser.
Look at the conversation history and extract the student's reasoning steps from their latest answer.

Return ONLY valid JSON in this exact shape, no explanation, no markdown:
{
  "problem": "the original question or problem statement",
  "steps": [
    {
      "naturalLanguage": "string describing the reasoning step",
      "mathExpression": "string containing the arithmetic expression, e.g. 8000 * 0.8",
      "naturalLanguageResult": "string describing the result in natural language"
    }
  ],
  "originalAnswer": "the original answer text verbatim"
}

If the latest message is not related to a math problem, return:
{ "error": "NOT_RELATED" }

If the latest message is empty or has no answer:
{ "error": "EMPTY_ANSWER" }

If no math can be parsed from the answer:
{ "error": "NOT_MATH" }"#;

/// Configuration for the answer parser.
#[derive(Debug, Clone)]
pub struct AnswerParserConfig {
    /// Model identifier. Extraction work; a cheaper model is fine here.
    pub model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Maximum tokens for the structured payload.
    pub max_tokens: u32,
}

impl Default for AnswerParserConfig {
    fn default() -> Self {
        Self {
            model: crate::config::ModelConfig::default().parser_model,
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

impl AnswerParserConfig {
    /// Set the model for this parser.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Answer parser backed by an LLM collaborator.
pub struct AnswerParser {
    llm_client: Arc<dyn LlmProvider>,
    config: AnswerParserConfig,
}

impl std::fmt::Debug for AnswerParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerParser")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnswerParser {
    /// Create a new answer parser.
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: AnswerParserConfig) -> Self {
        Self { llm_client, config }
    }

    /// Create an answer parser with default configuration.
    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, AnswerParserConfig::default())
    }

    /// Parse the latest turn of `history` into a structured outcome.
    ///
    /// Returns exactly one of a [`ParseOutcome::Answer`] or a classified
    /// [`ParseOutcome::Error`]; any other decoded shape is a
    /// [`PipelineError::ProtocolViolation`]. The history is only read,
    /// never mutated.
    pub async fn parse(&self, history: &[Message]) -> PipelineResult<ParseOutcome> {
        let mut messages = vec![Message::system(PARSE_SYSTEM_PROMPT)];
        messages.extend_from_slice(history);

        let request = GenerationRequest::new(self.config.model.clone(), messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm_client.generate(request).await?;
        let content = response
            .first_content()
            .ok_or(PipelineError::EmptyResponse)?;

        let json = extract_json_object(content).ok_or_else(|| {
            tracing::warn!(content_preview = %preview(content), "No JSON payload in parser response");
            PipelineError::protocol_violation("answer parser", content)
        })?;

        let value: serde_json::Value = serde_json::from_str(&json)?;
        ParseOutcome::from_json(value).ok_or_else(|| {
            tracing::warn!(payload = %json, "Parser payload matched neither answer nor error schema");
            PipelineError::protocol_violation("answer parser", &json)
        })
    }
}

fn preview(content: &str) -> &str {
    let trimmed = content.trim();
    let end = trimmed
        .char_indices()
        .nth(100)
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
