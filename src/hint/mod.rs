//! Hint Generator: classifies the gap between a student's answer and the
//! reference solution into an actionable, non-revealing hint.
//!
//! The model receives the full conversation history plus both structured
//! records and must pick exactly one of three categories. History is
//! consulted so a previously given hint is not repeated verbatim; if an
//! earlier hint did not land, the next one approaches the same gap from a
//! different angle. Decoding and validation mirror the answer parser: any
//! payload outside the three recognized categories is a fatal protocol
//! violation, never a well-formed hint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::answer::{ParsedAnswer, Solution};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::utils::json_extraction::extract_json_object;

/// System prompt describing the three hint categories and their shapes.
const HINT_SYSTEM_PROMPT: &str = r#"You are a math hint generator.
Compare the student's answer to the correct solution and generate a hint to guide them towards the correct answer.
Review the conversation history to avoid repeating hints already given.
Each hint should move the student forward. If a previous hint didn't work, try a different angle.

The hint should be specific to the student's current answer and should not give away the solution.
Focus on the incorrect steps / the next step the student should take to move closer to the correct answer.

First compare the student's reasoning steps to the solution's steps and identify where the student's answer deviates from the correct solution.
1. If the student's reasoning is incorrect, generate a hint that explains the error in their reasoning and how to correct it without giving explicit answers:
{ "type": "incorrect_reasoning", "message": "string describing the hint" }

2. If the student's reasoning is correct but they are missing a step, generate a hint that guides them towards the next step they should take:
{ "type": "next_step", "message": "string describing the hint" }

3. If the student's reasoning is correct but they have made a calculation error, generate a hint that points out the specific calculation error and how to fix it:
{ "type": "calculation_error", "message": "string describing the hint" }

Always return the hint as a JSON object in one of the above formats, never return plain text."#;

/// The three recognized hint categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    /// The chosen method diverges from the solution's approach at some
    /// step, independent of arithmetic.
    IncorrectReasoning,
    /// Reasoning so far is consistent with the solution but incomplete.
    NextStep,
    /// The approach matches but at least one evaluated result disagrees
    /// with the stated result.
    CalculationError,
}

/// A single classified, non-revealing nudge returned to the student.
/// Produced fresh per turn; never persisted except via conversation
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    /// Classified deviation category.
    #[serde(rename = "type")]
    pub kind: HintKind,
    /// The hint text shown to the student.
    pub message: String,
}

/// Configuration for the hint generator.
#[derive(Debug, Clone)]
pub struct HintGeneratorConfig {
    /// Model identifier. Classification work; a cheaper model is fine.
    pub model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Maximum tokens for the hint payload.
    pub max_tokens: u32,
}

impl Default for HintGeneratorConfig {
    fn default() -> Self {
        Self {
            model: crate::config::ModelConfig::default().hint_model,
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

impl HintGeneratorConfig {
    /// Set the model for hint generation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Hint generator backed by an LLM collaborator.
pub struct HintGenerator {
    llm_client: Arc<dyn LlmProvider>,
    config: HintGeneratorConfig,
}

impl std::fmt::Debug for HintGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HintGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HintGenerator {
    /// Create a new hint generator.
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: HintGeneratorConfig) -> Self {
        Self { llm_client, config }
    }

    /// Create a hint generator with default configuration.
    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, HintGeneratorConfig::default())
    }

    /// Classify the deviation between `student_answer` and `solution` into
    /// a hint.
    ///
    /// The history is only read; the comparison turn is appended to a
    /// private copy.
    pub async fn hint(
        &self,
        student_answer: &ParsedAnswer,
        solution: &Solution,
        history: &[Message],
    ) -> PipelineResult<Hint> {
        let comparison = format!(
            "Student's answer:\n{}\n\nCorrect solution:\n{}",
            serde_json::to_string_pretty(student_answer)?,
            serde_json::to_string_pretty(solution)?,
        );

        let mut messages = vec![Message::system(HINT_SYSTEM_PROMPT)];
        messages.extend_from_slice(history);
        messages.push(Message::user(comparison));

        let request = GenerationRequest::new(self.config.model.clone(), messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm_client.generate(request).await?;
        let content = response
            .first_content()
            .ok_or(PipelineError::EmptyResponse)?;

        let json = extract_json_object(content).ok_or_else(|| {
            tracing::warn!("No JSON payload in hint response");
            PipelineError::protocol_violation("hint generator", content)
        })?;

        serde_json::from_str::<Hint>(&json).map_err(|_| {
            tracing::warn!(payload = %json, "Hint payload failed schema validation");
            PipelineError::protocol_violation("hint generator", &json)
        })
    }
}
