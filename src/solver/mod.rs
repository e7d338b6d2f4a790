//! Reference Solver: produces a verified reference solution for a problem.
//!
//! Drives a generate -> parse -> verify -> (accept | corrective-retry)
//! loop. The model is good at producing correct reasoning but unreliable at
//! arithmetic, so instead of a generic "try again" the retry feedback lists
//! each mismatching step's stated and evaluated results; the retry ceiling
//! bounds cost. The solver never returns an unverified solution: it either
//! accepts a solution with every step matching or fails terminally.

use std::sync::Arc;

use tracing::debug;

use crate::answer::{ParseOutcome, ParsedAnswer, Solution};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::parser::AnswerParser;
use crate::verify::verify_calculations;

/// System prompt for solution generation.
const SOLVE_SYSTEM_PROMPT: &str = r#"You are a math tutor solving a problem step by step.
Solve the given problem showing every reasoning step clearly in natural language.
Show each calculation explicitly, e.g. "8000 * 0.8 = 6400".
Do not skip steps. Do not explain what you are doing meta-level, just solve it."#;

/// Corrective instruction prepended to the mismatch list on retry.
const RECALCULATE_PROMPT: &str = "The previous solution had some calculation errors. \
Please fix the calculations while keeping the same reasoning steps and natural language explanations.";

/// Configuration for the reference solver.
#[derive(Debug, Clone)]
pub struct ReferenceSolverConfig {
    /// Model identifier. Reasoning quality matters here; use the full
    /// model.
    pub model: String,
    /// Temperature for generation.
    pub temperature: f64,
    /// Maximum tokens per generated solution.
    pub max_tokens: u32,
    /// Total generation attempts before failing terminally.
    pub max_attempts: u32,
}

impl Default for ReferenceSolverConfig {
    fn default() -> Self {
        Self {
            model: crate::config::ModelConfig::default().solver_model,
            temperature: 0.2,
            max_tokens: 1024,
            max_attempts: 3,
        }
    }
}

impl ReferenceSolverConfig {
    /// Set the model for solution generation.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// States of the solve loop. Accepting a solution and failing terminally
/// are the two exits; everything else transitions here.
#[derive(Debug)]
enum SolverState {
    /// Ask the model for a step-by-step solution.
    Generate,
    /// Parse and numerically verify the transcript's latest answer.
    Verify,
    /// Append corrective feedback for the given annotated answer.
    Retry(ParsedAnswer),
}

/// Reference solver backed by an LLM collaborator.
///
/// A computed [`Solution`] should be cached by the caller per problem; the
/// solver itself is stateless across invocations.
pub struct ReferenceSolver {
    llm_client: Arc<dyn LlmProvider>,
    parser: AnswerParser,
    config: ReferenceSolverConfig,
}

impl std::fmt::Debug for ReferenceSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceSolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReferenceSolver {
    /// Create a new reference solver.
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: ReferenceSolverConfig) -> Self {
        let parser = AnswerParser::with_defaults(llm_client.clone());
        Self {
            llm_client,
            parser,
            config,
        }
    }

    /// Create a reference solver with default configuration.
    pub fn with_defaults(llm_client: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm_client, ReferenceSolverConfig::default())
    }

    /// Produce a verified solution for `problem`.
    ///
    /// Every step of the returned solution carries `is_matching == true`.
    /// Fails with [`PipelineError::SolutionUnparsable`] when the parser
    /// rejects a generated solution, and with
    /// [`PipelineError::RetriesExhausted`] when no attempt within the
    /// ceiling verifies cleanly.
    pub async fn solve(&self, problem: &str) -> PipelineResult<Solution> {
        let mut transcript = vec![Message::user(problem)];
        let mut attempts: u32 = 0;
        let mut state = SolverState::Generate;

        loop {
            state = match state {
                SolverState::Generate => {
                    if attempts >= self.config.max_attempts {
                        return Err(PipelineError::RetriesExhausted { attempts });
                    }
                    attempts += 1;
                    let text = self.generate_solution(&transcript).await?;
                    transcript.push(Message::assistant(text));
                    SolverState::Verify
                }
                SolverState::Verify => match self.parser.parse(&transcript).await? {
                    ParseOutcome::Error(code) => {
                        return Err(PipelineError::SolutionUnparsable(code));
                    }
                    ParseOutcome::Answer(answer) => {
                        let checked = verify_calculations(&answer);
                        if checked.all_matching() {
                            debug!(attempts, steps = checked.steps.len(), "Reference solution accepted");
                            return Ok(checked);
                        }
                        SolverState::Retry(checked)
                    }
                },
                SolverState::Retry(checked) => {
                    let feedback = build_retry_feedback(&checked);
                    debug!(attempts, "Reference solution had calculation errors; retrying");
                    transcript.push(Message::user(feedback));
                    SolverState::Generate
                }
            };
        }
    }

    /// Run one generation over the transcript, returning the model's text.
    async fn generate_solution(&self, transcript: &[Message]) -> PipelineResult<String> {
        let mut messages = vec![Message::system(SOLVE_SYSTEM_PROMPT)];
        messages.extend_from_slice(transcript);

        let request = GenerationRequest::new(self.config.model.clone(), messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm_client.generate(request).await?;
        response
            .first_content()
            .map(str::to_string)
            .ok_or(PipelineError::EmptyResponse)
    }
}

/// Corrective instruction listing each mismatching step's stated reasoning,
/// expression, expected (stated) result and actual (evaluated) result.
fn build_retry_feedback(checked: &ParsedAnswer) -> String {
    let mut feedback = String::from(RECALCULATE_PROMPT);
    feedback.push_str("\nIncorrect calculations found:");
    for step in checked.mismatched_steps() {
        feedback.push_str(&format!(
            "\n- Reasoning: {}\n  Expression: {}\n  Expected Result: {}\n  Actual Result: {}",
            step.natural_language,
            step.math_expression,
            step.natural_language_result,
            step.evaluated_result.as_deref().unwrap_or(""),
        ));
    }
    feedback
}
