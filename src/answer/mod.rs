//! Structured answer model and payload schema validation.
//!
//! The model collaborator is untrusted at the boundary: every decoded
//! payload passes through [`ParseOutcome::from_json`], an explicit
//! shape-validating step, before being treated as structured data.
//! "Not math" and friends are expected outcomes and are modeled as values
//! ([`ParsingError`]), never as errors.

use serde::{Deserialize, Serialize};

/// One atomic calculation within an answer.
///
/// `evaluated_result` and `is_matching` are populated only by verification;
/// verification produces a new step record rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningStep {
    /// Natural-language description of the reasoning step.
    pub natural_language: String,
    /// Symbolic expression for the step's calculation.
    pub math_expression: String,
    /// The result as stated in the student's own words.
    pub natural_language_result: String,
    /// Normalized evaluated result, set by the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluated_result: Option<String>,
    /// Whether the evaluated result matches the stated one, set by the
    /// verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_matching: Option<bool>,
}

/// Structured decomposition of a free-text answer into ordered reasoning
/// steps. Order is solving order; later steps may depend on earlier
/// results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAnswer {
    /// The original question or problem statement.
    pub problem: String,
    /// Reasoning steps in solving order. Non-empty for any successfully
    /// parsed answer.
    pub steps: Vec<ReasoningStep>,
    /// The original answer text verbatim.
    pub original_answer: String,
}

impl ParsedAnswer {
    /// Whether every verified step matched its stated result.
    ///
    /// Unverified steps (no `is_matching` flag) count as non-matching.
    pub fn all_matching(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.is_matching == Some(true))
    }

    /// The steps whose evaluated result disagreed with the stated one.
    pub fn mismatched_steps(&self) -> impl Iterator<Item = &ReasoningStep> {
        self.steps
            .iter()
            .filter(|step| step.is_matching == Some(false))
    }
}

/// A [`ParsedAnswer`] known to be internally verified (all steps matching),
/// used as the ground truth for hinting. Structurally identical,
/// semantically distinct.
pub type Solution = ParsedAnswer;

/// Classified reasons a conversation turn could not be parsed into an
/// answer. Recoverable and expected; surfaced as a normal outcome value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParsingError {
    /// The latest message is not related to a math problem.
    NotRelated,
    /// The latest message is empty or contains no answer.
    EmptyAnswer,
    /// No math could be parsed from the answer.
    NotMath,
}

/// Wire shape of a parsing-error payload: `{"error": CODE}`.
#[derive(Debug, Deserialize)]
struct ParsingErrorPayload {
    error: ParsingError,
}

/// Outcome of parsing a conversation turn: exactly one of a structured
/// answer or a classified parsing error.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The turn was parsed into ordered reasoning steps.
    Answer(ParsedAnswer),
    /// The turn could not be parsed, for a recognized reason.
    Error(ParsingError),
}

impl ParseOutcome {
    /// Validate a decoded payload against the two recognized schemas.
    ///
    /// Returns `None` when the payload matches neither: the caller must
    /// treat that as a fatal protocol violation, not a parsing error. An
    /// answer with no steps fails validation: a successfully parsed answer
    /// is defined to have at least one step.
    pub fn from_json(value: serde_json::Value) -> Option<ParseOutcome> {
        if let Ok(payload) = serde_json::from_value::<ParsingErrorPayload>(value.clone()) {
            return Some(ParseOutcome::Error(payload.error));
        }
        if let Ok(answer) = serde_json::from_value::<ParsedAnswer>(value) {
            if !answer.steps.is_empty() {
                return Some(ParseOutcome::Answer(answer));
            }
        }
        None
    }
}
