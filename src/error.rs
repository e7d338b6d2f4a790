//! Error types for the verification and hint pipeline.
//!
//! The pipeline distinguishes three layers of failure:
//! - Expression evaluation failures, recovered locally by the verifier
//!   (see [`EvalError`]).
//! - Expected parsing outcomes (`NOT_RELATED`, `EMPTY_ANSWER`, `NOT_MATH`),
//!   which are ordinary values, never errors.
//! - Fatal pipeline errors: transport failures, protocol violations by the
//!   model, and solver retry exhaustion (see [`PipelineError`]).

use thiserror::Error;

use crate::answer::ParsingError;

/// Errors that can occur while talking to the LLM endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: STEPCHECK_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while evaluating a math expression.
///
/// Carries the original expression so callers can log which step failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("Malformed expression '{expression}'")]
    Malformed { expression: String },

    #[error("Unknown function '{name}' in expression '{expression}'")]
    UnknownFunction { name: String, expression: String },

    #[error("Expression '{expression}' evaluated to a non-finite value")]
    NonFinite { expression: String },
}

impl EvalError {
    /// The expression that failed to evaluate.
    pub fn expression(&self) -> &str {
        match self {
            EvalError::Malformed { expression }
            | EvalError::UnknownFunction { expression, .. }
            | EvalError::NonFinite { expression } => expression,
        }
    }
}

/// Fatal errors raised by the pipeline components.
///
/// None of these are retried automatically except the calculation-mismatch
/// path inside the reference solver, which is bounded by its retry ceiling.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The LLM call itself failed (transport or API-level).
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The model returned no text content at all.
    #[error("LLM response contained no text content")]
    EmptyResponse,

    /// The model returned a payload that matches none of the expected
    /// schemas. This indicates a broken integration, not a user-facing
    /// outcome, and cannot be meaningfully retried at this layer.
    #[error("Protocol violation in {context}: unexpected payload '{preview}'")]
    ProtocolViolation { context: String, preview: String },

    /// The reference solver's own generated solution could not be parsed.
    /// A reference solution the parser rejects indicates a broken
    /// generation, not a transient calculation slip.
    #[error("Reference solution could not be parsed: {0:?}")]
    SolutionUnparsable(ParsingError),

    /// The reference solver exhausted its generation attempts without
    /// producing a self-consistent solution.
    #[error("Reference solver failed after {attempts} generation attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Build a protocol-violation error with a bounded payload preview.
    pub fn protocol_violation(context: impl Into<String>, payload: &str) -> Self {
        let trimmed = payload.trim();
        let preview_len = trimmed
            .char_indices()
            .nth(120)
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        PipelineError::ProtocolViolation {
            context: context.into(),
            preview: trimmed[..preview_len].to_string(),
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
