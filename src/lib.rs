//! stepcheck: answer verification and hint pipeline for math word problems.
//!
//! This library compares a student's free-text reasoning against a
//! machine-generated reference solution and produces a targeted hint. The
//! pipeline turns conversational text into structured reasoning steps,
//! numerically verifies each step, self-corrects the reference solution
//! under a bounded retry policy, and classifies the deviation between
//! student and reference into one of three hint categories.

pub mod answer;
pub mod config;
pub mod error;
pub mod eval;
pub mod hint;
pub mod llm;
pub mod parser;
pub mod solver;
pub mod utils;
pub mod verify;

// Re-export commonly used types
pub use answer::{ParseOutcome, ParsedAnswer, ParsingError, ReasoningStep, Solution};
pub use error::{EvalError, LlmError, PipelineError, PipelineResult};
pub use hint::{Hint, HintGenerator, HintKind};
pub use parser::AnswerParser;
pub use solver::ReferenceSolver;
pub use verify::{normalize, verify_calculations};
