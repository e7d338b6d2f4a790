//! Per-stage model selection.
//!
//! Reference solving needs the full-strength model since reasoning quality
//! matters there; answer parsing and hint generation are extraction and
//! classification work where a cheaper, faster model is fine.

use std::env;

/// Model identifiers for each pipeline stage.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model used by the reference solver.
    pub solver_model: String,
    /// Model used by the answer parser.
    pub parser_model: String,
    /// Model used by the hint generator.
    pub hint_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            solver_model: "claude-sonnet-4-5".to_string(),
            parser_model: "claude-haiku-4-5".to_string(),
            hint_model: "claude-haiku-4-5".to_string(),
        }
    }
}

impl ModelConfig {
    /// Build a configuration from environment variables, falling back to
    /// the defaults per stage.
    ///
    /// Reads `STEPCHECK_SOLVER_MODEL`, `STEPCHECK_PARSER_MODEL` and
    /// `STEPCHECK_HINT_MODEL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            solver_model: env::var("STEPCHECK_SOLVER_MODEL").unwrap_or(defaults.solver_model),
            parser_model: env::var("STEPCHECK_PARSER_MODEL").unwrap_or(defaults.parser_model),
            hint_model: env::var("STEPCHECK_HINT_MODEL").unwrap_or(defaults.hint_model),
        }
    }
}
