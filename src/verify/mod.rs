//! Result normalization and per-step calculation verification.
//!
//! The normalizer canonicalizes heterogeneous textual results ("$25
//! dollars", "¥6,400", "25 apples") into a comparable numeric string so
//! that currency symbols, units and surrounding prose never cause false
//! mismatches. The verifier runs the evaluator and normalizer over every
//! step of a parsed answer, annotating each with its evaluated result and
//! a match flag. Both are pure; neither touches the network.

use tracing::warn;

use crate::answer::ParsedAnswer;
use crate::eval::evaluate;

/// Strip every character that is not a digit, decimal point, forward slash
/// or minus sign.
///
/// Total and idempotent: `normalize(normalize(x)) == normalize(x)` for all
/// inputs. Applied symmetrically to evaluated and stated results before
/// comparison.
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '/' | '-'))
        .collect()
}

/// Verify every step of a parsed answer, returning an annotated copy.
///
/// Steps are verified independently; an evaluation failure in one step
/// never blocks the others. A failed evaluation normalizes to the empty
/// string, which is defined to mismatch everything, including a stated
/// result that also normalizes to empty, so an all-empty comparison is
/// never reported as a match.
pub fn verify_calculations(answer: &ParsedAnswer) -> ParsedAnswer {
    let steps = answer
        .steps
        .iter()
        .map(|step| {
            let evaluated = match evaluate(&step.math_expression) {
                Ok(result) => normalize(&result),
                Err(err) => {
                    warn!(
                        expression = %err.expression(),
                        error = %err,
                        "Expression evaluation failed; treating as mismatch"
                    );
                    String::new()
                }
            };
            let stated = normalize(&step.natural_language_result);
            let is_matching = !evaluated.is_empty() && evaluated == stated;

            let mut verified = step.clone();
            verified.evaluated_result = Some(evaluated);
            verified.is_matching = Some(is_matching);
            verified
        })
        .collect();

    ParsedAnswer {
        problem: answer.problem.clone(),
        steps,
        original_answer: answer.original_answer.clone(),
    }
}
