//! JSON object extraction from LLM responses.
//!
//! The pipeline instructs the model to return a single JSON object with no
//! extraneous text, but models routinely wrap the payload in markdown code
//! fences or surround it with prose. This module recovers the object from
//! such responses while staying intolerant of anything that is not valid
//! JSON: extraction only strips wrapping, it never repairs a payload.
//!
//! Strategies, in order:
//! 1. A ```json fenced block
//! 2. A generic ``` fenced block
//! 3. The first balanced `{...}` object anywhere in the content

use regex::Regex;

/// Extract a single JSON object from raw model output.
///
/// Returns `None` when no candidate parses as a JSON object; schema
/// validation of the decoded value is the caller's responsibility.
pub fn extract_json_object(content: &str) -> Option<String> {
    let trimmed = content.trim();

    if let Some(json) = extract_from_fence(trimmed, true) {
        return Some(json);
    }
    if let Some(json) = extract_from_fence(trimmed, false) {
        return Some(json);
    }

    let start = trimmed.find('{')?;
    let candidate = balanced_object(&trimmed[start..])?;
    if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
        return Some(candidate.to_string());
    }
    None
}

/// Extract an object from a fenced code block. When `json_tagged` is true
/// only ```json fences are considered, otherwise any fence qualifies.
fn extract_from_fence(content: &str, json_tagged: bool) -> Option<String> {
    let pattern = if json_tagged {
        r"```json\s*\n?([\s\S]*?)\n?```"
    } else {
        r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```"
    };
    // Pattern is a literal, compilation cannot fail
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(content)?;
    let block = caps.get(1)?.as_str().trim();

    let start = block.find('{')?;
    let candidate = balanced_object(&block[start..])?;
    if serde_json::from_str::<serde_json::Value>(candidate).is_ok() {
        return Some(candidate.to_string());
    }
    None
}

/// Return the prefix of `s` up to and including the brace that balances the
/// leading `{`, honoring string literals and escape sequences.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
