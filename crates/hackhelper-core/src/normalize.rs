//! Best-effort extraction of a JSON object from free-form model output
//!
//! This is a text scan, not a parser: the outermost brace span is tried
//! first, then a code-fence strip. Anything else is a [`AiError::MalformedResponse`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AiError;
use crate::providers::types::truncate_chars;

/// How much of an unparseable response is kept in the error
pub const SNIPPET_LIMIT: usize = 500;

/// First `{` through last `}`, across newlines
static OUTER_BRACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"));

/// Extract the first well-formed JSON object from model text
pub fn extract_json(text: &str) -> Result<Value, AiError> {
    if let Some(m) = OUTER_BRACES.find(text) {
        match serde_json::from_str::<Value>(m.as_str()) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => {}
            Err(e) => debug!("Brace span did not parse ({}), trying fence strip", e),
        }
    }

    let stripped = strip_code_fence(text);
    match serde_json::from_str::<Value>(stripped) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => {
            warn!("AI response is not valid JSON ({} chars)", text.len());
            Err(AiError::MalformedResponse {
                snippet: truncate_chars(text, SNIPPET_LIMIT),
            })
        }
    }
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` and a trailing ```` ``` ````
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json() {
        let value = extract_json("```json\n{\"a\":1}\n```").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_chatty_wrapper() {
        let value = extract_json("Sure! Here is the result: {\"a\": 1} Hope that helps!").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_nested_objects_use_outermost_span() {
        let text = "Result:\n{\"scores\": {\"wow_factor\": 7}, \"strengths\": [{\"title\": \"x\"}]}\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["scores"]["wow_factor"], 7);
        assert_eq!(value["strengths"][0]["title"], "x");
    }

    #[test]
    fn test_no_json_is_malformed() {
        let err = extract_json("no json here").unwrap_err();
        assert_eq!(
            err,
            AiError::MalformedResponse {
                snippet: "no json here".into()
            }
        );
    }

    #[test]
    fn test_broken_json_is_malformed() {
        let err = extract_json("{\"ideas\": [1, 2,}").unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(extract_json("```json\n[1, 2, 3]\n```").is_err());
        assert!(extract_json("42").is_err());
    }

    #[test]
    fn test_snippet_is_truncated() {
        let text = "x".repeat(2000);
        match extract_json(&text).unwrap_err() {
            AiError::MalformedResponse { snippet } => assert_eq!(snippet.len(), SNIPPET_LIMIT),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }
}
