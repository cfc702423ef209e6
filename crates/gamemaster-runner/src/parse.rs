//! Composer response parsing into [`ComposedContent`].
//!
//! The LLM is asked for `{"outcome": ..., "content_prompts": {...}}` but
//! models wrap JSON in prose, code fences, or leave trailing commas. This
//! module tries several recovery strategies before giving up.

use std::collections::BTreeMap;

use gamemaster_core::fallback;
use gamemaster_types::{ComposedContent, ContentKind};
use tracing::warn;

use crate::error::RunnerError;

/// Intermediate struct for deserializing the raw composer JSON.
#[derive(Debug, serde::Deserialize)]
struct RawComposition {
    outcome: String,
    #[serde(default)]
    content_prompts: BTreeMap<String, serde_json::Value>,
}

/// Parse a composer response into outcome plus exactly four prompts.
///
/// Attempts multiple recovery strategies if the raw text is not clean JSON:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Take the outermost `{...}` span
/// 4. Strip trailing commas from each candidate and retry
///
/// Prompt kinds the model left out (or left empty) are filled from the
/// fixed prompts; unknown keys are ignored.
///
/// # Errors
///
/// Returns [`RunnerError::Parse`] if no strategy yields an outcome.
pub fn parse_composition(raw: &str) -> Result<ComposedContent, RunnerError> {
    let parsed = try_parse(raw)?;

    let mut prompts = BTreeMap::new();
    for (key, value) in parsed.content_prompts {
        let Some(kind) = ContentKind::from_key(&key) else {
            warn!(key = %key, "ignoring unknown content kind in composer response");
            continue;
        };
        if let Some(text) = value.as_str().map(str::trim).filter(|t| !t.is_empty()) {
            prompts.insert(kind, text.to_owned());
        }
    }
    for kind in ContentKind::ALL {
        prompts.entry(kind).or_insert_with(|| {
            warn!(kind = %kind, "composer response missing prompt, using fixed prompt");
            fallback::prompt_for(kind).to_owned()
        });
    }

    let outcome = parsed.outcome.trim();
    if outcome.is_empty() {
        return Err(RunnerError::Parse("composer returned an empty outcome".to_owned()));
    }

    Ok(ComposedContent {
        outcome: outcome.to_owned(),
        prompts,
    })
}

/// Attempt to parse the response through multiple recovery strategies.
fn try_parse(raw: &str) -> Result<RawComposition, RunnerError> {
    let trimmed = raw.trim();

    let candidates = [
        Some(trimmed),
        extract_json_from_codeblock(trimmed),
        extract_outer_object(trimmed),
    ];

    for candidate in candidates.iter().flatten() {
        if let Ok(parsed) = serde_json::from_str::<RawComposition>(candidate) {
            return Ok(parsed);
        }
        let cleaned = strip_trailing_commas(candidate);
        if let Ok(parsed) = serde_json::from_str::<RawComposition>(&cleaned) {
            return Ok(parsed);
        }
    }

    Err(RunnerError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Extract the body of the first markdown code block, if any.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    let body_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Take the span from the first `{` to the last `}`.
fn extract_outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Remove commas that directly precede a closing brace or bracket.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            continue;
        }

        if c == ',' {
            let mut lookahead = chars.clone();
            let next_significant = lookahead.find(|n| !n.is_whitespace());
            if matches!(next_significant, Some('}' | ']')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{
        "outcome": "The crew powers down the artifact.",
        "content_prompts": {
            "image": "crew around a dim artifact",
            "video": "lights fading across the bridge",
            "3d_scene": "the artifact in a containment field",
            "voiceover": "Captain's log: silence at last"
        }
    }"#;

    #[test]
    fn parses_clean_json() {
        let content = parse_composition(CLEAN).unwrap();
        assert_eq!(content.outcome, "The crew powers down the artifact.");
        assert_eq!(content.prompts.len(), 4);
        assert_eq!(
            content.prompts.get(&ContentKind::Scene3d).map(String::as_str),
            Some("the artifact in a containment field")
        );
    }

    #[test]
    fn parses_fenced_block_with_prose() {
        let raw = format!("Here is the result:\n```json\n{CLEAN}\n```\nEnjoy!");
        let content = parse_composition(&raw).unwrap();
        assert_eq!(content.prompts.len(), 4);
    }

    #[test]
    fn parses_trailing_commas() {
        let raw = r#"{"outcome": "Escape.", "content_prompts": {"image": "a, b",},}"#;
        let content = parse_composition(raw).unwrap();
        assert_eq!(content.outcome, "Escape.");
        assert_eq!(
            content.prompts.get(&ContentKind::Image).map(String::as_str),
            Some("a, b")
        );
    }

    #[test]
    fn parses_object_embedded_in_prose() {
        let raw = r#"Sure! {"outcome": "Escape.", "content_prompts": {}} Hope that helps."#;
        assert!(parse_composition(raw).is_ok());
    }

    #[test]
    fn fills_missing_kinds_from_fixed_prompts() {
        let raw = r#"{"outcome": "Escape.", "content_prompts": {"video": "engines flare", "hologram": "x"}}"#;
        let content = parse_composition(raw).unwrap();
        assert_eq!(content.prompts.len(), 4);
        assert_eq!(
            content.prompts.get(&ContentKind::Video).map(String::as_str),
            Some("engines flare")
        );
        assert_eq!(
            content.prompts.get(&ContentKind::Voiceover).map(String::as_str),
            Some(fallback::prompt_for(ContentKind::Voiceover))
        );
    }

    #[test]
    fn rejects_unparseable_text() {
        let result = parse_composition("The crew decides to run. No JSON here.");
        assert!(matches!(result, Err(RunnerError::Parse(_))));
    }

    #[test]
    fn rejects_empty_outcome() {
        let result = parse_composition(r#"{"outcome": "  ", "content_prompts": {}}"#);
        assert!(matches!(result, Err(RunnerError::Parse(_))));
    }

    #[test]
    fn commas_inside_strings_survive() {
        assert_eq!(strip_trailing_commas(r#"{"a": "x,}",}"#), r#"{"a": "x,}"}"#);
    }
}
