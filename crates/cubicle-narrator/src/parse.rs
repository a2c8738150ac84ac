//! LLM reply parsing into typed narrations and review verdicts.
//!
//! The LLM returns raw text (ideally JSON). Recovery strategies handle the
//! usual damage: markdown fences and trailing commas. Field values are
//! coerced leniently, since models vary in how they write numbers and
//! labels.

use cubicle_core::narrator::{Narration, ReviewVerdict};
use cubicle_core::num::trunc;
use cubicle_types::Intent;
use serde::de::DeserializeOwned;

use crate::error::NarratorRuntimeError;

/// Feedback used when the reviewer left the comment empty.
pub const DEFAULT_REVIEW_COMMENT: &str =
    "An average presentation. Be more specific about what you delivered.";

/// Reply text used when the model named no reply for an addressed colleague.
pub const DEFAULT_REPLY: &str = "Got it.";

/// Raw shape of a structured narration.
#[derive(Debug, serde::Deserialize)]
struct RawNarration {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    magnitude: Option<serde_json::Value>,
    #[serde(default)]
    npc_reply: Option<String>,
    #[serde(default)]
    npc_name: Option<String>,
    #[serde(default)]
    system_narrative: Option<String>,
    #[serde(default)]
    mood_change: Option<serde_json::Value>,
    #[serde(default)]
    trust_change: Option<serde_json::Value>,
}

/// Raw shape of a review verdict.
#[derive(Debug, serde::Deserialize)]
struct RawVerdict {
    #[serde(default)]
    score: Option<serde_json::Value>,
    #[serde(default)]
    comment: Option<String>,
}

/// Parse a structured narration.
///
/// `default_npc` names the speaker when the model omitted one. A missing
/// reply is replaced with [`DEFAULT_REPLY`] only when a colleague was
/// addressed.
pub fn parse_narration(
    raw: &str,
    default_npc: Option<&str>,
) -> Result<Narration, NarratorRuntimeError> {
    let parsed: RawNarration = recover(raw)?;
    let npc_name = non_empty(parsed.npc_name).or_else(|| default_npc.map(ToOwned::to_owned));
    let npc_reply = non_empty(parsed.npc_reply)
        .or_else(|| default_npc.map(|_| DEFAULT_REPLY.to_owned()));
    Ok(Narration {
        intent: parsed.intent.as_deref().and_then(Intent::from_label),
        magnitude: parsed.magnitude.as_ref().and_then(as_f64),
        npc_reply,
        npc_name,
        system_narrative: non_empty(parsed.system_narrative),
        mood_change: parsed.mood_change.as_ref().and_then(as_f64).map_or(0, trunc),
        trust_change: parsed.trust_change.as_ref().and_then(as_f64).map_or(0, trunc),
    })
}

/// Parse a review verdict. The score is clamped into `0..=100`.
pub fn parse_verdict(raw: &str) -> Result<ReviewVerdict, NarratorRuntimeError> {
    let parsed: RawVerdict = recover(raw)?;
    let score = parsed
        .score
        .as_ref()
        .and_then(as_f64)
        .ok_or_else(|| NarratorRuntimeError::Parse(format!("verdict has no score: {raw}")))?;
    let score = u8::try_from(trunc(score).clamp(0, 100)).unwrap_or(0);
    Ok(ReviewVerdict {
        score,
        comment: non_empty(parsed.comment).unwrap_or_else(|| DEFAULT_REVIEW_COMMENT.to_owned()),
    })
}

/// Deserialize `raw` through multiple recovery strategies:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from markdown code blocks
/// 3. Strip trailing commas and retry
/// 4. Code block, then strip commas
fn recover<T: DeserializeOwned>(raw: &str) -> Result<T, NarratorRuntimeError> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    let cleaned = strip_trailing_commas(trimmed);
    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    if let Some(json_str) = extract_json_from_codeblock(trimmed) {
        let cleaned_inner = strip_trailing_commas(json_str);
        if let Ok(parsed) = serde_json::from_str::<T>(&cleaned_inner) {
            return Ok(parsed);
        }
    }

    Err(NarratorRuntimeError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Numbers, or numeric strings such as `"+3"`.
fn as_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| {
            value
                .as_str()
                .and_then(|s| s.trim().trim_start_matches('+').parse().ok())
        })
        .filter(|v: &f64| v.is_finite())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
}

/// Extract JSON content from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let body_start = |tag: &str| {
        text.find(tag).map(|i| {
            let after_tag = i.checked_add(tag.len()).unwrap_or(i);
            text.get(after_tag..)
                .and_then(|s| s.find('\n'))
                .and_then(|nl| after_tag.checked_add(nl))
                .and_then(|pos| pos.checked_add(1))
                .unwrap_or(after_tag)
        })
    };
    let start = body_start("```json").or_else(|| body_start("```"))?;
    let remaining = text.get(start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let rest: String = chars.clone().skip_while(|n| n.is_whitespace()).take(1).collect();
            if rest == "}" || rest == "]" {
                continue;
            }
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_clean_narration() {
        let raw = r#"{"intent": "WORK", "magnitude": 1.2, "npc_reply": "Nice.", "npc_name": "Mei",
            "system_narrative": "You close three tickets.", "mood_change": -2, "trust_change": 5}"#;
        let n = parse_narration(raw, Some("Colleague")).unwrap();
        assert_eq!(n.intent, Some(Intent::Work));
        assert!((n.magnitude.unwrap() - 1.2).abs() < 1e-9);
        assert_eq!(n.npc_name.as_deref(), Some("Mei"));
        assert_eq!(n.system_narrative.as_deref(), Some("You close three tickets."));
        assert_eq!((n.mood_change, n.trust_change), (-2, 5));
    }

    #[test]
    fn social_label_and_string_numbers() {
        let raw = r#"{"intent": "social", "magnitude": "0.8", "mood_change": "+3", "trust_change": 2.9}"#;
        let n = parse_narration(raw, None).unwrap();
        assert_eq!(n.intent, Some(Intent::SmallTalk));
        assert!((n.magnitude.unwrap() - 0.8).abs() < 1e-9);
        assert_eq!((n.mood_change, n.trust_change), (3, 2));
        assert!(n.npc_reply.is_none());
    }

    #[test]
    fn empty_reply_to_addressed_colleague_is_filled() {
        let raw = r#"{"intent": "LEARN", "npc_reply": "", "npc_name": null}"#;
        let n = parse_narration(raw, Some("Old Zhang")).unwrap();
        assert_eq!(n.npc_reply.as_deref(), Some(DEFAULT_REPLY));
        assert_eq!(n.npc_name.as_deref(), Some("Old Zhang"));
    }

    #[test]
    fn fenced_json_with_trailing_comma() {
        let raw = "Here you go:\n```json\n{\"intent\": \"REFUSE\", \"magnitude\": 1.0,}\n```";
        let n = parse_narration(raw, None).unwrap();
        assert_eq!(n.intent, Some(Intent::Refuse));
    }

    #[test]
    fn unknown_intent_is_left_to_the_session() {
        let n = parse_narration(r#"{"intent": "DANCE"}"#, None).unwrap();
        assert!(n.intent.is_none());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_narration("I refuse to answer in JSON", None),
            Err(NarratorRuntimeError::Parse(_))
        ));
    }

    #[test]
    fn verdict_is_clamped_and_comment_defaulted() {
        let v = parse_verdict(r#"{"score": 130, "comment": ""}"#).unwrap();
        assert_eq!(v.score, 100);
        assert_eq!(v.comment, DEFAULT_REVIEW_COMMENT);

        let v = parse_verdict(r#"{"score": "72", "comment": "Clear ownership."}"#).unwrap();
        assert_eq!(v.score, 72);
        assert_eq!(v.comment, "Clear ownership.");
    }

    #[test]
    fn verdict_without_score_is_an_error() {
        assert!(parse_verdict(r#"{"comment": "ok"}"#).is_err());
    }

    #[test]
    fn strip_commas_keeps_inner_commas() {
        assert_eq!(strip_trailing_commas(r#"{"a": [1, 2,], "b": 3,}"#), r#"{"a": [1, 2], "b": 3}"#);
    }
}
