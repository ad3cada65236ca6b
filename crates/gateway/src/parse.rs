//! Reply parsers for the gateway calls. Replies are treated as hostile:
//! fenced, prefixed, or otherwise decorated output is tolerated where it
//! can be recovered deterministically, everything else is an error the
//! engine turns into a fallback.

use std::collections::BTreeMap;

use serde_json::Value;

use mentor_core::{ParameterBundle, ToolKind};

use crate::GatewayError;

/// Confidence assumed when the reply omits the field, matching the
/// behavior the extraction prompt documents.
const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Metadata keys that are not candidate field values.
const META_KEYS: &[&str] = &["inferred", "missing", "confidence"];

/// Strip a leading/trailing markdown code fence, with or without a
/// language tag.
pub fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Interpret a classification reply as a tool id. Accepts surrounding
/// noise as long as exactly one tool name is recognizable.
pub fn parse_tool_reply(reply: &str) -> Option<ToolKind> {
    let cleaned = strip_code_fences(reply).trim().trim_matches('"').to_ascii_lowercase();
    if let Some(tool) = ToolKind::parse(&cleaned) {
        return Some(tool);
    }

    let mentioned: Vec<ToolKind> =
        ToolKind::ALL.into_iter().filter(|tool| cleaned.contains(tool.as_str())).collect();
    match mentioned.as_slice() {
        [tool] => Some(*tool),
        _ => None,
    }
}

/// Keyword heuristics over the raw learner message, used when the model
/// reply was unrecognizable. Mirrors the rules the classification prompt
/// states.
pub fn keyword_tool_hint(message: &str) -> Option<ToolKind> {
    let text = message.to_ascii_lowercase();

    const NOTE_CUES: &[&str] = &["note", "summary", "summarize", "study guide", "write down"];
    const PRACTICE_CUES: &[&str] =
        &["flashcard", "flash card", "question", "quiz", "practice", "test me"];
    const EXPLAIN_CUES: &[&str] =
        &["explain", "what is", "what are", "how does", "why", "understand", "confused"];

    if NOTE_CUES.iter().any(|cue| text.contains(cue)) {
        Some(ToolKind::NoteMaker)
    } else if PRACTICE_CUES.iter().any(|cue| text.contains(cue)) {
        Some(ToolKind::FlashcardGenerator)
    } else if EXPLAIN_CUES.iter().any(|cue| text.contains(cue)) {
        Some(ToolKind::ConceptExplainer)
    } else {
        None
    }
}

/// Decode a structured extraction reply into a parameter bundle.
///
/// The reply must be a JSON object; field values are kept verbatim,
/// the `inferred`/`missing`/`confidence` metadata is split out, and the
/// confidence is clamped into [0, 1].
pub fn parse_extraction_reply(
    tool: ToolKind,
    reply: &str,
) -> Result<ParameterBundle, GatewayError> {
    let cleaned = strip_code_fences(reply);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|error| GatewayError::UnusableReply(format!("invalid JSON: {error}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| GatewayError::UnusableReply("reply is not a JSON object".to_string()))?;

    let confidence = match object.get("confidence") {
        None => DEFAULT_CONFIDENCE,
        Some(value) => value.as_f64().ok_or_else(|| {
            GatewayError::UnusableReply("confidence is not a number".to_string())
        })?,
    };

    let inferred_names = string_list(object.get("inferred"));
    let missing = string_list(object.get("missing"));

    let mut fields = BTreeMap::new();
    for (name, value) in object {
        if META_KEYS.contains(&name.as_str()) || value.is_null() {
            continue;
        }
        fields.insert(name.clone(), value.clone());
    }

    let mut inferred = BTreeMap::new();
    for name in inferred_names {
        if let Some(value) = fields.get(&name) {
            inferred.insert(name, render_value(value));
        }
    }

    Ok(ParameterBundle::new(tool, fields, inferred, confidence, missing))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use mentor_core::ToolKind;

    use super::{
        keyword_tool_hint, parse_extraction_reply, parse_tool_reply, strip_code_fences,
    };
    use crate::GatewayError;

    #[test]
    fn strips_fences_with_and_without_language_tag() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\nnote_maker\n```"), "note_maker");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }

    #[test]
    fn parses_exact_and_noisy_tool_replies() {
        assert_eq!(parse_tool_reply("note_maker"), Some(ToolKind::NoteMaker));
        assert_eq!(parse_tool_reply("\"flashcard_generator\"\n"), Some(ToolKind::FlashcardGenerator));
        assert_eq!(
            parse_tool_reply("The right tool is concept_explainer."),
            Some(ToolKind::ConceptExplainer)
        );
        // ambiguous mentions are rejected rather than guessed
        assert_eq!(parse_tool_reply("note_maker or concept_explainer"), None);
        assert_eq!(parse_tool_reply("essay_writer"), None);
    }

    #[test]
    fn keyword_hint_follows_documented_cues() {
        assert_eq!(keyword_tool_hint("Can you summarize chapter 3?"), Some(ToolKind::NoteMaker));
        assert_eq!(
            keyword_tool_hint("quiz me on the French Revolution"),
            Some(ToolKind::FlashcardGenerator)
        );
        assert_eq!(
            keyword_tool_hint("I'm confused, explain entropy"),
            Some(ToolKind::ConceptExplainer)
        );
        assert_eq!(keyword_tool_hint("help"), None);
    }

    #[test]
    fn extraction_reply_splits_fields_and_metadata() {
        let reply = r#"```json
        {
            "topic": "photosynthesis",
            "count": 8,
            "difficulty": "easy",
            "subject": "biology",
            "inferred": ["subject"],
            "missing": [],
            "confidence": 0.92
        }
        ```"#;

        let bundle =
            parse_extraction_reply(ToolKind::FlashcardGenerator, reply).expect("parse bundle");

        assert_eq!(bundle.tool, ToolKind::FlashcardGenerator);
        assert_eq!(bundle.fields.len(), 4);
        assert_eq!(bundle.fields["count"], 8);
        assert_eq!(bundle.inferred.get("subject").map(String::as_str), Some("biology"));
        assert!(bundle.missing_required.is_empty());
        assert!((bundle.confidence - 0.92).abs() < f64::EPSILON);
        assert!(!bundle.explicit_fields().contains_key("subject"));
    }

    #[test]
    fn missing_confidence_defaults_and_excess_is_clamped() {
        let bundle = parse_extraction_reply(
            ToolKind::NoteMaker,
            r#"{"topic": "cells", "missing": ["subject"]}"#,
        )
        .expect("parse bundle");
        assert!((bundle.confidence - 0.8).abs() < f64::EPSILON);

        let bundle = parse_extraction_reply(
            ToolKind::NoteMaker,
            r#"{"topic": "cells", "confidence": 7.5}"#,
        )
        .expect("parse bundle");
        assert_eq!(bundle.confidence, 1.0);
    }

    #[test]
    fn null_fields_are_dropped() {
        let bundle = parse_extraction_reply(
            ToolKind::ConceptExplainer,
            r#"{"concept_to_explain": "entropy", "current_topic": null, "missing": ["current_topic"]}"#,
        )
        .expect("parse bundle");

        assert!(!bundle.fields.contains_key("current_topic"));
        assert_eq!(bundle.missing_required, vec!["current_topic"]);
    }

    #[test]
    fn prose_and_non_object_replies_are_errors() {
        let error = parse_extraction_reply(ToolKind::NoteMaker, "I could not extract anything")
            .expect_err("prose reply should fail");
        assert!(matches!(error, GatewayError::UnusableReply(_)));

        let error = parse_extraction_reply(ToolKind::NoteMaker, r#"["topic"]"#)
            .expect_err("array reply should fail");
        assert!(matches!(error, GatewayError::UnusableReply(_)));
    }
}
