//! Validation engine: checks an extracted parameter bundle against the
//! static schema for its tool and, on success, builds the fully typed
//! tool input. Purely local, no network calls. Any value the builder
//! cannot interpret is treated as a validation failure, never a panic.

use serde_json::Value;

use crate::domain::extraction::ParameterBundle;
use crate::domain::message::ChatMessage;
use crate::domain::profile::LearnerProfile;
use crate::domain::tool::{
    ConceptExplainerInput, Difficulty, ExplanationDepth, FlashcardGeneratorInput, NoteMakerInput,
    NoteStyle, ToolInput, ToolKind,
};
use crate::schema::{schema_for, OptionalFieldSpec};

/// Result of validating one bundle. `missing` is the minimal ordered
/// list of missing or violated required fields; it is authoritative and
/// replaces whatever the extraction reported.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub tool_input: Option<ToolInput>,
    pub missing: Vec<String>,
}

impl ValidationOutcome {
    fn failed(missing: Vec<String>) -> Self {
        Self { passed: false, tool_input: None, missing }
    }
}

pub fn validate_bundle(
    bundle: &ParameterBundle,
    profile: &LearnerProfile,
    history: &[ChatMessage],
) -> ValidationOutcome {
    let schema = schema_for(bundle.tool);

    let mut missing = Vec::new();
    for spec in schema.required {
        match bundle.fields.get(spec.name) {
            Some(value) if !value.is_null() => {
                if !spec.constraint.accepts(value) {
                    missing.push(spec.name.to_string());
                }
            }
            _ => missing.push(spec.name.to_string()),
        }
    }

    if !missing.is_empty() {
        return ValidationOutcome::failed(missing);
    }

    match build_tool_input(bundle, profile, history) {
        Some(tool_input) => {
            ValidationOutcome { passed: true, tool_input: Some(tool_input), missing: Vec::new() }
        }
        // Constraints passed but a value still failed to convert; report
        // every required field so the clarification covers the tool.
        None => ValidationOutcome::failed(
            schema.required.iter().map(|spec| spec.name.to_string()).collect(),
        ),
    }
}

fn build_tool_input(
    bundle: &ParameterBundle,
    profile: &LearnerProfile,
    history: &[ChatMessage],
) -> Option<ToolInput> {
    let schema = schema_for(bundle.tool);

    match bundle.tool {
        ToolKind::NoteMaker => Some(ToolInput::NoteMaker(NoteMakerInput {
            user_info: profile.clone(),
            chat_history: history.to_vec(),
            topic: text_field(bundle, "topic")?,
            subject: text_field(bundle, "subject")?,
            note_taking_style: NoteStyle::parse(&text_field(bundle, "note_taking_style")?)?,
            include_examples: optional_flag(bundle, schema.optional, "include_examples"),
            include_analogies: optional_flag(bundle, schema.optional, "include_analogies"),
        })),
        ToolKind::FlashcardGenerator => Some(ToolInput::FlashcardGenerator(
            FlashcardGeneratorInput {
                user_info: profile.clone(),
                topic: text_field(bundle, "topic")?,
                count: u32::try_from(bundle.fields.get("count").and_then(Value::as_i64)?).ok()?,
                difficulty: Difficulty::parse(&text_field(bundle, "difficulty")?)?,
                subject: text_field(bundle, "subject")?,
                include_examples: optional_flag(bundle, schema.optional, "include_examples"),
            },
        )),
        ToolKind::ConceptExplainer => Some(ToolInput::ConceptExplainer(ConceptExplainerInput {
            user_info: profile.clone(),
            chat_history: history.to_vec(),
            concept_to_explain: text_field(bundle, "concept_to_explain")?,
            current_topic: text_field(bundle, "current_topic")?,
            desired_depth: ExplanationDepth::parse(&text_field(bundle, "desired_depth")?)?,
        })),
    }
}

fn text_field(bundle: &ParameterBundle, name: &str) -> Option<String> {
    bundle
        .fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn optional_flag(
    bundle: &ParameterBundle,
    optional: &[OptionalFieldSpec],
    name: &str,
) -> bool {
    let default = optional.iter().find(|spec| spec.name == name).map(|spec| spec.default);
    bundle
        .fields
        .get(name)
        .and_then(Value::as_bool)
        .or(default)
        .unwrap_or(false)
}
