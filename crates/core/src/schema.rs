//! Static request schemas for the three content-generation tools.
//!
//! The registry is the single source of truth for which fields a tool
//! requires, which are optional with defaults, and what constraints each
//! field carries. The validator and the extraction fallback both read it.

use serde_json::Value;

use crate::domain::tool::{Difficulty, ExplanationDepth, NoteStyle, ToolKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldConstraint {
    /// Non-empty free text.
    Text,
    /// Integer within an inclusive range.
    IntRange { min: i64, max: i64 },
    /// One of a closed set of lowercase names.
    OneOf(&'static [&'static str]),
}

impl FieldConstraint {
    /// Whether a present value satisfies this constraint. Presence and
    /// non-emptiness are checked by the caller first.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Text => value.as_str().is_some_and(|text| !text.trim().is_empty()),
            Self::IntRange { min, max } => {
                value.as_i64().is_some_and(|number| (*min..=*max).contains(&number))
            }
            Self::OneOf(names) => value
                .as_str()
                .is_some_and(|text| names.contains(&text.trim().to_ascii_lowercase().as_str())),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub constraint: FieldConstraint,
}

/// Optional fields are all boolean toggles with a fixed default.
#[derive(Clone, Copy, Debug)]
pub struct OptionalFieldSpec {
    pub name: &'static str,
    pub default: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct ToolSchema {
    pub tool: ToolKind,
    pub required: &'static [FieldSpec],
    pub optional: &'static [OptionalFieldSpec],
}

static NOTE_MAKER_SCHEMA: ToolSchema = ToolSchema {
    tool: ToolKind::NoteMaker,
    required: &[
        FieldSpec { name: "topic", constraint: FieldConstraint::Text },
        FieldSpec { name: "subject", constraint: FieldConstraint::Text },
        FieldSpec {
            name: "note_taking_style",
            constraint: FieldConstraint::OneOf(NoteStyle::NAMES),
        },
    ],
    optional: &[
        OptionalFieldSpec { name: "include_examples", default: true },
        OptionalFieldSpec { name: "include_analogies", default: false },
    ],
};

static FLASHCARD_GENERATOR_SCHEMA: ToolSchema = ToolSchema {
    tool: ToolKind::FlashcardGenerator,
    required: &[
        FieldSpec { name: "topic", constraint: FieldConstraint::Text },
        FieldSpec { name: "count", constraint: FieldConstraint::IntRange { min: 1, max: 20 } },
        FieldSpec { name: "difficulty", constraint: FieldConstraint::OneOf(Difficulty::NAMES) },
        FieldSpec { name: "subject", constraint: FieldConstraint::Text },
    ],
    optional: &[OptionalFieldSpec { name: "include_examples", default: true }],
};

static CONCEPT_EXPLAINER_SCHEMA: ToolSchema = ToolSchema {
    tool: ToolKind::ConceptExplainer,
    required: &[
        FieldSpec { name: "concept_to_explain", constraint: FieldConstraint::Text },
        FieldSpec { name: "current_topic", constraint: FieldConstraint::Text },
        FieldSpec {
            name: "desired_depth",
            constraint: FieldConstraint::OneOf(ExplanationDepth::NAMES),
        },
    ],
    optional: &[],
};

pub fn schema_for(tool: ToolKind) -> &'static ToolSchema {
    match tool {
        ToolKind::NoteMaker => &NOTE_MAKER_SCHEMA,
        ToolKind::FlashcardGenerator => &FLASHCARD_GENERATOR_SCHEMA,
        ToolKind::ConceptExplainer => &CONCEPT_EXPLAINER_SCHEMA,
    }
}

/// Required field names for a tool, in schema order.
pub fn required_field_names(tool: ToolKind) -> Vec<String> {
    schema_for(tool).required.iter().map(|spec| spec.name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{required_field_names, schema_for, FieldConstraint};
    use crate::domain::tool::ToolKind;

    #[test]
    fn every_tool_has_a_schema_with_required_fields() {
        for tool in ToolKind::ALL {
            let schema = schema_for(tool);
            assert_eq!(schema.tool, tool);
            assert!(!schema.required.is_empty());
        }
    }

    #[test]
    fn flashcard_schema_orders_required_fields() {
        assert_eq!(
            required_field_names(ToolKind::FlashcardGenerator),
            vec!["topic", "count", "difficulty", "subject"]
        );
    }

    #[test]
    fn int_range_rejects_floats_strings_and_out_of_range() {
        let constraint = FieldConstraint::IntRange { min: 1, max: 20 };
        assert!(constraint.accepts(&json!(8)));
        assert!(constraint.accepts(&json!(1)));
        assert!(constraint.accepts(&json!(20)));
        assert!(!constraint.accepts(&json!(0)));
        assert!(!constraint.accepts(&json!(21)));
        assert!(!constraint.accepts(&json!(8.5)));
        assert!(!constraint.accepts(&json!("8")));
    }

    #[test]
    fn one_of_accepts_case_insensitive_members_only() {
        let constraint = FieldConstraint::OneOf(&["easy", "medium", "hard"]);
        assert!(constraint.accepts(&json!("easy")));
        assert!(constraint.accepts(&json!(" Medium ")));
        assert!(!constraint.accepts(&json!("impossible")));
        assert!(!constraint.accepts(&json!(3)));
    }

    #[test]
    fn text_rejects_blank_values() {
        assert!(FieldConstraint::Text.accepts(&json!("entropy")));
        assert!(!FieldConstraint::Text.accepts(&json!("   ")));
        assert!(!FieldConstraint::Text.accepts(&json!(null)));
    }
}
