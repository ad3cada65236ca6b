use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::message::ChatMessage;
use crate::domain::profile::LearnerProfile;

/// The three downstream content-generation tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    NoteMaker,
    FlashcardGenerator,
    ConceptExplainer,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] =
        [Self::NoteMaker, Self::FlashcardGenerator, Self::ConceptExplainer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoteMaker => "note_maker",
            Self::FlashcardGenerator => "flashcard_generator",
            Self::ConceptExplainer => "concept_explainer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NoteMaker => "Note Maker",
            Self::FlashcardGenerator => "Flashcard Generator",
            Self::ConceptExplainer => "Concept Explainer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "note_maker" => Some(Self::NoteMaker),
            "flashcard_generator" => Some(Self::FlashcardGenerator),
            "concept_explainer" => Some(Self::ConceptExplainer),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStyle {
    Outline,
    BulletPoints,
    Narrative,
    Structured,
}

impl NoteStyle {
    pub const NAMES: &'static [&'static str] =
        &["outline", "bullet_points", "narrative", "structured"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "outline" => Some(Self::Outline),
            "bullet_points" => Some(Self::BulletPoints),
            "narrative" => Some(Self::Narrative),
            "structured" => Some(Self::Structured),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const NAMES: &'static [&'static str] = &["easy", "medium", "hard"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationDepth {
    Basic,
    Intermediate,
    Advanced,
    Comprehensive,
}

impl ExplanationDepth {
    pub const NAMES: &'static [&'static str] =
        &["basic", "intermediate", "advanced", "comprehensive"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            "comprehensive" => Some(Self::Comprehensive),
            _ => None,
        }
    }
}

/// Typed input for the note maker tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoteMakerInput {
    pub user_info: LearnerProfile,
    pub chat_history: Vec<ChatMessage>,
    pub topic: String,
    pub subject: String,
    pub note_taking_style: NoteStyle,
    pub include_examples: bool,
    pub include_analogies: bool,
}

/// Typed input for the flashcard generator tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlashcardGeneratorInput {
    pub user_info: LearnerProfile,
    pub topic: String,
    pub count: u32,
    pub difficulty: Difficulty,
    pub subject: String,
    pub include_examples: bool,
}

/// Typed input for the concept explainer tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConceptExplainerInput {
    pub user_info: LearnerProfile,
    pub chat_history: Vec<ChatMessage>,
    pub concept_to_explain: String,
    pub current_topic: String,
    pub desired_depth: ExplanationDepth,
}

/// Fully validated tool input, ready to be POSTed to the tool endpoint.
/// Only the validation engine constructs these.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolInput {
    NoteMaker(NoteMakerInput),
    FlashcardGenerator(FlashcardGeneratorInput),
    ConceptExplainer(ConceptExplainerInput),
}

impl ToolInput {
    pub fn tool(&self) -> ToolKind {
        match self {
            Self::NoteMaker(_) => ToolKind::NoteMaker,
            Self::FlashcardGenerator(_) => ToolKind::FlashcardGenerator,
            Self::ConceptExplainer(_) => ToolKind::ConceptExplainer,
        }
    }

    /// JSON body for the remote call and the execution audit record.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Outcome of one remote tool call. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: ToolKind,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub latency_ms: Option<u64>,
}

impl ToolResponse {
    pub fn succeeded(tool: ToolKind, data: Value, latency_ms: u64) -> Self {
        Self { tool, success: true, data: Some(data), error: None, latency_ms: Some(latency_ms) }
    }

    pub fn failed(tool: ToolKind, error: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self { tool, success: false, data: None, error: Some(error.into()), latency_ms }
    }
}
