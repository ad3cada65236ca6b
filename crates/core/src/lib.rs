pub mod config;
pub mod domain;
pub mod errors;
pub mod schema;
pub mod validation;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::extraction::ParameterBundle;
pub use domain::message::{ChatMessage, MessageRole};
pub use domain::profile::{LearnerId, LearnerProfile, TeachingStyle};
pub use domain::state::{ConversationState, RunOutcome};
pub use domain::tool::{
    ConceptExplainerInput, Difficulty, ExplanationDepth, FlashcardGeneratorInput, NoteMakerInput,
    NoteStyle, ToolInput, ToolKind, ToolResponse,
};
pub use errors::StageFault;
pub use schema::{required_field_names, schema_for, FieldConstraint, ToolSchema};
pub use validation::{validate_bundle, ValidationOutcome};
