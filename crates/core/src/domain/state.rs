use serde::Serialize;

use crate::domain::extraction::ParameterBundle;
use crate::domain::message::ChatMessage;
use crate::domain::profile::LearnerProfile;
use crate::domain::tool::{ToolInput, ToolKind, ToolResponse};

/// How a completed run resolved, for logging and caller summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    ToolExecuted,
    ToolFailed,
    ClarificationRequested,
    Faulted,
}

/// Mutable state threaded through one orchestration run. One instance
/// per run, never shared across runs.
///
/// Invariant on completion: either exactly one of a successful tool
/// response and a clarification question is present, or the run faulted,
/// in which case the error log is non-empty and the final message is the
/// generic apology.
#[derive(Clone, Debug, Serialize)]
pub struct ConversationState {
    pub conversation_id: String,
    pub message: String,
    pub profile: LearnerProfile,
    pub history: Vec<ChatMessage>,

    pub intent: Option<ToolKind>,
    pub bundle: Option<ParameterBundle>,
    pub validation_passed: bool,
    pub tool_input: Option<ToolInput>,

    pub tool_response: Option<ToolResponse>,
    pub final_message: Option<String>,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,

    pub processing_steps: Vec<String>,
    pub errors: Vec<String>,
}

impl ConversationState {
    pub fn new(
        conversation_id: impl Into<String>,
        message: impl Into<String>,
        profile: LearnerProfile,
        history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            profile,
            history,
            intent: None,
            bundle: None,
            validation_passed: false,
            tool_input: None,
            tool_response: None,
            final_message: None,
            needs_clarification: false,
            clarification_question: None,
            processing_steps: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_step(&mut self, step: impl Into<String>) {
        self.processing_steps.push(step.into());
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn outcome(&self) -> RunOutcome {
        match (&self.tool_response, self.needs_clarification) {
            (Some(response), _) if response.success => RunOutcome::ToolExecuted,
            (Some(_), _) => RunOutcome::ToolFailed,
            (None, true) => RunOutcome::ClarificationRequested,
            (None, false) => RunOutcome::Faulted,
        }
    }
}
