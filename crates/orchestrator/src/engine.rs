//! Workflow engine: threads one `ConversationState` through the stage
//! sequence `classify -> extract -> validate -> {execute | clarify}`.
//!
//! Every stage runs at most once and is never retried. A stage fault
//! becomes an error-log entry plus that stage's documented fallback, so
//! `orchestrate` always returns a state and never propagates an error
//! to the caller. Persistence writes are best-effort throughout: a
//! failed write is logged and swallowed, and can never change the
//! user-visible outcome.

use std::sync::Arc;

use mentor_core::{
    required_field_names, validate_bundle, ChatMessage, ConversationState, LearnerProfile,
    ParameterBundle, StageFault, ToolKind, ToolResponse,
};
use mentor_db::{RepositoryError, WorkflowPersistence};
use mentor_gateway::LanguageModelGateway;
use mentor_tools::ToolInvoker;

/// Shown when the run cannot produce any specific user-facing outcome.
const GENERIC_APOLOGY: &str =
    "Something went wrong while processing your request. Please try again.";

/// Assistant message accompanying a successful tool execution; the
/// generated content travels in the tool response payload.
const TOOL_SUCCESS_MESSAGE: &str = "Tool executed successfully. Here are your results:";

/// Last-resort clarification when even the static lookup has nothing.
const FALLBACK_QUESTION: &str = "Could you share a few more details about what you need?";

#[derive(Clone, Copy, Debug)]
pub struct OrchestratorConfig {
    /// Tool used when classification cannot produce an answer.
    pub default_tool: ToolKind,
    /// Number of prior turns forwarded to the gateway.
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { default_tool: ToolKind::ConceptExplainer, history_window: 10 }
    }
}

/// One orchestration request. History is read-only context; the engine
/// only appends to the copy inside the returned state.
#[derive(Clone, Debug)]
pub struct OrchestrateRequest {
    pub conversation_id: String,
    pub message: String,
    pub profile: LearnerProfile,
    pub history: Vec<ChatMessage>,
}

/// The engine. All collaborators are injected at construction so tests
/// can run it against doubles.
pub struct Orchestrator {
    gateway: Arc<dyn LanguageModelGateway>,
    tools: Arc<dyn ToolInvoker>,
    persistence: Arc<dyn WorkflowPersistence>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn LanguageModelGateway>,
        tools: Arc<dyn ToolInvoker>,
        persistence: Arc<dyn WorkflowPersistence>,
        config: OrchestratorConfig,
    ) -> Self {
        Self { gateway, tools, persistence, config }
    }

    /// Run the full workflow for one learner message. Total: always
    /// returns a state whose final message is a tool result notice, a
    /// clarification question, a tool-failure notice, or the generic
    /// apology.
    pub async fn orchestrate(&self, request: OrchestrateRequest) -> ConversationState {
        let mut state = ConversationState::new(
            request.conversation_id,
            request.message,
            request.profile,
            request.history,
        );

        tracing::info!(
            conversation_id = %state.conversation_id,
            "orchestration started"
        );

        self.classify(&mut state).await;
        self.extract(&mut state).await;
        self.validate(&mut state);

        if state.validation_passed {
            self.execute(&mut state).await;
        } else {
            self.clarify(&mut state).await;
        }

        self.finalize(&mut state);

        tracing::info!(
            conversation_id = %state.conversation_id,
            outcome = ?state.outcome(),
            steps = state.processing_steps.len(),
            "orchestration finished"
        );
        state
    }

    /// Prior turns forwarded to the gateway, bounded by configuration.
    fn bounded_history<'a>(&self, state: &'a ConversationState) -> &'a [ChatMessage] {
        let start = state.history.len().saturating_sub(self.config.history_window);
        &state.history[start..]
    }

    async fn classify(&self, state: &mut ConversationState) {
        let result = self
            .gateway
            .classify_intent(&state.message, self.bounded_history(state), &state.profile)
            .await;

        match result {
            Ok(tool) => {
                state.intent = Some(tool);
                state.record_step(format!("intent classified as {}", tool.as_str()));
                tracing::info!(
                    conversation_id = %state.conversation_id,
                    tool = tool.as_str(),
                    "intent classified"
                );
            }
            Err(error) => {
                let fault = StageFault::Classification(error.to_string());
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    stage = fault.stage(),
                    %error,
                    "stage faulted, applying default tool"
                );
                state.record_error(fault.to_string());
                state.intent = Some(self.config.default_tool);
                state.record_step(format!(
                    "intent defaulted to {}",
                    self.config.default_tool.as_str()
                ));
            }
        }

        let saved =
            self.persistence.save_user_message(&state.conversation_id, &state.message).await;
        self.log_persistence(&state.conversation_id, "user message", saved);
    }

    async fn extract(&self, state: &mut ConversationState) {
        let tool = state.intent.unwrap_or(self.config.default_tool);
        let result = self
            .gateway
            .extract_parameters(&state.message, self.bounded_history(state), &state.profile, tool)
            .await;

        let bundle = match result {
            Ok(bundle) => {
                state.record_step(format!(
                    "extracted parameters with {:.2} confidence",
                    bundle.confidence
                ));
                bundle
            }
            Err(error) => {
                let fault = StageFault::Extraction(error.to_string());
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    stage = fault.stage(),
                    %error,
                    "stage faulted, using no-signal bundle"
                );
                state.record_error(fault.to_string());
                state.record_step("extraction fell back to an empty bundle".to_string());
                // Confidence 0.0 with every required field missing, so
                // validation fails and the run routes to clarification.
                ParameterBundle::no_signal(tool, required_field_names(tool))
            }
        };

        // The extraction event is the primary quality-audit signal and
        // is recorded whatever validation later decides.
        let saved = self
            .persistence
            .save_parameter_extraction(&state.conversation_id, &state.message, &bundle)
            .await;
        self.log_persistence(&state.conversation_id, "parameter extraction", saved);

        state.bundle = Some(bundle);
    }

    fn validate(&self, state: &mut ConversationState) {
        let Some(bundle) = state.bundle.as_ref() else {
            let fault = StageFault::Validation("no parameter bundle available".to_string());
            state.record_error(fault.to_string());
            state.validation_passed = false;
            return;
        };

        let outcome = validate_bundle(bundle, &state.profile, &state.history);
        state.validation_passed = outcome.passed;

        if outcome.passed {
            state.tool_input = outcome.tool_input;
            state.record_step("validation passed".to_string());
        } else {
            state.record_step(format!("validation failed: missing {}", outcome.missing.join(", ")));
            tracing::info!(
                conversation_id = %state.conversation_id,
                missing = ?outcome.missing,
                "validation failed, routing to clarification"
            );
            // The validator's list is authoritative over the one the
            // extraction reported.
            if let Some(bundle) = state.bundle.as_mut() {
                bundle.missing_required = outcome.missing;
            }
        }
    }

    async fn execute(&self, state: &mut ConversationState) {
        let tool = state.intent.unwrap_or(self.config.default_tool);
        let Some(input) = state.tool_input.clone() else {
            // Defensive: validation passed without building an input.
            let fault = StageFault::ToolInvocation("no tool input available".to_string());
            state.record_error(fault.to_string());
            state.tool_response = Some(ToolResponse::failed(tool, "no tool input available", None));
            state.final_message = Some("Tool execution failed: no tool input available".to_string());
            return;
        };

        let response = match self.tools.call(tool, &input).await {
            Ok(response) => response,
            Err(error) => {
                let fault = StageFault::ToolInvocation(error.to_string());
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    stage = fault.stage(),
                    %error,
                    "stage faulted, synthesizing failed response"
                );
                state.record_error(fault.to_string());
                ToolResponse::failed(tool, error.to_string(), None)
            }
        };

        state.record_step(format!("tool executed: {}", response.success));

        if response.success {
            state.final_message = Some(TOOL_SUCCESS_MESSAGE.to_string());
        } else {
            let reason = response.error.clone().unwrap_or_else(|| "unknown error".to_string());
            state.record_error(format!("tool execution failed: {reason}"));
            state.final_message = Some(format!("Tool execution failed: {reason}"));
        }

        let saved = self
            .persistence
            .save_tool_execution(&state.conversation_id, &input, &response)
            .await;
        self.log_persistence(&state.conversation_id, "tool execution", saved);

        if let Some(final_message) = &state.final_message {
            let saved = self
                .persistence
                .save_assistant_message(&state.conversation_id, final_message, Some(tool))
                .await;
            self.log_persistence(&state.conversation_id, "assistant message", saved);
        }
        let saved = self.persistence.increment_turn_count(&state.conversation_id, 2).await;
        self.log_persistence(&state.conversation_id, "turn count", saved);

        state.tool_response = Some(response);
    }

    async fn clarify(&self, state: &mut ConversationState) {
        let tool = state.intent.unwrap_or(self.config.default_tool);
        let missing = state
            .bundle
            .as_ref()
            .map(|bundle| bundle.missing_required.clone())
            .unwrap_or_default();

        let question = match self
            .gateway
            .generate_clarification(&missing, tool, &state.message)
            .await
        {
            Ok(question) => {
                state.record_step("generated clarification question".to_string());
                question
            }
            Err(error) => {
                let fault = StageFault::Clarification(error.to_string());
                tracing::warn!(
                    conversation_id = %state.conversation_id,
                    stage = fault.stage(),
                    %error,
                    "stage faulted, using static question"
                );
                state.record_error(fault.to_string());
                state.record_step("used static clarification question".to_string());
                static_clarification(&missing)
            }
        };

        state.needs_clarification = true;
        state.clarification_question = Some(question.clone());
        state.final_message = Some(question.clone());

        let saved = self
            .persistence
            .save_assistant_message(&state.conversation_id, &question, None)
            .await;
        self.log_persistence(&state.conversation_id, "assistant message", saved);
        let saved = self.persistence.increment_turn_count(&state.conversation_id, 2).await;
        self.log_persistence(&state.conversation_id, "turn count", saved);
    }

    /// Outer boundary: whatever happened above, the returned state must
    /// carry a user-facing message and satisfy the completion invariant.
    fn finalize(&self, state: &mut ConversationState) {
        let has_outcome = state.tool_response.is_some() || state.clarification_question.is_some();
        if has_outcome && state.final_message.is_some() {
            return;
        }

        if state.errors.is_empty() {
            state.record_error("orchestration produced no user-facing outcome".to_string());
        }
        state.final_message = Some(GENERIC_APOLOGY.to_string());
    }

    fn log_persistence(
        &self,
        conversation_id: &str,
        what: &str,
        result: Result<(), RepositoryError>,
    ) {
        if let Err(error) = result {
            tracing::warn!(conversation_id, what, %error, "persistence write failed, continuing");
        }
    }
}

/// Static clarification lookup keyed by the first missing field. Plain
/// learner-facing language only.
fn static_clarification(missing: &[String]) -> String {
    match missing.first().map(String::as_str) {
        Some("topic") => "What topic would you like to learn about?",
        Some("subject") => "Which subject is this for?",
        Some("count") => "How many practice questions would you like?",
        Some("difficulty") => {
            "How challenging should the questions be: easy, medium, or hard?"
        }
        Some("note_taking_style") => {
            "How would you like the notes laid out, for example an outline or bullet points?"
        }
        Some("concept_to_explain") => "Which concept would you like me to explain?",
        Some("current_topic") => "What broader topic does this question belong to?",
        Some("desired_depth") => {
            "How deep should the explanation go, from a quick overview to a thorough walkthrough?"
        }
        Some(other) => return format!("Could you tell me more about the {other} you have in mind?"),
        None => FALLBACK_QUESTION,
    }
    .to_string()
}
