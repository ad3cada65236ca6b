//! The persistence capability consumed by the workflow engine. Stages
//! never branch on whether persistence is enabled: the engine always
//! holds an implementation, which is either backed by sqlite or a no-op.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use mentor_core::{MessageRole, ParameterBundle, ToolInput, ToolKind, ToolResponse};

use crate::repositories::{
    ConversationRepository, ExecutionRecord, ExecutionRepository, ExtractionRecord,
    ExtractionRepository, MessageRepository, NewChatMessage, RepositoryError,
    SqlConversationRepository, SqlExecutionRepository, SqlExtractionRepository,
    SqlMessageRepository,
};
use crate::DbPool;

#[async_trait]
pub trait WorkflowPersistence: Send + Sync {
    async fn save_user_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(), RepositoryError>;

    async fn save_assistant_message(
        &self,
        conversation_id: &str,
        content: &str,
        tool_used: Option<ToolKind>,
    ) -> Result<(), RepositoryError>;

    async fn save_parameter_extraction(
        &self,
        conversation_id: &str,
        user_message: &str,
        bundle: &ParameterBundle,
    ) -> Result<(), RepositoryError>;

    async fn save_tool_execution(
        &self,
        conversation_id: &str,
        input: &ToolInput,
        response: &ToolResponse,
    ) -> Result<(), RepositoryError>;

    async fn increment_turn_count(
        &self,
        conversation_id: &str,
        by: u32,
    ) -> Result<(), RepositoryError>;
}

/// Real implementation over the sqlite repositories.
pub struct SqlWorkflowPersistence {
    messages: SqlMessageRepository,
    extractions: SqlExtractionRepository,
    executions: SqlExecutionRepository,
    conversations: SqlConversationRepository,
}

impl SqlWorkflowPersistence {
    pub fn new(pool: DbPool) -> Self {
        Self {
            messages: SqlMessageRepository::new(pool.clone()),
            extractions: SqlExtractionRepository::new(pool.clone()),
            executions: SqlExecutionRepository::new(pool.clone()),
            conversations: SqlConversationRepository::new(pool),
        }
    }
}

#[async_trait]
impl WorkflowPersistence for SqlWorkflowPersistence {
    async fn save_user_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(), RepositoryError> {
        self.messages
            .append(NewChatMessage {
                conversation_id: conversation_id.to_string(),
                role: MessageRole::User,
                content: content.to_string(),
                tool_used: None,
            })
            .await
    }

    async fn save_assistant_message(
        &self,
        conversation_id: &str,
        content: &str,
        tool_used: Option<ToolKind>,
    ) -> Result<(), RepositoryError> {
        self.messages
            .append(NewChatMessage {
                conversation_id: conversation_id.to_string(),
                role: MessageRole::Assistant,
                content: content.to_string(),
                tool_used,
            })
            .await
    }

    async fn save_parameter_extraction(
        &self,
        conversation_id: &str,
        user_message: &str,
        bundle: &ParameterBundle,
    ) -> Result<(), RepositoryError> {
        let explicit = Value::Object(
            bundle.explicit_fields().into_iter().collect::<serde_json::Map<_, _>>(),
        );
        let inferred = Value::Object(
            bundle
                .inferred
                .iter()
                .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                .collect::<serde_json::Map<_, _>>(),
        );

        self.extractions
            .append(ExtractionRecord {
                conversation_id: conversation_id.to_string(),
                user_message: user_message.to_string(),
                explicit_fields: explicit,
                inferred_fields: inferred,
                confidence: bundle.confidence,
                missing_required: bundle.missing_required.clone(),
            })
            .await
    }

    async fn save_tool_execution(
        &self,
        conversation_id: &str,
        input: &ToolInput,
        response: &ToolResponse,
    ) -> Result<(), RepositoryError> {
        self.executions
            .append(ExecutionRecord {
                conversation_id: conversation_id.to_string(),
                tool: response.tool,
                input_params: input.to_value(),
                output_data: if response.success { response.data.clone() } else { None },
                latency_ms: response.latency_ms,
                success: response.success,
                error_message: if response.success { None } else { response.error.clone() },
            })
            .await
    }

    async fn increment_turn_count(
        &self,
        conversation_id: &str,
        by: u32,
    ) -> Result<(), RepositoryError> {
        self.conversations.increment_turn_count(conversation_id, by).await
    }
}

/// Used when the caller runs without a database handle.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopWorkflowPersistence;

#[async_trait]
impl WorkflowPersistence for NoopWorkflowPersistence {
    async fn save_user_message(&self, _: &str, _: &str) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn save_assistant_message(
        &self,
        _: &str,
        _: &str,
        _: Option<ToolKind>,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn save_parameter_extraction(
        &self,
        _: &str,
        _: &str,
        _: &ParameterBundle,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn save_tool_execution(
        &self,
        _: &str,
        _: &ToolInput,
        _: &ToolResponse,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn increment_turn_count(&self, _: &str, _: u32) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// What a recording double observed, for assertions on side effects.
#[derive(Clone, Debug, PartialEq)]
pub enum PersistenceEvent {
    UserMessage { conversation_id: String, content: String },
    AssistantMessage { conversation_id: String, content: String, tool_used: Option<ToolKind> },
    Extraction { conversation_id: String, confidence: f64, missing: Vec<String> },
    Execution { conversation_id: String, tool: ToolKind, success: bool },
    TurnCount { conversation_id: String, by: u32 },
}

/// In-memory double that records every write, optionally failing each
/// one to exercise the swallow-and-continue paths.
#[derive(Clone, Default)]
pub struct RecordingPersistence {
    events: Arc<Mutex<Vec<PersistenceEvent>>>,
    fail_writes: bool,
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// A double whose every write fails, simulating a dead database.
    pub fn failing() -> Self {
        Self { events: Arc::new(Mutex::new(Vec::new())), fail_writes: true }
    }

    pub fn events(&self) -> Vec<PersistenceEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, event: PersistenceEvent) -> Result<(), RepositoryError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        if self.fail_writes {
            Err(RepositoryError::Decode("simulated persistence failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WorkflowPersistence for RecordingPersistence {
    async fn save_user_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(), RepositoryError> {
        self.record(PersistenceEvent::UserMessage {
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
        })
    }

    async fn save_assistant_message(
        &self,
        conversation_id: &str,
        content: &str,
        tool_used: Option<ToolKind>,
    ) -> Result<(), RepositoryError> {
        self.record(PersistenceEvent::AssistantMessage {
            conversation_id: conversation_id.to_string(),
            content: content.to_string(),
            tool_used,
        })
    }

    async fn save_parameter_extraction(
        &self,
        conversation_id: &str,
        _user_message: &str,
        bundle: &ParameterBundle,
    ) -> Result<(), RepositoryError> {
        self.record(PersistenceEvent::Extraction {
            conversation_id: conversation_id.to_string(),
            confidence: bundle.confidence,
            missing: bundle.missing_required.clone(),
        })
    }

    async fn save_tool_execution(
        &self,
        conversation_id: &str,
        _input: &ToolInput,
        response: &ToolResponse,
    ) -> Result<(), RepositoryError> {
        self.record(PersistenceEvent::Execution {
            conversation_id: conversation_id.to_string(),
            tool: response.tool,
            success: response.success,
        })
    }

    async fn increment_turn_count(
        &self,
        conversation_id: &str,
        by: u32,
    ) -> Result<(), RepositoryError> {
        self.record(PersistenceEvent::TurnCount {
            conversation_id: conversation_id.to_string(),
            by,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use mentor_core::{
        Difficulty, FlashcardGeneratorInput, LearnerId, LearnerProfile, ParameterBundle,
        TeachingStyle, ToolInput, ToolKind, ToolResponse,
    };

    use super::{
        PersistenceEvent, RecordingPersistence, SqlWorkflowPersistence, WorkflowPersistence,
    };
    use crate::repositories::{
        ConversationRepository, ExecutionRepository, ExtractionRepository, MessageRepository,
        SqlConversationRepository, SqlExecutionRepository, SqlExtractionRepository,
        SqlMessageRepository,
    };
    use crate::{connect_with_settings, migrations};

    fn profile() -> LearnerProfile {
        LearnerProfile {
            learner_id: LearnerId("learner-1".to_string()),
            name: "Ada".to_string(),
            grade_level: "9".to_string(),
            learning_style_summary: String::new(),
            emotional_state_summary: String::new(),
            mastery_level_summary: String::new(),
            teaching_style: TeachingStyle::Direct,
        }
    }

    fn bundle() -> ParameterBundle {
        let mut fields = BTreeMap::new();
        fields.insert("topic".to_string(), json!("photosynthesis"));
        fields.insert("subject".to_string(), json!("biology"));
        let mut inferred = BTreeMap::new();
        inferred.insert("subject".to_string(), "biology".to_string());
        ParameterBundle::new(ToolKind::FlashcardGenerator, fields, inferred, 0.9, Vec::new())
    }

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn sql_persistence_splits_explicit_and_inferred_fields() {
        let pool = setup().await;
        let persistence = SqlWorkflowPersistence::new(pool.clone());

        persistence
            .save_parameter_extraction("conv-1", "8 easy flashcards", &bundle())
            .await
            .expect("save extraction");

        let stored = SqlExtractionRepository::new(pool)
            .list_for_conversation("conv-1")
            .await
            .expect("list extractions");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].explicit_fields["topic"], "photosynthesis");
        assert!(stored[0].explicit_fields.get("subject").is_none());
        assert_eq!(stored[0].inferred_fields["subject"], "biology");
    }

    #[tokio::test]
    async fn sql_persistence_writes_messages_executions_and_turns() {
        let pool = setup().await;
        let persistence = SqlWorkflowPersistence::new(pool.clone());

        persistence.save_user_message("conv-1", "make flashcards").await.expect("user message");

        let input = ToolInput::FlashcardGenerator(FlashcardGeneratorInput {
            user_info: profile(),
            topic: "photosynthesis".to_string(),
            count: 8,
            difficulty: Difficulty::Easy,
            subject: "biology".to_string(),
            include_examples: true,
        });
        let response =
            ToolResponse::succeeded(ToolKind::FlashcardGenerator, json!({"flashcards": []}), 900);
        persistence.save_tool_execution("conv-1", &input, &response).await.expect("execution");
        persistence
            .save_assistant_message("conv-1", "here you go", Some(ToolKind::FlashcardGenerator))
            .await
            .expect("assistant message");
        persistence.increment_turn_count("conv-1", 2).await.expect("turn count");

        let messages = SqlMessageRepository::new(pool.clone())
            .list_for_conversation("conv-1")
            .await
            .expect("messages");
        assert_eq!(messages.len(), 2);

        let executions = SqlExecutionRepository::new(pool.clone())
            .list_for_conversation("conv-1")
            .await
            .expect("executions");
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].input_params["count"], 8);

        let turns = SqlConversationRepository::new(pool)
            .turn_count("conv-1")
            .await
            .expect("turn count");
        assert_eq!(turns, Some(2));
    }

    #[tokio::test]
    async fn failed_execution_is_stored_without_output() {
        let pool = setup().await;
        let persistence = SqlWorkflowPersistence::new(pool.clone());

        let input = ToolInput::FlashcardGenerator(FlashcardGeneratorInput {
            user_info: profile(),
            topic: "photosynthesis".to_string(),
            count: 8,
            difficulty: Difficulty::Easy,
            subject: "biology".to_string(),
            include_examples: true,
        });
        let response = ToolResponse::failed(
            ToolKind::FlashcardGenerator,
            "tool call timed out after 30s",
            None,
        );
        persistence.save_tool_execution("conv-1", &input, &response).await.expect("execution");

        let executions = SqlExecutionRepository::new(pool)
            .list_for_conversation("conv-1")
            .await
            .expect("executions");
        assert!(!executions[0].success);
        assert!(executions[0].output_data.is_none());
        assert_eq!(
            executions[0].error_message.as_deref(),
            Some("tool call timed out after 30s")
        );
    }

    #[tokio::test]
    async fn recording_double_captures_events_and_can_fail() {
        let recorder = RecordingPersistence::new();
        recorder.save_user_message("conv-1", "hi").await.expect("record");
        assert_eq!(
            recorder.events(),
            vec![PersistenceEvent::UserMessage {
                conversation_id: "conv-1".to_string(),
                content: "hi".to_string(),
            }]
        );

        let failing = RecordingPersistence::failing();
        let result = failing.save_user_message("conv-1", "hi").await;
        assert!(result.is_err());
        // the write is still observable, only its outcome failed
        assert_eq!(failing.events().len(), 1);
    }
}
