use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use mentor_core::{MessageRole, ToolKind};

pub mod conversations;
pub mod executions;
pub mod extractions;
pub mod messages;

pub use conversations::SqlConversationRepository;
pub use executions::SqlExecutionRepository;
pub use extractions::SqlExtractionRepository;
pub use messages::SqlMessageRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One chat turn to append to the conversation log.
#[derive(Clone, Debug)]
pub struct NewChatMessage {
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub tool_used: Option<ToolKind>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredChatMessage {
    pub message_id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub tool_used: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Extraction audit record: the primary quality signal. Written once per
/// run, regardless of how validation later resolves.
#[derive(Clone, Debug)]
pub struct ExtractionRecord {
    pub conversation_id: String,
    pub user_message: String,
    pub explicit_fields: Value,
    pub inferred_fields: Value,
    pub confidence: f64,
    pub missing_required: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredExtraction {
    pub extraction_id: String,
    pub conversation_id: String,
    pub user_message: String,
    pub explicit_fields: Value,
    pub inferred_fields: Value,
    pub confidence: f64,
    pub missing_required: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Tool execution audit record.
#[derive(Clone, Debug)]
pub struct ExecutionRecord {
    pub conversation_id: String,
    pub tool: ToolKind,
    pub input_params: Value,
    pub output_data: Option<Value>,
    pub latency_ms: Option<u64>,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredExecution {
    pub execution_id: String,
    pub conversation_id: String,
    pub tool: String,
    pub input_params: Value,
    pub output_data: Option<Value>,
    pub latency_ms: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Decode a stored rfc3339 timestamp, tolerating rows written by other
/// writers with the sqlite default format.
pub(crate) fn decode_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: NewChatMessage) -> Result<(), RepositoryError>;

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredChatMessage>, RepositoryError>;
}

#[async_trait]
pub trait ExtractionRepository: Send + Sync {
    async fn append(&self, record: ExtractionRecord) -> Result<(), RepositoryError>;

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredExtraction>, RepositoryError>;
}

#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    async fn append(&self, record: ExecutionRecord) -> Result<(), RepositoryError>;

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredExecution>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Bump the turn counter, creating the conversation row on first
    /// write.
    async fn increment_turn_count(
        &self,
        conversation_id: &str,
        by: u32,
    ) -> Result<(), RepositoryError>;

    async fn turn_count(&self, conversation_id: &str) -> Result<Option<i64>, RepositoryError>;
}
