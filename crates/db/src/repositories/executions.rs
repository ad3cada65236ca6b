use chrono::Utc;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use super::{
    decode_timestamp, ExecutionRecord, ExecutionRepository, RepositoryError, StoredExecution,
};
use crate::DbPool;

pub struct SqlExecutionRepository {
    pool: DbPool,
}

impl SqlExecutionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_execution(row: &sqlx::sqlite::SqliteRow) -> Result<StoredExecution, RepositoryError> {
    let input_raw: String =
        row.try_get("input_params").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let output_raw: Option<String> =
        row.try_get("output_data").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_raw: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StoredExecution {
        execution_id: row
            .try_get("execution_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        conversation_id: row
            .try_get("conversation_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        tool: row.try_get("tool").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        input_params: serde_json::from_str(&input_raw)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        output_data: output_raw.and_then(|text| serde_json::from_str::<Value>(&text).ok()),
        latency_ms: row
            .try_get("latency_ms")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        success: row.try_get("success").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        error_message: row
            .try_get("error_message")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        created_at: decode_timestamp(&created_at_raw),
    })
}

#[async_trait::async_trait]
impl ExecutionRepository for SqlExecutionRepository {
    async fn append(&self, record: ExecutionRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tool_executions
                (execution_id, conversation_id, tool, input_params, output_data,
                 latency_ms, success, error_message, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.conversation_id)
        .bind(record.tool.as_str())
        .bind(record.input_params.to_string())
        .bind(record.output_data.as_ref().map(Value::to_string))
        .bind(record.latency_ms.map(|ms| ms as i64))
        .bind(record.success)
        .bind(&record.error_message)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredExecution>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT execution_id, conversation_id, tool, input_params, output_data,
                    latency_ms, success, error_message, created_at
             FROM tool_executions
             WHERE conversation_id = ?
             ORDER BY created_at, execution_id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_execution).collect()
    }
}

#[cfg(test)]
mod tests {
    use mentor_core::ToolKind;
    use serde_json::json;

    use super::SqlExecutionRepository;
    use crate::repositories::{ExecutionRecord, ExecutionRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn successful_execution_round_trips() {
        let repo = SqlExecutionRepository::new(setup().await);

        repo.append(ExecutionRecord {
            conversation_id: "conv-1".to_string(),
            tool: ToolKind::FlashcardGenerator,
            input_params: json!({"topic": "photosynthesis", "count": 8}),
            output_data: Some(json!({"flashcards": [{"question": "q", "answer": "a"}]})),
            latency_ms: Some(1240),
            success: true,
            error_message: None,
        })
        .await
        .expect("append execution");

        let stored = repo.list_for_conversation("conv-1").await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].tool, "flashcard_generator");
        assert!(stored[0].success);
        assert_eq!(stored[0].latency_ms, Some(1240));
        assert_eq!(stored[0].output_data.as_ref().map(|v| v["flashcards"].is_array()), Some(true));
    }

    #[tokio::test]
    async fn failed_execution_keeps_error_and_null_output() {
        let repo = SqlExecutionRepository::new(setup().await);

        repo.append(ExecutionRecord {
            conversation_id: "conv-1".to_string(),
            tool: ToolKind::NoteMaker,
            input_params: json!({"topic": "cells"}),
            output_data: None,
            latency_ms: None,
            success: false,
            error_message: Some("tool call timed out after 30s".to_string()),
        })
        .await
        .expect("append execution");

        let stored = repo.list_for_conversation("conv-1").await.expect("list");
        assert!(!stored[0].success);
        assert!(stored[0].output_data.is_none());
        assert_eq!(stored[0].error_message.as_deref(), Some("tool call timed out after 30s"));
    }
}
