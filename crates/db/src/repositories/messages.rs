use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::{decode_timestamp, MessageRepository, NewChatMessage, RepositoryError, StoredChatMessage};
use crate::DbPool;

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredChatMessage, RepositoryError> {
    let created_at_raw: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StoredChatMessage {
        message_id: row
            .try_get("message_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        conversation_id: row
            .try_get("conversation_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        role: row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        content: row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        tool_used: row
            .try_get("tool_used")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        created_at: decode_timestamp(&created_at_raw),
    })
}

#[async_trait::async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn append(&self, message: NewChatMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_messages
                (message_id, conversation_id, role, content, tool_used, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.tool_used.map(|tool| tool.as_str()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT message_id, conversation_id, role, content, tool_used, created_at
             FROM chat_messages
             WHERE conversation_id = ?
             ORDER BY created_at, message_id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }
}

#[cfg(test)]
mod tests {
    use mentor_core::{MessageRole, ToolKind};

    use super::SqlMessageRepository;
    use crate::repositories::{MessageRepository, NewChatMessage};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn append_and_list_preserves_order_and_roles() {
        let repo = SqlMessageRepository::new(setup().await);

        repo.append(NewChatMessage {
            conversation_id: "conv-1".to_string(),
            role: MessageRole::User,
            content: "make me flashcards".to_string(),
            tool_used: None,
        })
        .await
        .expect("append user turn");

        repo.append(NewChatMessage {
            conversation_id: "conv-1".to_string(),
            role: MessageRole::Assistant,
            content: "here are your flashcards".to_string(),
            tool_used: Some(ToolKind::FlashcardGenerator),
        })
        .await
        .expect("append assistant turn");

        let messages = repo.list_for_conversation("conv-1").await.expect("list");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].tool_used.as_deref(), Some("flashcard_generator"));
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let repo = SqlMessageRepository::new(setup().await);

        repo.append(NewChatMessage {
            conversation_id: "conv-1".to_string(),
            role: MessageRole::User,
            content: "hello".to_string(),
            tool_used: None,
        })
        .await
        .expect("append");

        let other = repo.list_for_conversation("conv-2").await.expect("list");
        assert!(other.is_empty());
    }
}
