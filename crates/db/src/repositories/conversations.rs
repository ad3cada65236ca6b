use sqlx::Row;

use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn increment_turn_count(
        &self,
        conversation_id: &str,
        by: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (conversation_id, message_count)
             VALUES (?, ?)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 message_count = message_count + excluded.message_count,
                 last_message_at = datetime('now')",
        )
        .bind(conversation_id)
        .bind(i64::from(by))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn turn_count(&self, conversation_id: &str) -> Result<Option<i64>, RepositoryError> {
        let row = sqlx::query(
            "SELECT message_count FROM conversations WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            row.try_get::<i64, _>("message_count")
                .map_err(|e| RepositoryError::Decode(e.to_string()))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::SqlConversationRepository;
    use crate::repositories::ConversationRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn first_increment_creates_the_conversation_row() {
        let repo = SqlConversationRepository::new(setup().await);

        repo.increment_turn_count("conv-1", 2).await.expect("increment");

        assert_eq!(repo.turn_count("conv-1").await.expect("count"), Some(2));
    }

    #[tokio::test]
    async fn increments_accumulate() {
        let repo = SqlConversationRepository::new(setup().await);

        repo.increment_turn_count("conv-1", 2).await.expect("first increment");
        repo.increment_turn_count("conv-1", 2).await.expect("second increment");

        assert_eq!(repo.turn_count("conv-1").await.expect("count"), Some(4));
    }

    #[tokio::test]
    async fn unknown_conversation_has_no_count() {
        let repo = SqlConversationRepository::new(setup().await);
        assert_eq!(repo.turn_count("missing").await.expect("count"), None);
    }
}
