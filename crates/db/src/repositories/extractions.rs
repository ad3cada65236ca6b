use chrono::Utc;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use super::{
    decode_timestamp, ExtractionRecord, ExtractionRepository, RepositoryError, StoredExtraction,
};
use crate::DbPool;

pub struct SqlExtractionRepository {
    pool: DbPool,
}

impl SqlExtractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_json(raw: Option<String>) -> Value {
    raw.and_then(|text| serde_json::from_str(&text).ok()).unwrap_or(Value::Null)
}

fn row_to_extraction(row: &sqlx::sqlite::SqliteRow) -> Result<StoredExtraction, RepositoryError> {
    let explicit_raw: String = row
        .try_get("extracted_fields")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let inferred_raw: Option<String> =
        row.try_get("inferred_fields").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let missing_raw: Option<String> =
        row.try_get("missing_required").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_raw: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(StoredExtraction {
        extraction_id: row
            .try_get("extraction_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        conversation_id: row
            .try_get("conversation_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        user_message: row
            .try_get("user_message")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        explicit_fields: serde_json::from_str(&explicit_raw)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        inferred_fields: decode_json(inferred_raw),
        confidence: row
            .try_get("confidence")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        missing_required: missing_raw
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default(),
        created_at: decode_timestamp(&created_at_raw),
    })
}

#[async_trait::async_trait]
impl ExtractionRepository for SqlExtractionRepository {
    async fn append(&self, record: ExtractionRecord) -> Result<(), RepositoryError> {
        let missing = serde_json::to_string(&record.missing_required)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO parameter_extractions
                (extraction_id, conversation_id, user_message, extracted_fields,
                 inferred_fields, confidence, missing_required, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.conversation_id)
        .bind(&record.user_message)
        .bind(record.explicit_fields.to_string())
        .bind(record.inferred_fields.to_string())
        .bind(record.confidence)
        .bind(missing)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredExtraction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT extraction_id, conversation_id, user_message, extracted_fields,
                    inferred_fields, confidence, missing_required, created_at
             FROM parameter_extractions
             WHERE conversation_id = ?
             ORDER BY created_at, extraction_id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_extraction).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::SqlExtractionRepository;
    use crate::repositories::{ExtractionRecord, ExtractionRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn append_round_trips_json_fields() {
        let repo = SqlExtractionRepository::new(setup().await);

        repo.append(ExtractionRecord {
            conversation_id: "conv-1".to_string(),
            user_message: "8 easy flashcards on photosynthesis".to_string(),
            explicit_fields: json!({"topic": "photosynthesis", "count": 8}),
            inferred_fields: json!({"subject": "biology"}),
            confidence: 0.92,
            missing_required: vec![],
        })
        .await
        .expect("append extraction");

        let stored = repo.list_for_conversation("conv-1").await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].explicit_fields["topic"], "photosynthesis");
        assert_eq!(stored[0].inferred_fields["subject"], "biology");
        assert!((stored[0].confidence - 0.92).abs() < 1e-9);
        assert!(stored[0].missing_required.is_empty());
    }

    #[tokio::test]
    async fn zero_confidence_fallback_records_are_persisted() {
        let repo = SqlExtractionRepository::new(setup().await);

        repo.append(ExtractionRecord {
            conversation_id: "conv-1".to_string(),
            user_message: "help".to_string(),
            explicit_fields: json!({}),
            inferred_fields: json!({}),
            confidence: 0.0,
            missing_required: vec!["topic".to_string(), "subject".to_string()],
        })
        .await
        .expect("append fallback extraction");

        let stored = repo.list_for_conversation("conv-1").await.expect("list");
        assert_eq!(stored[0].confidence, 0.0);
        assert_eq!(stored[0].missing_required, vec!["topic", "subject"]);
    }
}
