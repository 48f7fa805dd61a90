use chrono::Utc;
use lms_core::model::{ScoreKey, ScoreRecord};

use super::SqliteRepository;
use super::mapping::{candidate_id_to_i64, conn, map_score_row, ser};
use crate::repository::{ScoreRepository, StorageError, UpsertOutcome};

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    async fn fetch_score(&self, key: &ScoreKey) -> Result<Option<ScoreRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learning_id, learning_type, candidate_id, score, status, answers
            FROM learning_scores
            WHERE learning_id = ?1 AND learning_type = ?2 AND candidate_id = ?3
            ",
        )
        .bind(key.learning_id.as_str())
        .bind(key.learning_type.as_str())
        .bind(candidate_id_to_i64(key.candidate_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_score_row).transpose()
    }

    async fn upsert_score(&self, record: &ScoreRecord) -> Result<UpsertOutcome, StorageError> {
        let answers = serde_json::to_string(&record.answers).map_err(ser)?;
        let candidate_id = candidate_id_to_i64(record.candidate_id)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing = sqlx::query(
            r"
            SELECT 1 FROM learning_scores
            WHERE learning_id = ?1 AND learning_type = ?2 AND candidate_id = ?3
            ",
        )
        .bind(record.learning_id.as_str())
        .bind(record.learning_type.as_str())
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO learning_scores (
                learning_id, learning_type, candidate_id, score, status, answers, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(learning_id, learning_type, candidate_id) DO UPDATE SET
                score = excluded.score,
                status = excluded.status,
                answers = excluded.answers,
                updated_at = excluded.updated_at
            ",
        )
        .bind(record.learning_id.as_str())
        .bind(record.learning_type.as_str())
        .bind(candidate_id)
        .bind(i64::from(record.score))
        .bind(record.status.as_str())
        .bind(answers)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        Ok(if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }
}
