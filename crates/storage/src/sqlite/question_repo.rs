use lms_core::model::LearningKey;

use super::SqliteRepository;
use super::mapping::{conn, map_question_row, u64_to_i64};
use crate::repository::{QuestionBankRepository, QuestionRow, StorageError};

#[async_trait::async_trait]
impl QuestionBankRepository for SqliteRepository {
    async fn fetch_questions(&self, key: &LearningKey) -> Result<Vec<QuestionRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, learning_type, learning_id, prompt, option1, option2, option3, option4,
                   answer, question_type, phase_duration
            FROM questions
            WHERE learning_type = ?1 AND learning_id = ?2
            ORDER BY id ASC
            ",
        )
        .bind(key.learning_type.as_str())
        .bind(key.learning_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        Ok(questions)
    }

    async fn upsert_question(&self, row: &QuestionRow) -> Result<(), StorageError> {
        let [option1, option2, option3, option4] = row.options.clone();

        sqlx::query(
            r"
            INSERT INTO questions (
                id, learning_type, learning_id, prompt, option1, option2, option3, option4,
                answer, question_type, phase_duration
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(learning_type, learning_id, id) DO UPDATE SET
                prompt = excluded.prompt,
                option1 = excluded.option1,
                option2 = excluded.option2,
                option3 = excluded.option3,
                option4 = excluded.option4,
                answer = excluded.answer,
                question_type = excluded.question_type,
                phase_duration = excluded.phase_duration
            ",
        )
        .bind(u64_to_i64("id", row.id)?)
        .bind(row.learning_type.as_str())
        .bind(row.learning_id.as_str())
        .bind(row.prompt.as_deref())
        .bind(option1)
        .bind(option2)
        .bind(option3)
        .bind(option4)
        .bind(row.answer.as_deref())
        .bind(row.question_type.as_deref())
        .bind(row.phase_duration.as_deref())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
