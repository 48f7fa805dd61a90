use lms_core::model::{AnswerSet, CandidateId, LearningId, LearningType, ScoreRecord, ScoreStatus};
use sqlx::Row;

use crate::repository::{QuestionRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn candidate_id_to_i64(id: CandidateId) -> Result<i64, StorageError> {
    u64_to_i64("candidate_id", id.value())
}

fn learning_id_from_str(raw: String) -> Result<LearningId, StorageError> {
    LearningId::new(raw).ok_or_else(|| StorageError::Serialization("blank learning_id".into()))
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuestionRow, StorageError> {
    let learning_type: LearningType = row
        .try_get::<String, _>("learning_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(QuestionRow {
        id: i64_to_u64("id", row.try_get("id").map_err(ser)?)?,
        learning_type,
        learning_id: learning_id_from_str(row.try_get("learning_id").map_err(ser)?)?,
        prompt: row.try_get("prompt").map_err(ser)?,
        options: [
            row.try_get("option1").map_err(ser)?,
            row.try_get("option2").map_err(ser)?,
            row.try_get("option3").map_err(ser)?,
            row.try_get("option4").map_err(ser)?,
        ],
        answer: row.try_get("answer").map_err(ser)?,
        question_type: row.try_get("question_type").map_err(ser)?,
        phase_duration: row.try_get("phase_duration").map_err(ser)?,
    })
}

pub(crate) fn map_score_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScoreRecord, StorageError> {
    let score_i64: i64 = row.try_get("score").map_err(ser)?;
    let score = u32::try_from(score_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid score: {score_i64}")))?;
    let status: ScoreStatus = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let answers: AnswerSet =
        serde_json::from_str(&row.try_get::<String, _>("answers").map_err(ser)?).map_err(ser)?;
    let learning_type: LearningType = row
        .try_get::<String, _>("learning_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(ScoreRecord {
        learning_id: learning_id_from_str(row.try_get("learning_id").map_err(ser)?)?,
        learning_type,
        candidate_id: CandidateId::new(i64_to_u64(
            "candidate_id",
            row.try_get("candidate_id").map_err(ser)?,
        )?),
        score,
        status,
        answers,
    })
}
