//! Fetches question rows for a learning item and turns them into `Question`s.

use std::sync::Arc;

use lms_core::model::{LearningKey, Question, QuestionId, QuestionType, parse_correct_answers};
use lms_core::time::parse_offset;
use storage::repository::{QuestionBankRepository, QuestionRow};

#[derive(Clone)]
pub struct QuestionBankLoader {
    questions: Arc<dyn QuestionBankRepository>,
}

impl QuestionBankLoader {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionBankRepository>) -> Self {
        Self { questions }
    }

    /// Load the bank for `key`, sorted by trigger offset then id.
    ///
    /// A fetch failure yields an empty bank, meaning "no quiz for this item".
    /// Rows that cannot be normalized are skipped. Both are logged.
    pub async fn load(&self, key: &LearningKey) -> Vec<Question> {
        let rows = match self.questions.fetch_questions(key).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(learning = %key, %error, "question bank fetch failed");
                return Vec::new();
            }
        };

        let mut bank: Vec<Question> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                normalize_row(row)
                    .inspect_err(|error| {
                        tracing::warn!(
                            learning = %key,
                            question = id,
                            %error,
                            "skipping malformed question"
                        );
                    })
                    .ok()
            })
            .collect();
        bank.sort_by(Question::trigger_order);
        tracing::debug!(learning = %key, questions = bank.len(), "question bank loaded");
        bank
    }
}

/// Convert a stored row into a `Question`.
///
/// A missing type tag means `Single` and a missing phase duration means the
/// start of the video. A missing answer yields an empty correct set.
///
/// # Errors
///
/// Returns `lms_core::Error` for an unknown type tag, a malformed
/// `HH:MM:SS` duration, or more options than slots.
pub fn normalize_row(row: QuestionRow) -> Result<Question, lms_core::Error> {
    let question_type = match row.question_type.as_deref().map(str::trim) {
        None | Some("") => QuestionType::Single,
        Some(tag) => tag.parse()?,
    };
    let trigger_offset = match row.phase_duration.as_deref().map(str::trim) {
        None | Some("") => 0.0,
        Some(raw) => parse_offset(raw)?,
    };

    Ok(Question::new(
        QuestionId::new(row.id),
        row.prompt.unwrap_or_default(),
        row.options,
        parse_correct_answers(row.answer.as_deref()),
        question_type,
        trigger_offset,
    )?)
}
