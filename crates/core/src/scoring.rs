//! Merging submitted answers with persisted ones and scoring the result.
//!
//! Scores are always recomputed from the full merged answer set against the
//! question bank. A stored score is never incremented, so correcting an
//! answer cannot count the same question twice.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::model::{
    AnswerRecord, AnswerSet, MergeStats, Question, QuestionId, QuestionType, ScoreStatus,
    selected_options,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("please answer all the questions before submitting ({} unanswered)", .missing.len())]
    Unanswered { missing: Vec<QuestionId> },
}

/// Result of merging a batch of answers and re-scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub answers: AnswerSet,
    pub score: u32,
    /// Number of answered questions the score was computed over.
    pub total: u32,
    pub status: ScoreStatus,
    pub merge: MergeStats,
}

/// Whether stored answer text is a correct answer to `question`.
///
/// - `Single`: exactly one option picked, equal to the only correct answer.
/// - `Multiple`: the picked set equals the correct set. No partial credit.
///
/// An empty selection is never correct.
#[must_use]
pub fn is_correct(question: &Question, answer_text: &str) -> bool {
    let picked = selected_options(answer_text);
    if picked.is_empty() {
        return false;
    }
    let correct: BTreeSet<&str> = question
        .correct_answers()
        .iter()
        .map(String::as_str)
        .collect();

    match question.question_type() {
        QuestionType::Single => picked.len() == 1 && correct.len() == 1 && picked == correct,
        QuestionType::Multiple => picked == correct,
    }
}

/// Count correct answers in `answers`. Answers to questions missing from the
/// bank are counted as incorrect.
#[must_use]
pub fn score_answers(bank: &[Question], answers: &AnswerSet) -> u32 {
    let by_id: HashMap<QuestionId, &Question> = bank.iter().map(|q| (q.id(), q)).collect();
    let correct = answers
        .iter()
        .filter(|(id, text)| by_id.get(id).is_some_and(|q| is_correct(q, text)))
        .count();
    saturating_u32(correct)
}

/// Merge `batch` into a copy of `existing` (last write wins per question),
/// then recompute score and status over the merged set.
#[must_use]
pub fn merge_and_score(
    existing: &AnswerSet,
    batch: &[AnswerRecord],
    bank: &[Question],
) -> ScoreOutcome {
    let mut answers = existing.clone();
    let merge = answers.merge(batch.iter().cloned());
    let score = score_answers(bank, &answers);
    let total = saturating_u32(answers.len());

    ScoreOutcome {
        status: ScoreStatus::from_tally(score, total),
        answers,
        score,
        total,
        merge,
    }
}

/// Score a standalone submission that replaces any previous answers.
#[must_use]
pub fn score_submission(batch: &[AnswerRecord], bank: &[Question]) -> ScoreOutcome {
    merge_and_score(&AnswerSet::new(), batch, bank)
}

/// Check that every presented question has a non-empty answer.
///
/// Returns one record per presented question, in presentation order. Answers
/// for questions that were not presented are dropped; for duplicates the
/// last one wins.
///
/// # Errors
///
/// Returns `SubmissionError::Unanswered` listing missing ids in ascending order.
pub fn validate_submission(
    presented: &[Question],
    answers: &[AnswerRecord],
) -> Result<Vec<AnswerRecord>, SubmissionError> {
    let by_id: HashMap<QuestionId, &AnswerRecord> =
        answers.iter().map(|a| (a.question_id, a)).collect();

    let mut accepted = Vec::with_capacity(presented.len());
    let mut missing = Vec::new();
    for question in presented {
        match by_id.get(&question.id()) {
            Some(record) if !record.selected().is_empty() => accepted.push((*record).clone()),
            _ => missing.push(question.id()),
        }
    }

    if missing.is_empty() {
        Ok(accepted)
    } else {
        missing.sort_unstable();
        Err(SubmissionError::Unanswered { missing })
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
