use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Number of option slots a question row can carry.
pub const OPTION_SLOTS: usize = 4;

/// Shown instead of an empty choice list when a row carries no usable option.
pub const NO_OPTIONS_PLACEHOLDER: &str = "No options available";

/// Separates correct answers inside a question bank `answer` field.
pub const CORRECT_ANSWER_DELIMITER: char = ':';

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("trigger offset must be finite and non-negative, got {provided}")]
    InvalidOffset { provided: f64 },
    #[error("at most {OPTION_SLOTS} options are supported, got {count}")]
    TooManyOptions { count: usize },
    #[error("unknown question type: {0}")]
    UnknownType(String),
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// How many options a candidate may pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    /// Exactly one option; correct iff it is the sole correct answer.
    Single,
    /// Any number of options; correct iff the picked set equals the correct set.
    Multiple,
}

impl QuestionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Single => "Single",
            QuestionType::Multiple => "Multiple",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("single") {
            Ok(Self::Single)
        } else if trimmed.eq_ignore_ascii_case("multiple") {
            Ok(Self::Multiple)
        } else {
            Err(QuestionError::UnknownType(trimmed.to_owned()))
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A quiz question attached to a learning item.
///
/// Questions are immutable once loaded. The option list is never empty: a
/// question without usable options carries [`NO_OPTIONS_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_answers: BTreeSet<String>,
    question_type: QuestionType,
    trigger_offset: f64,
}

impl Question {
    /// Build a question from already-split parts.
    ///
    /// Missing (`None`) and blank option slots are dropped while preserving
    /// slot order.
    ///
    /// # Errors
    ///
    /// - `InvalidOffset` if `trigger_offset` is negative, NaN or infinite
    /// - `TooManyOptions` if more than [`OPTION_SLOTS`] options are given
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = Option<String>>,
        correct_answers: BTreeSet<String>,
        question_type: QuestionType,
        trigger_offset: f64,
    ) -> Result<Self, QuestionError> {
        if !trigger_offset.is_finite() || trigger_offset < 0.0 {
            return Err(QuestionError::InvalidOffset {
                provided: trigger_offset,
            });
        }

        let mut options: Vec<String> = options
            .into_iter()
            .flatten()
            .filter(|o| !o.trim().is_empty())
            .collect();
        if options.len() > OPTION_SLOTS {
            return Err(QuestionError::TooManyOptions {
                count: options.len(),
            });
        }
        if options.is_empty() {
            options.push(NO_OPTIONS_PLACEHOLDER.to_owned());
        }

        Ok(Self {
            id,
            prompt: prompt.into(),
            options,
            correct_answers,
            question_type,
            trigger_offset,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answers(&self) -> &BTreeSet<String> {
        &self.correct_answers
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    /// Playback position (seconds) at which this question becomes due.
    #[must_use]
    pub fn trigger_offset(&self) -> f64 {
        self.trigger_offset
    }

    #[must_use]
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Ordering used for a question bank: trigger offset, then id.
    #[must_use]
    pub fn trigger_order(a: &Question, b: &Question) -> Ordering {
        a.trigger_offset
            .total_cmp(&b.trigger_offset)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Splits a bank `answer` field into the set of correct options.
///
/// `None` yields the empty set. Empty segments (`"A:"`) are skipped.
#[must_use]
pub fn parse_correct_answers(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|r| {
        r.split(CORRECT_ANSWER_DELIMITER)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(list: &[Option<&str>]) -> Vec<Option<String>> {
        list.iter().map(|o| o.map(str::to_owned)).collect()
    }

    #[test]
    fn drops_missing_and_blank_options_in_slot_order() {
        let q = Question::new(
            QuestionId::new(1),
            "Pick",
            opts(&[Some("A"), None, Some("  "), Some("D")]),
            parse_correct_answers(Some("A")),
            QuestionType::Single,
            10.0,
        )
        .unwrap();
        assert_eq!(q.options(), ["A", "D"]);
        assert!(q.offers("D"));
        assert!(!q.offers("B"));
    }

    #[test]
    fn substitutes_placeholder_when_no_options_remain() {
        let q = Question::new(
            QuestionId::new(1),
            "Pick",
            opts(&[None, None, None, None]),
            BTreeSet::new(),
            QuestionType::Single,
            0.0,
        )
        .unwrap();
        assert_eq!(q.options(), [NO_OPTIONS_PLACEHOLDER]);
    }

    #[test]
    fn rejects_negative_or_nan_offsets() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let err = Question::new(
                QuestionId::new(1),
                "Pick",
                opts(&[Some("A")]),
                BTreeSet::new(),
                QuestionType::Single,
                bad,
            )
            .unwrap_err();
            assert!(matches!(err, QuestionError::InvalidOffset { .. }));
        }
    }

    #[test]
    fn rejects_more_than_four_options() {
        let err = Question::new(
            QuestionId::new(1),
            "Pick",
            opts(&[Some("A"), Some("B"), Some("C"), Some("D"), Some("E")]),
            BTreeSet::new(),
            QuestionType::Multiple,
            0.0,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::TooManyOptions { count: 5 });
    }

    #[test]
    fn splits_correct_answers_on_colon() {
        let set = parse_correct_answers(Some("Red:Blue:"));
        assert_eq!(set.len(), 2);
        assert!(set.contains("Red") && set.contains("Blue"));
        assert!(parse_correct_answers(None).is_empty());
    }

    #[test]
    fn parses_question_type_tags() {
        assert_eq!("single".parse::<QuestionType>(), Ok(QuestionType::Single));
        assert_eq!("MULTIPLE".parse::<QuestionType>(), Ok(QuestionType::Multiple));
        assert!("essay".parse::<QuestionType>().is_err());
    }
}
