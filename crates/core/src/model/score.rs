use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::answer::AnswerSet;
use crate::model::ids::{CandidateId, LearningId};
use crate::model::learning::{LearningType, ScoreKey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown score status: {0}")]
pub struct ScoreStatusError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreStatus {
    Pass,
    Fail,
}

impl ScoreStatus {
    /// `Pass` when at least half of the considered questions (rounded up)
    /// were answered correctly.
    ///
    /// Zero questions considered is a `Pass`: nothing was asked and nothing
    /// was failed.
    #[must_use]
    pub fn from_tally(score: u32, total: u32) -> Self {
        if score >= pass_mark(total) {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreStatus::Pass => "Pass",
            ScoreStatus::Fail => "Fail",
        }
    }
}

/// Minimum number of correct answers needed to pass `total` questions.
#[must_use]
pub fn pass_mark(total: u32) -> u32 {
    total.div_ceil(2)
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreStatus {
    type Err = ScoreStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("pass") {
            Ok(Self::Pass)
        } else if trimmed.eq_ignore_ascii_case("fail") {
            Ok(Self::Fail)
        } else {
            Err(ScoreStatusError(trimmed.to_owned()))
        }
    }
}

/// A candidate's persisted result for one learning item.
///
/// One record exists per [`ScoreKey`]; later submissions update it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub learning_id: LearningId,
    pub learning_type: LearningType,
    pub candidate_id: CandidateId,
    pub score: u32,
    pub status: ScoreStatus,
    pub answers: AnswerSet,
}

impl ScoreRecord {
    #[must_use]
    pub fn new(key: ScoreKey, score: u32, status: ScoreStatus, answers: AnswerSet) -> Self {
        Self {
            learning_id: key.learning_id,
            learning_type: key.learning_type,
            candidate_id: key.candidate_id,
            score,
            status,
            answers,
        }
    }

    #[must_use]
    pub fn key(&self) -> ScoreKey {
        ScoreKey {
            learning_id: self.learning_id.clone(),
            learning_type: self.learning_type,
            candidate_id: self.candidate_id,
        }
    }
}
