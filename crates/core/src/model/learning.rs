use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CandidateId, LearningId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown learning type: {0}")]
pub struct LearningTypeError(pub String);

/// Kind of learning item a question bank or score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LearningType {
    Policy,
    Orientation,
    Training,
}

impl LearningType {
    pub const ALL: [LearningType; 3] = [Self::Policy, Self::Orientation, Self::Training];

    /// Tag used by the list store and the SQL schema.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LearningType::Policy => "Policy",
            LearningType::Orientation => "Orientation",
            LearningType::Training => "Training",
        }
    }
}

impl fmt::Display for LearningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningType {
    type Err = LearningTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| LearningTypeError(trimmed.to_owned()))
    }
}

/// Identifies one learning item: a question bank is keyed by this pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LearningKey {
    pub learning_type: LearningType,
    pub learning_id: LearningId,
}

impl LearningKey {
    #[must_use]
    pub fn new(learning_type: LearningType, learning_id: LearningId) -> Self {
        Self {
            learning_type,
            learning_id,
        }
    }

    /// Narrow this item down to one candidate's score record.
    #[must_use]
    pub fn for_candidate(&self, candidate_id: CandidateId) -> ScoreKey {
        ScoreKey {
            learning_id: self.learning_id.clone(),
            learning_type: self.learning_type,
            candidate_id,
        }
    }
}

impl fmt::Display for LearningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.learning_type, self.learning_id)
    }
}

/// Natural key of a score record. At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub learning_id: LearningId,
    pub learning_type: LearningType,
    pub candidate_id: CandidateId,
}

impl ScoreKey {
    #[must_use]
    pub fn learning(&self) -> LearningKey {
        LearningKey::new(self.learning_type, self.learning_id.clone())
    }
}

impl fmt::Display for ScoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}#{}",
            self.learning_type, self.learning_id, self.candidate_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_tags_case_insensitively() {
        assert_eq!("training".parse::<LearningType>(), Ok(LearningType::Training));
        assert_eq!(" Policy ".parse::<LearningType>(), Ok(LearningType::Policy));
        assert!("Webinar".parse::<LearningType>().is_err());
    }

    #[test]
    fn score_key_display_includes_candidate() {
        let key = LearningKey::new(LearningType::Training, LearningId::new("TR-1").unwrap())
            .for_candidate(CandidateId::new(12));
        assert_eq!(key.to_string(), "Training/TR-1#12");
        assert_eq!(key.learning().learning_type, LearningType::Training);
    }
}
