use thiserror::Error;

use crate::model::{AnswerError, LearningTypeError, QuestionError, ScoreStatusError};
use crate::phase::PhaseError;
use crate::scoring::SubmissionError;
use crate::time::OffsetParseError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Offset(#[from] OffsetParseError),
    #[error(transparent)]
    LearningType(#[from] LearningTypeError),
    #[error(transparent)]
    Status(#[from] ScoreStatusError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
}
