mod answer;
mod ids;
mod learning;
mod question;
mod score;

pub use ids::{CandidateId, LearningId, ParseIdError, QuestionId};

pub use answer::{
    AnswerDraft, AnswerError, AnswerRecord, AnswerSet, MergeStats, SELECTION_DELIMITER,
    selected_options,
};
pub use learning::{LearningKey, LearningType, LearningTypeError, ScoreKey};
pub use question::{
    CORRECT_ANSWER_DELIMITER, NO_OPTIONS_PLACEHOLDER, OPTION_SLOTS, Question, QuestionError,
    QuestionType, parse_correct_answers,
};
pub use score::{ScoreRecord, ScoreStatus, ScoreStatusError, pass_mark};
