//! Playback-driven quiz interruption.
//!
//! The [`PhaseScheduler`] watches playback positions reported by a video host
//! and decides when questions are due. It owns no I/O: loading the question
//! bank, persisting answers and pausing the actual player are the caller's
//! job. All transitions go through a single `state` field.

use std::collections::HashSet;
use thiserror::Error;

use crate::model::{AnswerSet, Question, QuestionId, ScoreRecord};
use crate::scoring::ScoreOutcome;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhaseError {
    #[error("question bank already loaded")]
    AlreadyLoaded,
    #[error("no quiz is waiting for answers")]
    NotPaused,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Why a scheduler never pauses playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// No questions exist for this item (or they could not be loaded).
    EmptyBank,
    /// Every question was answered in an earlier session.
    AlreadyCompleted,
    /// The candidate's earlier answers could not be read, so which phases are
    /// done is unknown.
    LoadFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseState {
    /// Waiting for the question bank and persisted answers.
    Idle,
    /// Watching playback for due questions.
    Playing,
    /// Playback is paused until these questions are answered.
    PausedForQuiz { due: Vec<QuestionId> },
    /// Playback never pauses for this item.
    PassThrough(PassThroughReason),
}

/// Where a reported score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// Read from a score record that already covered the whole bank.
    Persisted,
    /// Computed in this session when the last phase was answered.
    Session,
}

/// Final tally surfaced to the host once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreReport {
    pub score: u32,
    /// Size of the question bank.
    pub total: u32,
    pub source: ScoreSource,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Quiz interruption state machine for one learning item and candidate.
///
/// # Examples
///
/// ```
/// # use lms_core::phase::PhaseScheduler;
/// # use lms_core::model::{Question, QuestionId, QuestionType};
/// # use std::collections::BTreeSet;
/// let question = Question::new(
///     QuestionId::new(1),
///     "Ready?",
///     [Some("Yes".to_owned())],
///     BTreeSet::from(["Yes".to_owned()]),
///     QuestionType::Single,
///     30.0,
/// )?;
/// let mut scheduler = PhaseScheduler::new();
/// scheduler.load(vec![question], None)?;
///
/// assert!(scheduler.on_time_update(29.5).is_none());
/// let due = scheduler.on_time_update(30.2).expect("question is due");
/// assert_eq!(due[0].id(), QuestionId::new(1));
/// assert!(scheduler.is_paused());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct PhaseScheduler {
    bank: Vec<Question>,
    answered: HashSet<QuestionId>,
    displayed: HashSet<QuestionId>,
    state: PhaseState,
    score_reported: bool,
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bank: Vec::new(),
            answered: HashSet::new(),
            displayed: HashSet::new(),
            state: PhaseState::Idle,
            score_reported: false,
        }
    }

    /// Load the question bank and the candidate's persisted record.
    ///
    /// The bank is sorted by trigger offset then id; of several rows sharing an
    /// id only the earliest-triggering one is kept. Returns the persisted score
    /// when the record already answers every question in the bank.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::AlreadyLoaded` unless the scheduler is `Idle`.
    pub fn load(
        &mut self,
        mut bank: Vec<Question>,
        persisted: Option<&ScoreRecord>,
    ) -> Result<Option<ScoreReport>, PhaseError> {
        if self.state != PhaseState::Idle {
            return Err(PhaseError::AlreadyLoaded);
        }

        bank.sort_by(Question::trigger_order);
        let mut seen = HashSet::with_capacity(bank.len());
        bank.retain(|q| seen.insert(q.id()));

        self.answered = persisted
            .map(|r| r.answers.question_ids().collect())
            .unwrap_or_default();
        self.bank = bank;

        if self.bank.is_empty() {
            self.state = PhaseState::PassThrough(PassThroughReason::EmptyBank);
            return Ok(None);
        }

        if let Some(record) = persisted.filter(|_| self.is_complete()) {
            self.state = PhaseState::PassThrough(PassThroughReason::AlreadyCompleted);
            self.score_reported = true;
            return Ok(Some(ScoreReport {
                score: record.score,
                total: self.total(),
                source: ScoreSource::Persisted,
            }));
        }

        self.state = PhaseState::Playing;
        Ok(None)
    }

    /// Give up on this session's quiz because the persisted record could not
    /// be read. Playback never pauses afterwards.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::AlreadyLoaded` unless the scheduler is `Idle`.
    pub fn load_failed(&mut self) -> Result<(), PhaseError> {
        if self.state != PhaseState::Idle {
            return Err(PhaseError::AlreadyLoaded);
        }
        self.state = PhaseState::PassThrough(PassThroughReason::LoadFailure);
        Ok(())
    }

    /// React to a playback position (seconds).
    ///
    /// Returns the questions to display when playback must pause. Positions
    /// reported while not `Playing` are discarded, as are non-finite ones.
    pub fn on_time_update(&mut self, position: f64) -> Option<Vec<Question>> {
        if self.state != PhaseState::Playing || !position.is_finite() {
            return None;
        }

        let due: Vec<Question> =
            due_questions(&self.bank, &self.answered, &self.displayed, position)
                .cloned()
                .collect();
        if due.is_empty() {
            return None;
        }

        let ids: Vec<QuestionId> = due.iter().map(Question::id).collect();
        self.displayed.extend(ids.iter().copied());
        self.state = PhaseState::PausedForQuiz { due: ids };
        Some(due)
    }

    /// Resume after the displayed questions were answered and merged.
    ///
    /// `outcome` is the merged result, whether or not it was persisted.
    /// Returns the session score the first time every bank question is
    /// answered.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::NotPaused` if no quiz is being shown.
    pub fn complete_quiz(
        &mut self,
        outcome: &ScoreOutcome,
    ) -> Result<Option<ScoreReport>, PhaseError> {
        if !self.is_paused() {
            return Err(PhaseError::NotPaused);
        }

        self.record_answered(&outcome.answers);
        self.state = PhaseState::Playing;

        if self.is_complete() && !self.score_reported {
            self.score_reported = true;
            return Ok(Some(ScoreReport {
                score: outcome.score,
                total: self.total(),
                source: ScoreSource::Session,
            }));
        }
        Ok(None)
    }

    /// Fold in answers learned from elsewhere (e.g. a fresher store read), so
    /// questions answered on another device are not asked again.
    pub fn record_answered(&mut self, answers: &AnswerSet) {
        self.answered.extend(answers.question_ids());
    }

    #[must_use]
    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    #[must_use]
    pub fn bank(&self) -> &[Question] {
        &self.bank
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(self.state, PhaseState::PausedForQuiz { .. })
    }

    /// Questions currently waiting for answers, in display order.
    #[must_use]
    pub fn pending_questions(&self) -> Vec<&Question> {
        match &self.state {
            PhaseState::PausedForQuiz { due } => due
                .iter()
                .filter_map(|id| self.bank.iter().find(|q| q.id() == *id))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether every question in a non-empty bank has an answer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.bank.is_empty() && self.bank.iter().all(|q| self.answered.contains(&q.id()))
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        u32::try_from(self.bank.len()).unwrap_or(u32::MAX)
    }
}

/// Questions whose offset has been reached and that were neither displayed
/// in this session nor answered before, in bank order.
pub fn due_questions<'a>(
    bank: &'a [Question],
    answered: &'a HashSet<QuestionId>,
    displayed: &'a HashSet<QuestionId>,
    position: f64,
) -> impl Iterator<Item = &'a Question> + 'a {
    bank.iter().filter(move |q| {
        q.trigger_offset() <= position
            && !displayed.contains(&q.id())
            && !answered.contains(&q.id())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AnswerRecord, CandidateId, LearningId, LearningKey, LearningType, QuestionType,
        ScoreStatus, parse_correct_answers,
    };
    use crate::scoring::merge_and_score;

    fn q(id: u64, offset: f64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            [Some("A".to_owned()), Some("B".to_owned())],
            parse_correct_answers(Some("A")),
            QuestionType::Single,
            offset,
        )
        .unwrap()
    }

    fn record(answers: &[(u64, &str)], score: u32) -> ScoreRecord {
        let key = LearningKey::new(LearningType::Training, LearningId::new("TR-1").unwrap())
            .for_candidate(CandidateId::new(7));
        let set = answers
            .iter()
            .map(|(id, text)| AnswerRecord::new(QuestionId::new(*id), *text))
            .collect();
        ScoreRecord::new(key, score, ScoreStatus::Pass, set)
    }

    fn ids(questions: &[Question]) -> Vec<u64> {
        questions.iter().map(|q| q.id().value()).collect()
    }

    fn answer_all(scheduler: &PhaseScheduler, prior: &AnswerSet) -> ScoreOutcome {
        let batch: Vec<AnswerRecord> = scheduler
            .pending_questions()
            .iter()
            .map(|q| AnswerRecord::new(q.id(), "A"))
            .collect();
        merge_and_score(prior, &batch, scheduler.bank())
    }

    #[test]
    fn idle_ignores_time_updates() {
        let mut scheduler = PhaseScheduler::new();
        assert!(scheduler.on_time_update(100.0).is_none());
        assert_eq!(scheduler.state(), &PhaseState::Idle);
    }

    #[test]
    fn pauses_when_offset_reached_and_not_before() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0), q(2, 20.0)], None).unwrap();

        assert!(scheduler.on_time_update(9.99).is_none());
        let due = scheduler.on_time_update(10.0).unwrap();
        assert_eq!(ids(&due), [1]);
        assert_eq!(
            scheduler.state(),
            &PhaseState::PausedForQuiz {
                due: vec![QuestionId::new(1)]
            }
        );
    }

    #[test]
    fn equal_offsets_are_batched_in_id_order() {
        let mut scheduler = PhaseScheduler::new();
        scheduler
            .load(vec![q(9, 30.0), q(4, 30.0), q(2, 60.0)], None)
            .unwrap();

        let due = scheduler.on_time_update(31.0).unwrap();
        assert_eq!(ids(&due), [4, 9]);
    }

    #[test]
    fn seeking_past_several_phases_delivers_them_together() {
        let mut scheduler = PhaseScheduler::new();
        scheduler
            .load(vec![q(3, 50.0), q(1, 10.0), q(2, 20.0)], None)
            .unwrap();

        let due = scheduler.on_time_update(55.0).unwrap();
        assert_eq!(ids(&due), [1, 2, 3]);
    }

    #[test]
    fn time_updates_are_discarded_while_paused() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0), q(2, 20.0)], None).unwrap();
        scheduler.on_time_update(10.0).unwrap();

        assert!(scheduler.on_time_update(25.0).is_none());
        assert_eq!(scheduler.pending_questions().len(), 1);
    }

    #[test]
    fn completed_quiz_resumes_and_does_not_reask() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0), q(2, 20.0)], None).unwrap();
        scheduler.on_time_update(12.0).unwrap();

        let outcome = answer_all(&scheduler, &AnswerSet::new());
        let report = scheduler.complete_quiz(&outcome).unwrap();
        assert!(report.is_none());
        assert_eq!(scheduler.state(), &PhaseState::Playing);

        assert!(scheduler.on_time_update(15.0).is_none());
        let due = scheduler.on_time_update(20.0).unwrap();
        assert_eq!(ids(&due), [2]);
    }

    #[test]
    fn reports_session_score_once_when_last_phase_answered() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0), q(2, 20.0)], None).unwrap();

        scheduler.on_time_update(10.0).unwrap();
        let first = answer_all(&scheduler, &AnswerSet::new());
        assert!(scheduler.complete_quiz(&first).unwrap().is_none());

        scheduler.on_time_update(20.0).unwrap();
        let second = answer_all(&scheduler, &first.answers);
        let report = scheduler.complete_quiz(&second).unwrap().unwrap();
        assert_eq!(
            report,
            ScoreReport {
                score: 2,
                total: 2,
                source: ScoreSource::Session
            }
        );
        assert!(scheduler.is_complete());
    }

    #[test]
    fn previously_answered_questions_are_skipped() {
        let mut scheduler = PhaseScheduler::new();
        let prior = record(&[(1, "A")], 1);
        let report = scheduler
            .load(vec![q(1, 10.0), q(2, 20.0)], Some(&prior))
            .unwrap();
        assert!(report.is_none());

        let due = scheduler.on_time_update(25.0).unwrap();
        assert_eq!(ids(&due), [2]);
    }

    #[test]
    fn fully_answered_record_reports_persisted_score_and_never_pauses() {
        let mut scheduler = PhaseScheduler::new();
        let prior = record(&[(1, "A"), (2, "B")], 1);
        let report = scheduler
            .load(vec![q(1, 10.0), q(2, 20.0)], Some(&prior))
            .unwrap()
            .unwrap();

        assert_eq!(
            report,
            ScoreReport {
                score: 1,
                total: 2,
                source: ScoreSource::Persisted
            }
        );
        assert_eq!(
            scheduler.state(),
            &PhaseState::PassThrough(PassThroughReason::AlreadyCompleted)
        );
        assert!(scheduler.on_time_update(100.0).is_none());
    }

    #[test]
    fn empty_bank_passes_through() {
        let mut scheduler = PhaseScheduler::new();
        let report = scheduler.load(Vec::new(), Some(&record(&[(1, "A")], 1))).unwrap();
        assert!(report.is_none());
        assert_eq!(
            scheduler.state(),
            &PhaseState::PassThrough(PassThroughReason::EmptyBank)
        );
        assert!(scheduler.on_time_update(1_000.0).is_none());
    }

    #[test]
    fn unreadable_record_passes_through() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load_failed().unwrap();
        assert_eq!(
            scheduler.state(),
            &PhaseState::PassThrough(PassThroughReason::LoadFailure)
        );
        assert!(scheduler.on_time_update(1_000.0).is_none());
        assert_eq!(
            scheduler.load(vec![q(1, 10.0)], None),
            Err(PhaseError::AlreadyLoaded)
        );
    }

    #[test]
    fn loading_twice_is_rejected() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0)], None).unwrap();
        assert_eq!(
            scheduler.load(vec![q(1, 10.0)], None),
            Err(PhaseError::AlreadyLoaded)
        );
    }

    #[test]
    fn completing_without_quiz_is_rejected() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0)], None).unwrap();
        let outcome = merge_and_score(&AnswerSet::new(), &[], scheduler.bank());
        assert_eq!(scheduler.complete_quiz(&outcome), Err(PhaseError::NotPaused));
    }

    #[test]
    fn duplicate_ids_keep_earliest_trigger() {
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(vec![q(1, 10.0), q(1, 5.0)], None).unwrap();
        assert_eq!(scheduler.bank().len(), 1);
        assert_eq!(scheduler.bank()[0].trigger_offset(), 5.0);
    }
}
