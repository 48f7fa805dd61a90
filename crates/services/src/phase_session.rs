//! Video phase sessions: the phase scheduler wired to the score store and to
//! a hosting player.
//!
//! The host reports playback positions and quiz submissions; the session
//! tells the host when to pause, what to display, when to resume and when
//! the final score is known. Store failures never leave the player paused.

use std::sync::Arc;

use lms_core::model::{
    AnswerRecord, AnswerSet, CandidateId, LearningKey, Question, ScoreKey, ScoreRecord,
};
use lms_core::phase::{PhaseScheduler, PhaseState, ScoreReport};
use lms_core::scoring::{ScoreOutcome, merge_and_score, validate_submission};
use storage::repository::{ScoreRepository, StorageError};

use crate::error::PhaseSessionError;
use crate::persist::{PersistStatus, persist_score};
use crate::question_bank::QuestionBankLoader;
use crate::settings::SessionSettings;

/// Callbacks into the hosting video player and quiz display.
pub trait PhaseHost {
    fn pause(&mut self);
    fn resume(&mut self);
    /// Display these questions; playback is already paused.
    fn on_due(&mut self, questions: &[Question]);
    /// The final tally is known. Called at most once per session.
    fn on_score_available(&mut self, report: ScoreReport);
}

/// Result of one accepted quiz submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCompletion {
    pub outcome: ScoreOutcome,
    pub persist: PersistStatus,
    /// Set when this submission answered the last outstanding question.
    pub report: Option<ScoreReport>,
}

/// One candidate watching one learning item's video.
#[derive(Debug, Clone)]
pub struct VideoPhaseSession {
    key: ScoreKey,
    scheduler: PhaseScheduler,
    answers: AnswerSet,
    unsynced: bool,
}

impl VideoPhaseSession {
    #[must_use]
    pub fn key(&self) -> &ScoreKey {
        &self.key
    }

    #[must_use]
    pub fn state(&self) -> &PhaseState {
        self.scheduler.state()
    }

    #[must_use]
    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    /// Latest merged answers known to this session.
    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// Whether the last merge could not be persisted.
    #[must_use]
    pub fn has_unsynced_score(&self) -> bool {
        self.unsynced
    }

    /// Feed a playback position. Pauses the host and hands it the due
    /// questions when a phase is reached. Returns whether playback paused.
    pub fn on_time_update(&mut self, position: f64, host: &mut dyn PhaseHost) -> bool {
        let Some(due) = self.scheduler.on_time_update(position) else {
            return false;
        };
        tracing::info!(
            key = %self.key,
            position,
            questions = due.len(),
            "phase reached, pausing for quiz"
        );
        host.pause();
        host.on_due(&due);
        true
    }
}

/// Starts video phase sessions and completes their quizzes.
#[derive(Clone)]
pub struct PhaseSessionService {
    loader: QuestionBankLoader,
    scores: Arc<dyn ScoreRepository>,
    settings: SessionSettings,
}

impl PhaseSessionService {
    #[must_use]
    pub fn new(
        loader: QuestionBankLoader,
        scores: Arc<dyn ScoreRepository>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            loader,
            scores,
            settings,
        }
    }

    /// Load the bank and the candidate's record and start watching playback.
    ///
    /// If the record already answers the whole bank the persisted score is
    /// reported to `host` right away and the session never pauses. If the
    /// record cannot be read the session passes through without asking
    /// anything, so answered phases are never re-asked and the stored record
    /// is never overwritten from a partial view.
    ///
    /// # Errors
    ///
    /// Returns `PhaseSessionError::Phase` only if the scheduler rejects the
    /// load, which cannot happen for a fresh session.
    pub async fn start(
        &self,
        learning: LearningKey,
        candidate: CandidateId,
        host: &mut dyn PhaseHost,
    ) -> Result<VideoPhaseSession, PhaseSessionError> {
        let key = learning.for_candidate(candidate);
        let mut scheduler = PhaseScheduler::new();

        let Ok(persisted) = self.fetch_record(&key).await else {
            scheduler.load_failed()?;
            tracing::warn!(key = %key, "earlier answers unavailable, quiz disabled");
            return Ok(VideoPhaseSession {
                key,
                scheduler,
                answers: AnswerSet::new(),
                unsynced: false,
            });
        };

        let bank = self.loader.load(&learning).await;
        let report = scheduler.load(bank, persisted.as_ref())?;
        tracing::info!(
            key = %key,
            state = ?scheduler.state(),
            total = scheduler.total(),
            "phase session started"
        );
        if let Some(report) = report {
            host.on_score_available(report);
        }

        Ok(VideoPhaseSession {
            key,
            scheduler,
            answers: persisted.map(|r| r.answers).unwrap_or_default(),
            unsynced: false,
        })
    }

    /// Merge the submitted answers, persist, and resume playback.
    ///
    /// The latest stored answers are re-read right before merging. Persist
    /// failures and timeouts are logged and reported in the result; playback
    /// resumes either way.
    ///
    /// # Errors
    ///
    /// - `Phase(NotPaused)` if no quiz is displayed
    /// - `Submission(Unanswered)` if a displayed question has no answer; the
    ///   session stays paused
    pub async fn on_quiz_complete(
        &self,
        session: &mut VideoPhaseSession,
        answers: &[AnswerRecord],
        host: &mut dyn PhaseHost,
    ) -> Result<QuizCompletion, PhaseSessionError> {
        if !session.scheduler.is_paused() {
            return Err(lms_core::phase::PhaseError::NotPaused.into());
        }
        let presented: Vec<Question> = session
            .scheduler
            .pending_questions()
            .into_iter()
            .cloned()
            .collect();
        let accepted = validate_submission(&presented, answers).inspect_err(|error| {
            tracing::info!(key = %session.key, %error, "quiz submission rejected");
        })?;

        // A failed re-read falls back to what the successful start read saw
        // plus this session's merges.
        let mut base = match self.fetch_record(&session.key).await {
            Ok(Some(latest)) => {
                session.scheduler.record_answered(&latest.answers);
                latest.answers
            }
            Ok(None) | Err(_) => session.answers.clone(),
        };
        // Answers from a failed persist are newer than anything stored.
        if session.unsynced {
            base.merge(session.answers.to_records());
        }

        let outcome = merge_and_score(&base, &accepted, session.scheduler.bank());
        let record = ScoreRecord::new(
            session.key.clone(),
            outcome.score,
            outcome.status,
            outcome.answers.clone(),
        );
        let persist =
            persist_score(self.scores.as_ref(), &record, self.settings.persist_timeout).await;

        session.answers = outcome.answers.clone();
        session.unsynced = !persist.is_saved();
        let report = session.scheduler.complete_quiz(&outcome)?;

        host.resume();
        if let Some(report) = report {
            tracing::info!(
                key = %session.key,
                score = report.score,
                total = report.total,
                "final score available"
            );
            host.on_score_available(report);
        }

        Ok(QuizCompletion {
            outcome,
            persist,
            report,
        })
    }

    async fn fetch_record(&self, key: &ScoreKey) -> Result<Option<ScoreRecord>, StorageError> {
        self.scores.fetch_score(key).await.inspect_err(|error| {
            tracing::warn!(key = %key, %error, "score fetch failed");
        })
    }
}
