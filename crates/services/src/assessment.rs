use std::sync::Arc;

use lms_core::model::{
    AnswerRecord, CandidateId, LearningId, LearningKey, LearningType, Question, ScoreKey,
    ScoreRecord,
};
use lms_core::scoring::{ScoreOutcome, score_submission, validate_submission};
use storage::repository::ScoreRepository;

use crate::error::AssessmentError;
use crate::persist::{PersistStatus, persist_score};
use crate::question_bank::QuestionBankLoader;
use crate::settings::SessionSettings;

/// An end-of-item assessment ready to be answered.
#[derive(Debug, Clone)]
pub struct Assessment {
    key: ScoreKey,
    questions: Vec<Question>,
    previous: Option<ScoreRecord>,
}

impl Assessment {
    #[must_use]
    pub fn key(&self) -> &ScoreKey {
        &self.key
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The candidate's earlier attempt, if one was found.
    #[must_use]
    pub fn previous(&self) -> Option<&ScoreRecord> {
        self.previous.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentResult {
    pub outcome: ScoreOutcome,
    pub persist: PersistStatus,
}

/// Whole-item assessments for policies, orientations and trainings without
/// video phases. A retake replaces the previous answers.
#[derive(Clone)]
pub struct AssessmentService {
    loader: QuestionBankLoader,
    scores: Arc<dyn ScoreRepository>,
    settings: SessionSettings,
}

impl AssessmentService {
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

    /// # Errors
    ///
    /// Returns `AssessmentError::NoQuestions` if the bank is empty or could
    /// not be loaded.
    pub async fn start(
        &self,
        learning_type: LearningType,
        learning_id: LearningId,
        candidate: CandidateId,
    ) -> Result<Assessment, AssessmentError> {
        let learning = LearningKey::new(learning_type, learning_id);
        let questions = self.loader.load(&learning).await;
        if questions.is_empty() {
            return Err(AssessmentError::NoQuestions);
        }

        let key = learning.for_candidate(candidate);
        let previous = self.scores.fetch_score(&key).await.unwrap_or_else(|error| {
            tracing::warn!(key = %key, %error, "previous score fetch failed");
            None
        });

        Ok(Assessment {
            key,
            questions,
            previous,
        })
    }

    /// Score a complete submission and store it as the candidate's record.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Submission` if any question is unanswered.
    pub async fn submit(
        &self,
        assessment: &Assessment,
        answers: &[AnswerRecord],
    ) -> Result<AssessmentResult, AssessmentError> {
        let accepted = validate_submission(&assessment.questions, answers)?;
        let outcome = score_submission(&accepted, &assessment.questions);
        let record = ScoreRecord::new(
            assessment.key.clone(),
            outcome.score,
            outcome.status,
            outcome.answers.clone(),
        );
        let persist =
            persist_score(self.scores.as_ref(), &record, self.settings.persist_timeout).await;
        tracing::info!(
            key = %assessment.key,
            score = outcome.score,
            total = outcome.total,
            status = %outcome.status,
            saved = persist.is_saved(),
            "assessment submitted"
        );

        Ok(AssessmentResult { outcome, persist })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::{QuestionId, ScoreStatus};
    use storage::repository::{InMemoryRepository, QuestionBankRepository, QuestionRow};

    async fn seeded() -> (AssessmentService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        for (id, answer, kind) in [(1, "A", "Single"), (2, "A:B", "Multiple"), (3, "B", "Single")] {
            repo.upsert_question(&QuestionRow {
                id,
                learning_type: LearningType::Policy,
                learning_id: LearningId::new("POL-1").unwrap(),
                prompt: Some(format!("Q{id}")),
                options: [Some("A".into()), Some("B".into()), Some("C".into()), None],
                answer: Some(answer.into()),
                question_type: Some(kind.into()),
                phase_duration: None,
            })
            .await
            .unwrap();
        }
        let service = AssessmentService::new(
            QuestionBankLoader::new(Arc::new(repo.clone())),
            Arc::new(repo.clone()),
            SessionSettings::default(),
        );
        (service, repo)
    }

    fn a(id: u64, text: &str) -> AnswerRecord {
        AnswerRecord::new(QuestionId::new(id), text)
    }

    #[tokio::test]
    async fn empty_bank_has_no_assessment() {
        let (service, _repo) = seeded().await;
        let err = service
            .start(
                LearningType::Orientation,
                LearningId::new("POL-1").unwrap(),
                CandidateId::new(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::NoQuestions));
    }

    #[tokio::test]
    async fn retake_replaces_previous_answers() {
        let (service, repo) = seeded().await;
        let candidate = CandidateId::new(4);
        let assessment = service
            .start(LearningType::Policy, LearningId::new("POL-1").unwrap(), candidate)
            .await
            .unwrap();
        assert!(assessment.previous().is_none());

        let first = service
            .submit(&assessment, &[a(1, "A"), a(2, "A"), a(3, "C")])
            .await
            .unwrap();
        assert_eq!(first.outcome.score, 1);
        assert_eq!(first.outcome.status, ScoreStatus::Fail);

        let retake = service
            .start(LearningType::Policy, LearningId::new("POL-1").unwrap(), candidate)
            .await
            .unwrap();
        assert_eq!(retake.previous().map(|r| r.score), Some(1));

        let second = service
            .submit(&retake, &[a(1, "A"), a(2, "B,A"), a(3, "B")])
            .await
            .unwrap();
        assert_eq!(second.outcome.score, 3);
        assert_eq!(second.outcome.status, ScoreStatus::Pass);
        assert_eq!(repo.score_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn incomplete_submission_is_rejected() {
        let (service, repo) = seeded().await;
        let assessment = service
            .start(LearningType::Policy, LearningId::new("POL-1").unwrap(), CandidateId::new(1))
            .await
            .unwrap();
        let err = service.submit(&assessment, &[a(1, "A")]).await.unwrap_err();
        assert!(matches!(err, AssessmentError::Submission(_)));
        assert_eq!(repo.score_count().unwrap(), 0);
    }
}
