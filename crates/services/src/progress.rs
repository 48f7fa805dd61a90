use std::sync::Arc;

use lms_core::model::{CandidateId, LearningId, LearningKey, LearningType, ScoreStatus};
use storage::repository::ScoreRepository;

use crate::question_bank::QuestionBankLoader;

/// Where a candidate stands on one learning item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningProgress {
    NotStarted {
        total: u32,
    },
    InProgress {
        answered: u32,
        total: u32,
    },
    Completed {
        score: u32,
        total: u32,
        status: ScoreStatus,
    },
}

#[derive(Clone)]
pub struct ProgressService {
    loader: QuestionBankLoader,
    scores: Arc<dyn ScoreRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(loader: QuestionBankLoader, scores: Arc<dyn ScoreRepository>) -> Self {
        Self { loader, scores }
    }

    /// Combine the bank size with the stored record.
    ///
    /// A record on an item without a loadable bank counts as completed over
    /// its own answers. A failed score fetch reads as `NotStarted`.
    pub async fn progress(
        &self,
        learning_type: LearningType,
        learning_id: LearningId,
        candidate: CandidateId,
    ) -> LearningProgress {
        let learning = LearningKey::new(learning_type, learning_id);
        let bank = self.loader.load(&learning).await;
        let total = count(bank.len());
        let key = learning.for_candidate(candidate);

        let record = match self.scores.fetch_score(&key).await {
            Ok(Some(record)) => record,
            Ok(None) => return LearningProgress::NotStarted { total },
            Err(error) => {
                tracing::warn!(key = %key, %error, "score fetch failed");
                return LearningProgress::NotStarted { total };
            }
        };

        if bank.is_empty() {
            return LearningProgress::Completed {
                score: record.score,
                total: count(record.answers.len()),
                status: record.status,
            };
        }

        let answered = count(bank.iter().filter(|q| record.answers.contains(q.id())).count());
        match answered {
            0 => LearningProgress::NotStarted { total },
            n if n == total => LearningProgress::Completed {
                score: record.score,
                total,
                status: record.status,
            },
            n => LearningProgress::InProgress { answered: n, total },
        }
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
