use std::time::Duration;

use lms_core::model::ScoreRecord;
use storage::repository::{ScoreRepository, UpsertOutcome};

/// What happened to a score upsert.
///
/// Anything but `Saved` means the score shown to the candidate is local to
/// this session and may not be durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStatus {
    Saved(UpsertOutcome),
    Failed,
    TimedOut,
}

impl PersistStatus {
    #[must_use]
    pub fn is_saved(self) -> bool {
        matches!(self, PersistStatus::Saved(_))
    }
}

/// Upsert `record`, bounded by `timeout`. Failures are logged, never returned.
pub(crate) async fn persist_score(
    scores: &dyn ScoreRepository,
    record: &ScoreRecord,
    timeout: Duration,
) -> PersistStatus {
    let key = record.key();
    match tokio::time::timeout(timeout, scores.upsert_score(record)).await {
        Ok(Ok(outcome)) => {
            tracing::debug!(key = %key, score = record.score, ?outcome, "score persisted");
            PersistStatus::Saved(outcome)
        }
        Ok(Err(error)) => {
            tracing::warn!(key = %key, %error, "score persist failed");
            PersistStatus::Failed
        }
        Err(_) => {
            tracing::warn!(key = %key, ?timeout, "score persist timed out");
            PersistStatus::TimedOut
        }
    }
}
