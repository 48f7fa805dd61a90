use async_trait::async_trait;
use lms_core::model::{LearningId, LearningKey, LearningType, ScoreKey, ScoreRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A question bank row exactly as the list stores it.
///
/// Nothing here is validated: option slots may be empty, the answer and
/// phase duration are unparsed strings. The question bank loader turns rows
/// into domain `Question`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRow {
    pub id: u64,
    pub learning_type: LearningType,
    pub learning_id: LearningId,
    pub prompt: Option<String>,
    pub options: [Option<String>; 4],
    /// Correct options joined by `:`.
    pub answer: Option<String>,
    pub question_type: Option<String>,
    /// Trigger offset as `HH:MM:SS`.
    pub phase_duration: Option<String>,
}

impl QuestionRow {
    #[must_use]
    pub fn learning_key(&self) -> LearningKey {
        LearningKey::new(self.learning_type, self.learning_id.clone())
    }
}

/// What an upsert did to the score store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Source of question bank rows.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Fetch every row attached to a learning item, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn fetch_questions(&self, key: &LearningKey) -> Result<Vec<QuestionRow>, StorageError>;

    /// Persist or replace a row, keyed by learning item and row id.
    ///
    /// Stores that assign their own row ids (the list store) replace an
    /// existing row with that id, and add a new row under a store-assigned id
    /// when there is none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_question(&self, row: &QuestionRow) -> Result<(), StorageError>;
}

/// Score records keyed by `(learning id, learning type, candidate)`.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Look up the record for a natural key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails. A missing record is `Ok(None)`.
    async fn fetch_score(&self, key: &ScoreKey) -> Result<Option<ScoreRecord>, StorageError>;

    /// Insert the record, or update the existing record with the same key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_score(&self, record: &ScoreRecord) -> Result<UpsertOutcome, StorageError>;
}

type QuestionKey = (LearningType, LearningId, u64);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionKey, QuestionRow>>>,
    scores: Arc<Mutex<HashMap<ScoreKey, ScoreRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            questions: Arc::new(Mutex::new(BTreeMap::new())),
            scores: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored score records, across all keys.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn score_count(&self) -> Result<usize, StorageError> {
        let guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn fetch_questions(&self, key: &LearningKey) -> Result<Vec<QuestionRow>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|row| {
                row.learning_type == key.learning_type && row.learning_id == key.learning_id
            })
            .cloned()
            .collect())
    }

    async fn upsert_question(&self, row: &QuestionRow) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (row.learning_type, row.learning_id.clone(), row.id),
            row.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn fetch_score(&self, key: &ScoreKey) -> Result<Option<ScoreRecord>, StorageError> {
        let guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn upsert_score(&self, record: &ScoreRecord) -> Result<UpsertOutcome, StorageError> {
        let mut guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.insert(record.key(), record.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Inserted),
        }
    }
}

/// Aggregates the question bank and score repositories behind trait objects
/// for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionBankRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}
