//! Shared error types for the services crate.
//!
//! Load and persist failures never surface here: they are logged and
//! reflected in returned values (`PersistStatus`, pass-through sessions).

use thiserror::Error;

use lms_core::phase::PhaseError;
use lms_core::scoring::SubmissionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `PhaseSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PhaseSessionError {
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Errors emitted by `AssessmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("no questions are available for this assessment")]
    NoQuestions,
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
