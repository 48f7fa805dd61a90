use std::sync::Arc;

use storage::repository::Storage;
use storage::rest::{ListStoreClient, ListStoreConfig};

use crate::assessment::AssessmentService;
use crate::error::AppServicesError;
use crate::phase_session::PhaseSessionService;
use crate::progress::ProgressService;
use crate::question_bank::QuestionBankLoader;
use crate::settings::SessionSettings;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    phase_sessions: Arc<PhaseSessionService>,
    assessments: Arc<AssessmentService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    #[must_use]
    pub fn new(storage: &Storage, settings: SessionSettings) -> Self {
        let loader = QuestionBankLoader::new(Arc::clone(&storage.questions));
        let phase_sessions = Arc::new(PhaseSessionService::new(
            loader.clone(),
            Arc::clone(&storage.scores),
            settings,
        ));
        let assessments = Arc::new(AssessmentService::new(
            loader.clone(),
            Arc::clone(&storage.scores),
            settings,
        ));
        let progress = Arc::new(ProgressService::new(loader, Arc::clone(&storage.scores)));

        Self {
            phase_sessions,
            assessments,
            progress,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, settings))
    }

    /// Build services backed by the REST list store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the HTTP client cannot be built.
    pub fn new_list_store(
        config: ListStoreConfig,
        settings: SessionSettings,
    ) -> Result<Self, AppServicesError> {
        let client = ListStoreClient::new(config)?;
        let storage = Storage {
            questions: Arc::new(client.clone()),
            scores: Arc::new(client),
        };
        Ok(Self::new(&storage, settings))
    }

    #[must_use]
    pub fn phase_sessions(&self) -> Arc<PhaseSessionService> {
        Arc::clone(&self.phase_sessions)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
