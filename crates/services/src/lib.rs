#![forbid(unsafe_code)]

pub mod app_services;
pub mod assessment;
pub mod error;
pub mod phase_session;
pub mod persist;
pub mod progress;
pub mod question_bank;
pub mod settings;

pub use app_services::AppServices;
pub use assessment::{Assessment, AssessmentResult, AssessmentService};
pub use error::{AppServicesError, AssessmentError, PhaseSessionError};
pub use persist::PersistStatus;
pub use phase_session::{PhaseHost, PhaseSessionService, QuizCompletion, VideoPhaseSession};
pub use progress::{LearningProgress, ProgressService};
pub use question_bank::QuestionBankLoader;
pub use settings::SessionSettings;
