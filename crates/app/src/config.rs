use std::env;
use std::path::PathBuf;
use std::time::Duration;

use lms_core::model::CandidateId;
use services::SessionSettings;
use thiserror::Error;

pub const DEFAULT_DB_URL: &str = "sqlite://lms.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid {var} value: {raw}")]
    Invalid { var: &'static str, raw: String },
}

/// Process configuration read from the environment (and an optional `.env`).
/// Command-line flags override these values.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub candidate: Option<CandidateId>,
    pub log_filter: String,
    pub log_dir: Option<PathBuf>,
    pub persist_timeout: Duration,
    /// When set, the list-store REST service replaces SQLite.
    pub list_store_url: Option<String>,
    pub list_store_token: Option<String>,
}

impl Config {
    /// # Errors
    ///
    /// Returns `ConfigError` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let candidate = non_blank("LMS_CANDIDATE_ID")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(CandidateId::new)
                    .map_err(|_| ConfigError::Invalid {
                        var: "LMS_CANDIDATE_ID",
                        raw,
                    })
            })
            .transpose()?;

        let persist_timeout = non_blank("LMS_PERSIST_TIMEOUT_MS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::Invalid {
                        var: "LMS_PERSIST_TIMEOUT_MS",
                        raw,
                    })
            })
            .transpose()?
            .unwrap_or(SessionSettings::DEFAULT_PERSIST_TIMEOUT);

        Ok(Self {
            db_url: non_blank("LMS_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()),
            candidate,
            log_filter: non_blank("LMS_LOG")
                .or_else(|| non_blank("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
            log_dir: non_blank("LMS_LOG_DIR").map(PathBuf::from),
            persist_timeout,
            list_store_url: non_blank("LMS_LIST_URL"),
            list_store_token: non_blank("LMS_LIST_TOKEN"),
        })
    }

    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::default().with_persist_timeout(self.persist_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.persist_timeout, Duration::from_millis(5000));
        assert!(config.candidate.is_none());
        assert!(config.list_store_url.is_none());
    }

    #[test]
    fn lms_log_wins_over_rust_log() {
        let config = load(&[("RUST_LOG", "warn"), ("LMS_LOG", "debug")]).unwrap();
        assert_eq!(config.log_filter, "debug");
        let config = load(&[("RUST_LOG", "warn")]).unwrap();
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn parses_numeric_values() {
        let config = load(&[
            ("LMS_CANDIDATE_ID", "42"),
            ("LMS_PERSIST_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.candidate, Some(CandidateId::new(42)));
        assert_eq!(config.persist_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_candidate() {
        assert!(load(&[("LMS_CANDIDATE_ID", "me")]).is_err());
    }
}
