use std::time::Duration;

/// Tuning shared by the session services. Built by the host; services never
/// read the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Upper bound on one score upsert before it counts as failed.
    pub persist_timeout: Duration,
}

impl SessionSettings {
    pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_millis(5000);

    #[must_use]
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persist_timeout: Self::DEFAULT_PERSIST_TIMEOUT,
        }
    }
}
